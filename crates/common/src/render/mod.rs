//! Concept diagram rendering
//!
//! Asks the LLM for a Graphviz DOT description of a concept and pipes it
//! through the `dot` binary to produce a PNG. When the model output does
//! not render, a keyword-selected fallback diagram is tried; when even
//! Graphviz is unavailable, a plain SVG placeholder is written so the
//! endpoint always produces an image file.

use crate::errors::{AppError, Result};
use crate::llm::Generator;
use crate::metrics::record_render;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

pub struct DiagramRenderer {
    dot_binary: String,
}

impl DiagramRenderer {
    pub fn new(dot_binary: impl Into<String>) -> Self {
        Self {
            dot_binary: dot_binary.into(),
        }
    }

    /// Render a diagram for `concept` at `output_path` (expected to end
    /// in `.png`). Returns the path of the file actually written, which
    /// switches to `.svg` when the placeholder fallback is used.
    pub async fn generate_diagram(
        &self,
        generator: &dyn Generator,
        concept: &str,
        output_path: &Path,
    ) -> Result<PathBuf> {
        match self.render_llm_dot(generator, concept, output_path).await {
            Ok(()) => {
                record_render("dot");
                return Ok(output_path.to_path_buf());
            }
            Err(e) => {
                tracing::warn!(error = %e, concept, "Model-generated DOT failed, trying fallback diagram");
            }
        }

        match self.render_dot(&fallback_dot(concept), output_path).await {
            Ok(()) => {
                record_render("fallback");
                return Ok(output_path.to_path_buf());
            }
            Err(e) => {
                tracing::warn!(error = %e, concept, "Fallback diagram failed, writing placeholder");
            }
        }

        let svg_path = output_path.with_extension("svg");
        tokio::fs::write(&svg_path, placeholder_svg(concept)).await?;
        record_render("placeholder");
        Ok(svg_path)
    }

    async fn render_llm_dot(
        &self,
        generator: &dyn Generator,
        concept: &str,
        output_path: &Path,
    ) -> Result<()> {
        let dot_source = generator.generate(&diagram_prompt(concept)).await?;
        let dot_source = strip_code_fences(&dot_source);

        if !dot_source.contains("digraph") && !dot_source.contains("graph") {
            return Err(AppError::Render {
                message: "model output contains no DOT graph".to_string(),
            });
        }

        self.render_dot(&dot_source, output_path).await
    }

    /// Pipe DOT source through the Graphviz binary.
    async fn render_dot(&self, dot_source: &str, output_path: &Path) -> Result<()> {
        let mut child = Command::new(&self.dot_binary)
            .arg("-Tpng")
            .arg("-o")
            .arg(output_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| AppError::Render {
                message: format!("failed to spawn {}: {}", self.dot_binary, e),
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(dot_source.as_bytes()).await?;
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            return Err(AppError::Render {
                message: format!(
                    "{} exited with {}: {}",
                    self.dot_binary,
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        Ok(())
    }
}

fn diagram_prompt(concept: &str) -> String {
    format!(
        "Create a Graphviz DOT diagram that visualizes the computer science concept: {concept}\n\n\
         Requirements:\n\
         - Output ONLY valid DOT source, nothing else\n\
         - Use a digraph with rankdir=LR\n\
         - Keep it to at most 10 nodes with short labels\n\
         - Use filled boxes with light colors"
    )
}

/// Strip surrounding markdown code fences from model output, with or
/// without a language tag.
pub fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed.to_string();
    };

    // Drop the language tag on the opening fence line
    let rest = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    rest.strip_suffix("```").unwrap_or(rest).trim().to_string()
}

/// Keyword-selected DOT source used when the model output fails to
/// render.
pub fn fallback_dot(concept: &str) -> String {
    let lowered = concept.to_lowercase();

    if lowered.contains("neural network") || lowered.contains("deep learning") {
        r#"digraph G {
    rankdir=LR;
    node [shape=circle, style=filled, fillcolor=lightblue];
    subgraph cluster_0 { label="Input"; i1; i2; i3; }
    subgraph cluster_1 { label="Hidden"; h1; h2; h3; h4; }
    subgraph cluster_2 { label="Output"; o1; o2; }
    {i1 i2 i3} -> {h1 h2 h3 h4} -> {o1 o2};
}"#
        .to_string()
    } else if lowered.contains("algorithm") || lowered.contains("sort") {
        r#"digraph G {
    rankdir=TB;
    node [shape=box, style=filled, fillcolor=lightyellow];
    start [label="Start", shape=ellipse];
    input [label="Read input"];
    process [label="Process step"];
    check [label="Done?", shape=diamond];
    done [label="End", shape=ellipse];
    start -> input -> process -> check;
    check -> process [label="no"];
    check -> done [label="yes"];
}"#
        .to_string()
    } else if lowered.contains("data structure") || lowered.contains("tree") {
        r#"digraph G {
    node [shape=circle, style=filled, fillcolor=lightgreen];
    root -> {left right};
    left -> {ll lr};
    right -> {rl rr};
}"#
        .to_string()
    } else if lowered.contains("quantum") {
        r#"digraph G {
    rankdir=LR;
    node [shape=box, style=filled, fillcolor=lavender];
    q0 [label="|0>"];
    h [label="H"];
    cx [label="CNOT"];
    m [label="Measure"];
    q0 -> h -> cx -> m;
}"#
        .to_string()
    } else {
        format!(
            r#"digraph G {{
    rankdir=LR;
    node [shape=box, style=filled, fillcolor=lightgray];
    concept [label="{}", fillcolor=lightblue];
    a [label="Definition"];
    b [label="Key ideas"];
    c [label="Applications"];
    concept -> {{a b c}};
}}"#,
            escape_dot_label(concept)
        )
    }
}

/// Last-resort text card written when Graphviz itself is unavailable.
pub fn placeholder_svg(concept: &str) -> String {
    format!(
        r##"<svg xmlns="http://www.w3.org/2000/svg" width="640" height="200">
  <rect width="100%" height="100%" fill="#f0f4f8"/>
  <text x="50%" y="45%" text-anchor="middle" font-family="sans-serif" font-size="20" fill="#2d3748">{}</text>
  <text x="50%" y="65%" text-anchor="middle" font-family="sans-serif" font-size="13" fill="#718096">Diagram rendering is unavailable on this host</text>
</svg>
"##,
        escape_xml(concept)
    )
}

fn escape_dot_label(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_code_fences_with_language_tag() {
        let fenced = "```dot\ndigraph G { a -> b; }\n```";
        assert_eq!(strip_code_fences(fenced), "digraph G { a -> b; }");
    }

    #[test]
    fn test_strip_code_fences_plain() {
        let fenced = "```\ndigraph G { a -> b; }\n```";
        assert_eq!(strip_code_fences(fenced), "digraph G { a -> b; }");
    }

    #[test]
    fn test_strip_code_fences_unfenced_passthrough() {
        assert_eq!(
            strip_code_fences("digraph G { a -> b; }"),
            "digraph G { a -> b; }"
        );
    }

    #[test]
    fn test_fallback_dot_selection() {
        assert!(fallback_dot("a neural network overview").contains("cluster_1"));
        assert!(fallback_dot("sorting algorithm").contains("diamond"));
        assert!(fallback_dot("binary tree").contains("root"));
        assert!(fallback_dot("persistent data structures").contains("root"));
        assert!(fallback_dot("quantum circuits").contains("CNOT"));
        assert!(fallback_dot("category theory").contains("category theory"));
    }

    #[test]
    fn test_fallback_dot_escapes_labels() {
        let dot = fallback_dot(r#"the "halting" problem"#);
        assert!(dot.contains(r#"\"halting\""#));
    }

    #[test]
    fn test_placeholder_svg_escapes_markup() {
        let svg = placeholder_svg("B<sup>+</sup> trees & friends");
        assert!(svg.contains("B&lt;sup&gt;+&lt;/sup&gt; trees &amp; friends"));
        assert!(!svg.contains("<sup>"));
    }

    #[tokio::test]
    async fn test_missing_dot_binary_yields_placeholder() {
        use crate::llm::ScriptedGenerator;

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("diagram.png");
        let renderer = DiagramRenderer::new("/nonexistent/dot-binary");
        let generator = ScriptedGenerator::new(vec!["digraph G { a -> b; }".to_string()]);

        let written = renderer
            .generate_diagram(&generator, "hash tables", &out)
            .await
            .unwrap();

        assert_eq!(written.extension().unwrap(), "svg");
        let contents = tokio::fs::read_to_string(&written).await.unwrap();
        assert!(contents.contains("hash tables"));
    }
}
