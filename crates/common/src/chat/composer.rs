//! Response composition
//!
//! Builds intent-specific prompts, invokes the LLM, and for the
//! summarize-by-id path additionally drives the paper lookup gateway to
//! construct a structured citation. Any failure inside the pipeline is
//! converted into a fixed apology response at this boundary; callers
//! never see an error.

use crate::arxiv::{clean_arxiv_id, PaperTool};
use crate::chat::extractor::extract_sources;
use crate::chat::intent::{classify, Intent};
use crate::chat::memory::{ConversationMemory, Role};
use crate::chat::{ChatResponse, SourceRecord};
use crate::errors::Result;
use crate::llm::Generator;
use crate::metrics::ChatMetrics;
use std::sync::Arc;

/// Fixed user-facing text for any internal pipeline failure.
/// No internal error detail is ever surfaced.
const APOLOGY: &str = "I'm sorry, I encountered an error while processing your query. \
     Please try again with a different question or rephrase your current one.";

/// The chat pipeline: classifier, composer, and extractor wired to the
/// LLM runtime and the paper lookup gateway.
pub struct Chatbot {
    generator: Arc<dyn Generator>,
    paper_tool: Arc<dyn PaperTool>,
}

impl Chatbot {
    pub fn new(generator: Arc<dyn Generator>, paper_tool: Arc<dyn PaperTool>) -> Self {
        Self {
            generator,
            paper_tool,
        }
    }

    /// Process one user query against a session memory. Infallible:
    /// every failure path degrades to an apology response.
    pub async fn process_query(
        &self,
        memory: &mut ConversationMemory,
        query: &str,
    ) -> ChatResponse {
        let (intent, content) = classify(query);
        let metrics = ChatMetrics::start(intent.as_str());

        tracing::info!(intent = intent.as_str(), content = %content, "Processing query");

        let response = match self.answer(intent, &content).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(error = %e, intent = intent.as_str(), "Pipeline failure, degrading to apology");
                ChatResponse::text(APOLOGY)
            }
        };

        memory.record(Role::User, query.trim());
        memory.record(Role::Assistant, response.response.clone());
        metrics.finish(response.sources.as_ref().map_or(0, Vec::len));

        response
    }

    async fn answer(&self, intent: Intent, content: &str) -> Result<ChatResponse> {
        match intent {
            Intent::Explain => self.generate_with_extraction(&explain_prompt(content)).await,
            Intent::Summarize if looks_like_paper_id(content) => {
                self.summarize_paper(content).await
            }
            Intent::Summarize => {
                self.generate_with_extraction(&topic_summary_prompt(content))
                    .await
            }
            Intent::General => self.generate_with_extraction(&general_prompt(content)).await,
        }
    }

    /// Generic single-turn path: fill the template, call the model, then
    /// run the reference extractor over the raw output.
    async fn generate_with_extraction(&self, prompt: &str) -> Result<ChatResponse> {
        let text = self.generator.generate(prompt).await?;
        let sources = extract_sources(&text);
        Ok(ChatResponse::with_sources(text, sources))
    }

    /// Summarize-by-id path: explicit two-step tool sequence (download,
    /// then analyze) instead of prompting for citations. The output
    /// carries exactly one source, keyed to the paper id.
    async fn summarize_paper(&self, paper_id: &str) -> Result<ChatResponse> {
        let paper_text = self.paper_tool.download(paper_id).await?;
        let summary = self
            .generator
            .generate(&paper_summary_prompt(paper_id, &paper_text))
            .await?;

        let analysis = self.paper_tool.analyze(paper_id).await?;
        let clean_id = clean_arxiv_id(paper_id);

        let authors = if analysis.authors.is_empty() {
            vec!["Unknown".to_string()]
        } else {
            analysis.authors
        };

        let source = SourceRecord {
            id: paper_id.to_string(),
            title: if analysis.title.is_empty() {
                format!("Paper {}", paper_id)
            } else {
                analysis.title
            },
            authors,
            url: format!("https://arxiv.org/abs/{}", clean_id),
            year: analysis.year,
        };

        Ok(ChatResponse::with_sources(summary, vec![source]))
    }
}

/// Paper-id heuristic for the summarize branch: new-style arXiv ids
/// start with "20" and contain a period.
pub fn looks_like_paper_id(content: &str) -> bool {
    content.starts_with("20") && content.contains('.')
}

fn explain_prompt(content: &str) -> String {
    format!(
        "Explain the computer science concept: {content}\n\n\
         Important: Provide a direct explanation based on your knowledge.\n\
         Do NOT try to search for or download papers about this topic.\n\
         Focus on giving a clear, concise explanation with examples if appropriate.\n\n\
         At the end of your explanation, include 2-3 relevant research papers that someone could read to learn more.\n\
         Format each paper reference on a new line exactly like this:\n\
         Paper Title | Author1, Author2 | Year | arXiv:XXXX.XXXXX\n\n\
         For papers without an arXiv ID, just omit that part:\n\
         Paper Title | Author1, Author2 | Year\n\n\
         Make sure to separate each field with the | character."
    )
}

fn topic_summary_prompt(content: &str) -> String {
    format!(
        "Provide a summary of research on the topic: '{content}'\n\n\
         Important: Give a general overview of the field based on your knowledge.\n\
         Focus on key concepts, major developments, and current state of research.\n\n\
         At the end of your summary, include 2-3 relevant research papers that someone could read to learn more.\n\
         Format each paper reference on a new line exactly like this:\n\
         Paper Title | Author1, Author2 | Year | arXiv:XXXX.XXXXX\n\n\
         For papers without an arXiv ID, just omit that part:\n\
         Paper Title | Author1, Author2 | Year\n\n\
         Make sure to separate each field with the | character."
    )
}

fn general_prompt(content: &str) -> String {
    format!(
        "Answer this computer science question: {content}\n\n\
         Important: Provide a direct answer based on your knowledge.\n\
         Be clear, concise, and accurate. Include examples if helpful.\n\n\
         At the end of your answer, include 1-2 relevant research papers that someone could read to learn more.\n\
         Format each paper reference on a new line exactly like this:\n\
         Paper Title | Author1, Author2 | Year | arXiv:XXXX.XXXXX\n\n\
         For papers without an arXiv ID, just omit that part:\n\
         Paper Title | Author1, Author2 | Year\n\n\
         Make sure to separate each field with the | character."
    )
}

fn paper_summary_prompt(paper_id: &str, paper_text: &str) -> String {
    format!(
        "Summarize the arXiv paper with ID {paper_id}.\n\n\
         Paper content:\n{paper_text}\n\n\
         Focus on the problem the paper addresses, its approach, and its main results.\n\
         Do not include citation lines; the citation is attached separately."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arxiv::{PaperAnalysis, PaperRecord};
    use crate::errors::AppError;
    use crate::llm::ScriptedGenerator;
    use async_trait::async_trait;

    /// Stub gateway with canned answers, or canned failure
    struct StubPaperTool {
        fail: bool,
    }

    #[async_trait]
    impl PaperTool for StubPaperTool {
        async fn search(&self, _query: &str, _max_results: usize) -> Result<Vec<PaperRecord>> {
            if self.fail {
                return Err(AppError::Tool {
                    message: "tool process exited with status 1".into(),
                });
            }
            Ok(vec![])
        }

        async fn download(&self, paper_id: &str) -> Result<String> {
            if self.fail {
                return Err(AppError::Tool {
                    message: "tool process exited with status 1".into(),
                });
            }
            Ok(format!("# arXiv Paper: {}\n\nFull text here.", paper_id))
        }

        async fn analyze(&self, _paper_id: &str) -> Result<PaperAnalysis> {
            if self.fail {
                return Err(AppError::Tool {
                    message: "tool process exited with status 1".into(),
                });
            }
            Ok(PaperAnalysis {
                title: "Learning Transferable Visual Models".to_string(),
                authors: vec!["Radford".to_string(), "Kim".to_string()],
                year: "2021".to_string(),
                key_concepts: vec!["machine learning".to_string(), "vision".to_string()],
                main_contributions: vec!["Novel approach".to_string()],
                related_papers: vec!["2102.12112".to_string(), "2104.12112".to_string()],
            })
        }
    }

    fn chatbot(responses: Vec<String>, fail_tool: bool) -> Chatbot {
        Chatbot::new(
            Arc::new(ScriptedGenerator::new(responses)),
            Arc::new(StubPaperTool { fail: fail_tool }),
        )
    }

    #[tokio::test]
    async fn test_explain_path_extracts_sources() {
        let bot = chatbot(
            vec![
                "Transformers use attention.\n\n\
                 Attention Is All You Need | Vaswani, Shazeer | 2017 | arXiv:1706.03762"
                    .to_string(),
            ],
            false,
        );
        let mut memory = ConversationMemory::new();

        let response = bot.process_query(&mut memory, "explain transformers").await;

        let sources = response.sources.unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].url, "https://arxiv.org/abs/1706.03762");
        assert_eq!(memory.len(), 2);
    }

    #[tokio::test]
    async fn test_summarize_by_id_has_exactly_one_source() {
        let bot = chatbot(vec!["A summary of the paper.".to_string()], false);
        let mut memory = ConversationMemory::new();

        let response = bot.process_query(&mut memory, "summarize 2103.12112").await;

        let sources = response.sources.unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].id, "2103.12112");
        assert_eq!(sources[0].url, "https://arxiv.org/abs/2103.12112");
        assert_eq!(sources[0].year, "2021");
        assert_eq!(sources[0].title, "Learning Transferable Visual Models");
    }

    #[tokio::test]
    async fn test_summarize_by_id_strips_version_suffix() {
        let bot = chatbot(vec!["A summary.".to_string()], false);
        let mut memory = ConversationMemory::new();

        let response = bot.process_query(&mut memory, "summarize 2103.12112v2").await;

        let sources = response.sources.unwrap();
        assert_eq!(sources[0].id, "2103.12112v2");
        assert_eq!(sources[0].url, "https://arxiv.org/abs/2103.12112");
    }

    #[tokio::test]
    async fn test_summarize_topic_goes_through_extraction() {
        let bot = chatbot(
            vec!["Overview of the field.\n\nSome Classic Paper | A. Author | 1999".to_string()],
            false,
        );
        let mut memory = ConversationMemory::new();

        let response = bot
            .process_query(&mut memory, "summarize graph neural networks")
            .await;

        let sources = response.sources.unwrap();
        assert_eq!(sources.len(), 1);
        assert!(sources[0].url.contains("scholar.google.com"));
    }

    #[tokio::test]
    async fn test_tool_failure_degrades_to_apology() {
        let bot = chatbot(vec!["never used".to_string()], true);
        let mut memory = ConversationMemory::new();

        let response = bot.process_query(&mut memory, "summarize 2103.12112").await;

        assert!(response.response.contains("I'm sorry"));
        assert!(response.sources.is_none());
        assert!(response.image.is_none());
    }

    #[tokio::test]
    async fn test_general_path_with_no_citations() {
        let bot = chatbot(vec!["A direct answer with no references.".to_string()], false);
        let mut memory = ConversationMemory::new();

        let response = bot.process_query(&mut memory, "why is quicksort fast?").await;

        assert_eq!(response.sources, Some(vec![]));
    }

    #[test]
    fn test_paper_id_heuristic() {
        assert!(looks_like_paper_id("2103.12112"));
        assert!(looks_like_paper_id("2017.1"));
        assert!(!looks_like_paper_id("transformers"));
        assert!(!looks_like_paper_id("1706.03762")); // old enough to miss the heuristic
        assert!(!looks_like_paper_id("20 papers about rust"));
    }
}
