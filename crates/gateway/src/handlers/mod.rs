//! Request handlers

pub mod chat;
pub mod health;
pub mod images;
pub mod search;
pub mod visualize;
pub mod ws;
