//! Chat completion types and the streaming provider client.

pub mod provider;

use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

use crate::error::Error;

/// One chat turn.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// Stream of text fragments from the completion provider. Each item is one
/// non-empty delta, in arrival order.
pub type CompletionChunkStream = Pin<Box<dyn Stream<Item = Result<String, Error>> + Send>>;
