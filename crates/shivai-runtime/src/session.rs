//! Utterance producers and consumers for interactive sessions.

use async_trait::async_trait;
use serde::Serialize;
use std::collections::VecDeque;

use shivai_protocols::{Intent, Outcome};
use shivai_workqueue::WorkHandle;

use crate::error::AgentResult;

/// Where utterances come from (keyboard, speech-to-text, a script).
#[async_trait]
pub trait UtteranceSource: Send {
    /// Next utterance, `None` once the source is exhausted.
    async fn next_utterance(&mut self) -> AgentResult<Option<String>>;
}

/// Where replies go (terminal, text-to-speech, a test buffer).
#[async_trait]
pub trait UtteranceSink: Send {
    async fn deliver(&mut self, reply: &Reply) -> AgentResult<()>;
}

/// The answer to one utterance.
#[derive(Debug, Clone, Serialize)]
pub struct Reply {
    pub handle: WorkHandle,
    pub intent: Intent,
    pub capability: String,
    pub outcome: Outcome,
}

impl Reply {
    /// Whether the handler asked to end the session.
    pub fn is_exit(&self) -> bool {
        self.outcome
            .payload()
            .and_then(|p| p.get("exit"))
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    /// Human-readable rendering of the outcome.
    pub fn text(&self) -> String {
        match &self.outcome {
            Outcome::Succeeded { payload } => match payload.get("reply").and_then(|r| r.as_str()) {
                Some(reply) => reply.to_string(),
                None if payload.is_null() => "Done.".to_string(),
                None => payload.to_string(),
            },
            Outcome::Failed { failure } => format!("Sorry, that failed ({})", failure),
            Outcome::Cancelled { .. } => "Cancelled.".to_string(),
        }
    }
}

/// Source that replays a fixed list of utterances.
#[derive(Debug, Default)]
pub struct ScriptedSource {
    lines: VecDeque<String>,
}

impl ScriptedSource {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl UtteranceSource for ScriptedSource {
    async fn next_utterance(&mut self) -> AgentResult<Option<String>> {
        Ok(self.lines.pop_front())
    }
}

/// Sink that keeps every reply.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub replies: Vec<Reply>,
}

#[async_trait]
impl UtteranceSink for MemorySink {
    async fn deliver(&mut self, reply: &Reply) -> AgentResult<()> {
        self.replies.push(reply.clone());
        Ok(())
    }
}
