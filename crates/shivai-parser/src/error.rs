//! Parser diagnostics.

use thiserror::Error;

use shivai_protocols::{FailureKind, IntentCategory};

/// Why an utterance did not produce a confident intent.
///
/// Never escalated: [`IntentParser::parse`](crate::IntentParser::parse)
/// turns every variant into an `unknown` intent.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ParseError {
    #[error("Utterance is empty")]
    Empty,

    #[error("No pattern matched the utterance")]
    NoMatch,

    #[error("Best match {best} has confidence {confidence:.2}, below threshold")]
    Ambiguous {
        best: IntentCategory,
        confidence: f32,
    },
}

impl ParseError {
    pub fn kind(&self) -> FailureKind {
        FailureKind::ParseAmbiguous
    }
}

pub type ParseResult<T> = Result<T, ParseError>;
