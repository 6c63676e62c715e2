//! # ShivAI Parser
//!
//! Offline intent classification for English, Hindi and mixed utterances.
//!
//! Parsing runs in three stages:
//!
//! 1. [`normalize`] folds case, strips punctuation and splits mixed-script
//!    words, mapping common Devanagari words to their romanized form.
//! 2. Every [`Pattern`] in the table is evaluated against the tokens,
//!    extracting entity slots along the way.
//! 3. Candidates are ranked by specificity, category rank and slot count;
//!    an optional context hint breaks the remaining low-confidence ties.

mod error;
mod lexicon;
mod normalize;
mod parser;
mod patterns;
mod slots;

pub use error::{ParseError, ParseResult};
pub use lexicon::{detect_language, is_filler};
pub use normalize::{Script, Token, normalize};
pub use parser::{Candidate, IntentParser};
pub use patterns::{Pattern, builtin_patterns};
pub use slots::{SlotKind, SlotRule};
