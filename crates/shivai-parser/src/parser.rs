//! Candidate scoring and selection.

use std::collections::BTreeMap;

use tracing::debug;

use shivai_config::ParserConfig;
use shivai_protocols::{ContextSnapshot, EntityValue, Intent, IntentCategory, Language};

use crate::error::{ParseError, ParseResult};
use crate::lexicon::{detect_language, is_filler};
use crate::normalize::{Token, normalize};
use crate::patterns::{Pattern, builtin_patterns};
use crate::slots::extract;

const COVERAGE_WEIGHT: f32 = 0.7;
const SLOT_WEIGHT: f32 = 0.3;

/// A pattern that matched an utterance.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub category: IntentCategory,
    /// Tokens matched by triggers and boosts.
    pub specificity: usize,
    pub slots_filled: usize,
    pub confidence: f32,
    pub entities: BTreeMap<String, EntityValue>,
    pub pattern_index: usize,
}

/// Offline intent parser over a static pattern table.
pub struct IntentParser {
    patterns: Vec<Pattern>,
    config: ParserConfig,
}

impl IntentParser {
    pub fn new() -> Self {
        Self::with_patterns(builtin_patterns(), ParserConfig::default())
    }

    pub fn from_config(config: &ParserConfig) -> Self {
        Self::with_patterns(builtin_patterns(), config.clone())
    }

    pub fn with_patterns(patterns: Vec<Pattern>, config: ParserConfig) -> Self {
        Self { patterns, config }
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Classify an utterance. Never fails: anything unclear is `unknown`.
    pub fn parse(&self, utterance: &str, hint: Option<&ContextSnapshot>) -> Intent {
        self.classify(utterance, hint).unwrap_or_else(|err| {
            debug!("Utterance {:?} classified as unknown: {}", utterance, err);
            Intent::unknown(utterance, self.detect_language(utterance))
        })
    }

    /// Like [`parse`](Self::parse), but reports why no intent was produced.
    pub fn classify(&self, utterance: &str, hint: Option<&ContextSnapshot>) -> ParseResult<Intent> {
        let tokens = normalize(utterance);
        if tokens.is_empty() {
            return Err(ParseError::Empty);
        }

        let candidates = self.rank(&tokens);
        let chosen = self.select(&candidates, hint).ok_or(ParseError::NoMatch)?;

        if chosen.confidence < self.config.confidence_threshold {
            return Err(ParseError::Ambiguous {
                best: chosen.category,
                confidence: chosen.confidence,
            });
        }

        let language = detect_language(&tokens, self.config.mixed_language_min_share);
        debug!(
            "Utterance {:?} -> {} (confidence {:.2}, {})",
            utterance, chosen.category, chosen.confidence, language
        );
        Ok(Intent::new(
            chosen.category,
            chosen.entities.clone(),
            chosen.confidence,
            language,
            utterance,
        ))
    }

    pub fn detect_language(&self, utterance: &str) -> Language {
        detect_language(&normalize(utterance), self.config.mixed_language_min_share)
    }

    /// Every matching candidate, best first.
    pub fn candidates(&self, utterance: &str) -> Vec<Candidate> {
        self.rank(&normalize(utterance))
    }

    fn rank(&self, tokens: &[Token]) -> Vec<Candidate> {
        let mut candidates: Vec<Candidate> = self
            .patterns
            .iter()
            .enumerate()
            .filter_map(|(index, pattern)| evaluate(pattern, index, tokens))
            .collect();

        candidates.sort_by(|a, b| {
            b.specificity
                .cmp(&a.specificity)
                .then(a.category.rank().cmp(&b.category.rank()))
                .then(b.slots_filled.cmp(&a.slots_filled))
                .then(a.pattern_index.cmp(&b.pattern_index))
        });
        candidates
    }

    /// Pick the winner, letting the context hint settle low-confidence ties.
    fn select<'a>(
        &self,
        candidates: &'a [Candidate],
        hint: Option<&ContextSnapshot>,
    ) -> Option<&'a Candidate> {
        let top = candidates.first()?;
        let Some(preferred) = hint.and_then(ContextSnapshot::dominant_category) else {
            return Some(top);
        };
        if top.category == preferred {
            return Some(top);
        }

        let tied: Vec<&Candidate> = candidates
            .iter()
            .take_while(|c| c.specificity == top.specificity)
            .collect();
        if tied
            .iter()
            .any(|c| c.confidence >= self.config.hint_confidence_ceiling)
        {
            return Some(top);
        }

        match tied.into_iter().find(|c| c.category == preferred) {
            Some(hinted) => {
                debug!("Context hint {} broke a tie with {}", preferred, top.category);
                Some(hinted)
            }
            None => Some(top),
        }
    }
}

impl Default for IntentParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Match one pattern against the tokens.
fn evaluate(pattern: &Pattern, index: usize, tokens: &[Token]) -> Option<Candidate> {
    let mut consumed = vec![false; tokens.len()];
    let mut specificity = 0;

    for group in &pattern.groups {
        let matched = group
            .iter()
            .find_map(|alt| find_sequence(tokens, &consumed, alt).map(|start| (start, alt.len())))?;
        let (start, len) = matched;
        consumed[start..start + len].fill(true);
        specificity += len;
    }

    for boost in &pattern.boosts {
        if let Some(i) = (0..tokens.len()).find(|&i| !consumed[i] && tokens[i].text == *boost) {
            consumed[i] = true;
            specificity += 1;
        }
    }

    let mut entities = BTreeMap::new();
    let targeted = pattern.slots.iter().filter(|s| !s.kind.is_remainder());
    let remainder = pattern.slots.iter().filter(|s| s.kind.is_remainder());
    for rule in targeted.chain(remainder) {
        match extract(rule.kind, tokens, &consumed) {
            Some((value, used)) => {
                for i in used {
                    consumed[i] = true;
                }
                entities.insert(rule.name.to_string(), value);
            }
            None if rule.required => return None,
            None => {}
        }
    }

    let leftover_content = (0..tokens.len()).any(|i| !consumed[i] && !is_filler(&tokens[i].text));
    if pattern.standalone && leftover_content {
        return None;
    }

    let considered = (0..tokens.len())
        .filter(|&i| consumed[i] || !is_filler(&tokens[i].text))
        .count();
    let matched = consumed.iter().filter(|c| **c).count();
    let coverage = if considered == 0 {
        1.0
    } else {
        matched as f32 / considered as f32
    };
    let completeness = if pattern.slots.is_empty() {
        1.0
    } else {
        entities.len() as f32 / pattern.slots.len() as f32
    };
    let confidence = (COVERAGE_WEIGHT * coverage + SLOT_WEIGHT * completeness).clamp(0.0, 1.0);

    Some(Candidate {
        category: pattern.category,
        specificity,
        slots_filled: entities.len(),
        confidence,
        entities,
        pattern_index: index,
    })
}

/// First position where `phrase` occurs over unconsumed tokens.
fn find_sequence(tokens: &[Token], consumed: &[bool], phrase: &[String]) -> Option<usize> {
    if phrase.is_empty() || phrase.len() > tokens.len() {
        return None;
    }
    (0..=tokens.len() - phrase.len()).find(|&start| {
        phrase
            .iter()
            .enumerate()
            .all(|(offset, word)| !consumed[start + offset] && tokens[start + offset].text == *word)
    })
}

#[cfg(test)]
#[path = "parser_tests.rs"]
mod tests;
