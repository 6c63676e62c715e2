//! Entity slot extraction.

use std::path::PathBuf;

use shivai_protocols::EntityValue;

use crate::lexicon::{is_device_word, is_filler};
use crate::normalize::{Script, Token};

/// How a slot finds its value among the tokens a pattern left unconsumed.
#[derive(Debug, Clone, Copy)]
pub enum SlotKind {
    /// First number, as digits or a number word.
    Quantity,
    /// First path-like token or well-known folder name.
    Path,
    /// First token found in the table, mapped to its canonical value.
    Keyword(&'static [(&'static str, &'static str)]),
    /// Remaining content words joined with spaces.
    AppName,
    /// Remaining content words joined with `_`, then looked up in the alias table.
    Identifier(&'static [(&'static str, &'static str)]),
    /// Every remaining token, minus leading and trailing fillers.
    FreeText,
}

impl SlotKind {
    /// Remainder slots run after the targeted ones.
    pub(crate) fn is_remainder(&self) -> bool {
        matches!(
            self,
            SlotKind::AppName | SlotKind::Identifier(_) | SlotKind::FreeText
        )
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SlotRule {
    pub name: &'static str,
    pub kind: SlotKind,
    pub required: bool,
}

impl SlotRule {
    pub const fn required(name: &'static str, kind: SlotKind) -> Self {
        Self {
            name,
            kind,
            required: true,
        }
    }

    pub const fn optional(name: &'static str, kind: SlotKind) -> Self {
        Self {
            name,
            kind,
            required: false,
        }
    }
}

const NUMBER_WORDS: &[(&str, f64)] = &[
    ("one", 1.0),
    ("two", 2.0),
    ("three", 3.0),
    ("four", 4.0),
    ("five", 5.0),
    ("six", 6.0),
    ("seven", 7.0),
    ("eight", 8.0),
    ("nine", 9.0),
    ("ten", 10.0),
    ("ek", 1.0),
    ("teen", 3.0),
    ("chaar", 4.0),
    ("paanch", 5.0),
    ("das", 10.0),
];

const KNOWN_FOLDERS: &[(&str, &str)] = &[
    ("downloads", "~/Downloads"),
    ("desktop", "~/Desktop"),
    ("documents", "~/Documents"),
    ("pictures", "~/Pictures"),
    ("photos", "~/Pictures"),
    ("music", "~/Music"),
    ("videos", "~/Videos"),
];

const APP_ALIASES: &[(&str, &str)] = &[("calc", "calculator"), ("whats app", "whatsapp")];

fn lookup<T: Copy>(table: &[(&str, T)], key: &str) -> Option<T> {
    table.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
}

fn free(tokens: &[Token], consumed: &[bool]) -> impl Iterator<Item = usize> {
    (0..tokens.len()).filter(move |&i| !consumed[i])
}

fn is_content(token: &Token) -> bool {
    !token.is_path() && !is_filler(&token.text)
}

/// Extract one slot. Returns the value and the token positions it used.
pub(crate) fn extract(
    kind: SlotKind,
    tokens: &[Token],
    consumed: &[bool],
) -> Option<(EntityValue, Vec<usize>)> {
    match kind {
        SlotKind::Quantity => free(tokens, consumed).find_map(|i| {
            let token = &tokens[i];
            if token.script == Script::Path {
                return None;
            }
            token
                .text
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .or_else(|| lookup(NUMBER_WORDS, &token.text))
                .map(|n| (EntityValue::Number(n), vec![i]))
        }),
        SlotKind::Path => free(tokens, consumed)
            .find(|&i| tokens[i].is_path())
            .map(|i| (EntityValue::Path(PathBuf::from(&tokens[i].text)), vec![i]))
            .or_else(|| {
                free(tokens, consumed).find_map(|i| {
                    lookup(KNOWN_FOLDERS, &tokens[i].text)
                        .map(|p| (EntityValue::Path(PathBuf::from(p)), vec![i]))
                })
            }),
        SlotKind::Keyword(table) => free(tokens, consumed).find_map(|i| {
            lookup(table, &tokens[i].text).map(|v| (EntityValue::Text(v.to_string()), vec![i]))
        }),
        SlotKind::AppName => {
            let used: Vec<usize> = free(tokens, consumed)
                .filter(|&i| is_content(&tokens[i]) && !is_device_word(&tokens[i].text))
                .collect();
            if used.is_empty() {
                return None;
            }
            let name = join(tokens, &used, " ");
            let name = lookup(APP_ALIASES, &name).map(str::to_string).unwrap_or(name);
            Some((EntityValue::Text(name), used))
        }
        SlotKind::Identifier(aliases) => {
            let used: Vec<usize> = free(tokens, consumed)
                .filter(|&i| is_content(&tokens[i]))
                .collect();
            if used.is_empty() {
                return None;
            }
            let id = join(tokens, &used, "_");
            let id = lookup(aliases, &id).map(str::to_string).unwrap_or(id);
            Some((EntityValue::Text(id), used))
        }
        SlotKind::FreeText => {
            let mut used: Vec<usize> = free(tokens, consumed).collect();
            while used.first().is_some_and(|&i| is_filler(&tokens[i].text)) {
                used.remove(0);
            }
            while used.last().is_some_and(|&i| is_filler(&tokens[i].text)) {
                used.pop();
            }
            if used.is_empty() {
                return None;
            }
            Some((EntityValue::Text(join(tokens, &used, " ")), used))
        }
    }
}

fn join(tokens: &[Token], positions: &[usize], sep: &str) -> String {
    positions
        .iter()
        .map(|&i| tokens[i].text.as_str())
        .collect::<Vec<_>>()
        .join(sep)
}
