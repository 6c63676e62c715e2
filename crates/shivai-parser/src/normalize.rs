//! Utterance normalization.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

/// Script a token was written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Script {
    Latin,
    Devanagari,
    /// A filesystem path, kept verbatim.
    Path,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    pub script: Script,
}

impl Token {
    pub fn new(text: impl Into<String>, script: Script) -> Self {
        Self {
            text: text.into(),
            script,
        }
    }

    pub fn is_path(&self) -> bool {
        self.script == Script::Path
    }
}

static PATH_RE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^(~|\.{1,2})?/|^~$|^[A-Za-z]:\\|^\w+/\S+").ok());

/// Common Devanagari words and their romanized spelling.
static ROMANIZED: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    [
        ("फोन", "phone"),
        ("फ़ोन", "phone"),
        ("मोबाइल", "mobile"),
        ("स्क्रीन", "screen"),
        ("अनलॉक", "unlock"),
        ("लॉक", "lock"),
        ("करो", "karo"),
        ("करें", "karo"),
        ("कर", "kar"),
        ("दो", "do"),
        ("खोलो", "kholo"),
        ("बंद", "band"),
        ("मदद", "madad"),
        ("बैटरी", "battery"),
        ("आवाज़", "awaaz"),
        ("आवाज", "awaaz"),
        ("स्क्रीनशॉट", "screenshot"),
        ("लो", "lo"),
        ("नोट", "note"),
        ("लिखो", "likho"),
        ("चलाओ", "chalao"),
        ("बनाओ", "banao"),
        ("स्थिति", "sthiti"),
        ("अलविदा", "alvida"),
        ("कम", "kam"),
        ("है", "hai"),
        ("क्या", "kya"),
        ("सकते", "sakte"),
        ("ऐप", "app"),
        ("सीखो", "sikho"),
        ("याद", "yaad"),
        ("रखो", "rakho"),
        ("पैटर्न", "pattern"),
        ("कितनी", "kitni"),
        ("कितना", "kitna"),
        ("मेरा", "mera"),
        ("मेरी", "meri"),
        ("को", "ko"),
        ("एक", "ek"),
        ("तीन", "teen"),
        ("पांच", "paanch"),
    ]
    .into_iter()
    .collect()
});

fn is_devanagari(c: char) -> bool {
    // U+0964/U+0965 are the danda punctuation marks.
    matches!(c, '\u{0900}'..='\u{097F}') && !matches!(c, '\u{0964}' | '\u{0965}')
}

fn is_path_like(word: &str) -> bool {
    PATH_RE.as_ref().is_some_and(|re| re.is_match(word))
}

/// Romanized form of a Devanagari word, if known.
pub fn romanize(word: &str) -> Option<&'static str> {
    ROMANIZED.get(word).copied()
}

/// Split an utterance into normalized tokens.
///
/// Case is folded, punctuation becomes a separator, and a word mixing
/// Latin and Devanagari characters is split at the script boundary.
/// Path-like words (`~/Downloads`, `./notes.txt`) are kept verbatim.
pub fn normalize(utterance: &str) -> Vec<Token> {
    let mut tokens = Vec::new();

    for word in utterance.split_whitespace() {
        let trimmed = word.trim_end_matches(['.', ',', '!', '?', ';', ':', '"', '\'']);
        let trimmed = trimmed.trim_start_matches(['"', '\'']);
        if is_path_like(trimmed) {
            tokens.push(Token::new(trimmed, Script::Path));
            continue;
        }

        let mut segment = String::new();
        let mut segment_script = Script::Latin;

        for c in word.chars() {
            let script = if is_devanagari(c) {
                Some(Script::Devanagari)
            } else if c.is_alphanumeric() {
                Some(Script::Latin)
            } else {
                None
            };

            match script {
                Some(script) if segment.is_empty() || script == segment_script => {
                    segment_script = script;
                    segment.extend(c.to_lowercase());
                }
                Some(script) => {
                    push_segment(&mut tokens, std::mem::take(&mut segment), segment_script);
                    segment_script = script;
                    segment.extend(c.to_lowercase());
                }
                None => push_segment(&mut tokens, std::mem::take(&mut segment), segment_script),
            }
        }
        push_segment(&mut tokens, segment, segment_script);
    }

    tokens
}

fn push_segment(tokens: &mut Vec<Token>, segment: String, script: Script) {
    if segment.is_empty() {
        return;
    }
    let text = match script {
        Script::Devanagari => romanize(&segment)
            .map(str::to_string)
            .unwrap_or(segment),
        _ => segment,
    };
    tokens.push(Token::new(text, script));
}

#[cfg(test)]
pub(crate) fn texts(tokens: &[Token]) -> Vec<&str> {
    tokens.iter().map(|t| t.text.as_str()).collect()
}
