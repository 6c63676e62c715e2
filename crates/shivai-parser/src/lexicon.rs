//! Per-language word lists and language detection.

use once_cell::sync::Lazy;
use std::collections::HashSet;

use shivai_protocols::Language;

use crate::normalize::{Script, Token};

static ENGLISH: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "exit", "quit", "bye", "goodbye", "help", "commands", "command", "what", "can",
        "you", "do", "status", "stats", "show", "open", "launch", "start", "close", "stop",
        "run", "execute", "repeat", "workflow", "routine", "pattern", "learn", "record",
        "build", "develop", "create", "make", "app", "application", "phone", "mobile",
        "screen", "device", "unlock", "lock", "off", "screenshot", "ss", "shot", "take",
        "capture", "battery", "charge", "charging", "level", "check", "how", "much", "left",
        "volume", "sound", "set", "up", "down", "increase", "decrease", "louder", "lower",
        "mute", "note", "notes", "remember", "jot", "write", "expert", "mode", "task",
        "organize", "organise", "arrange", "sort", "clean", "files", "file", "folder",
        "folders", "downloads", "desktop", "documents", "pictures", "photos", "music",
        "videos", "please", "plz", "the", "a", "an", "my", "me", "to", "for", "and", "this",
        "it", "now", "is", "of", "in", "on", "with", "maybe", "later", "morning", "night",
        "todo", "notepad", "calculator", "calc", "chrome", "browser", "camera", "whatsapp",
        "settings", "gallery", "one", "two", "three", "four", "five", "six", "seven",
        "eight", "nine", "ten", "buy", "milk", "call", "backup",
    ]
    .into_iter()
    .collect()
});

static HINDI: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "karo", "kar", "kardo", "karna", "karke", "kholo", "khol", "band", "bund", "chalao",
        "chalu", "banao", "bana", "sikho", "yaad", "rakho", "likho", "lo", "le", "madad",
        "sthiti", "haal", "alvida", "kya", "sakte", "ho", "hai", "hain", "awaaz", "badhao",
        "ghatao", "kam", "zyada", "tez", "dheere", "chup", "kitna", "kitni", "mera", "meri",
        "mere", "ko", "ka", "ki", "ke", "mein", "se", "ye", "yeh", "abhi", "jaldi", "zara",
        "saaf", "ek", "teen", "chaar", "paanch", "das", "subah", "raat", "doodh", "lena",
        "aur", "bhi", "wala", "wali",
    ]
    .into_iter()
    .collect()
});

/// Words that carry no command meaning on their own.
static FILLERS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "karo", "kar", "kardo", "karna", "do", "please", "plz", "zara", "the", "a", "an",
        "my", "mera", "meri", "mere", "ko", "ka", "ki", "ke", "hai", "hain", "ho", "me",
        "mein", "to", "for", "and", "se", "ye", "yeh", "this", "it", "abhi", "now", "jaldi",
        "of", "is",
    ]
    .into_iter()
    .collect()
});

static DEVICE_WORDS: Lazy<HashSet<&'static str>> =
    Lazy::new(|| ["phone", "mobile", "screen", "device"].into_iter().collect());

pub fn is_filler(word: &str) -> bool {
    FILLERS.contains(word)
}

pub(crate) fn is_device_word(word: &str) -> bool {
    DEVICE_WORDS.contains(word)
}

pub(crate) fn is_english(word: &str) -> bool {
    ENGLISH.contains(word)
}

pub(crate) fn is_hindi(word: &str) -> bool {
    HINDI.contains(word)
}

/// Classify tokens as primary (English), secondary (Hindi) or mixed.
///
/// Devanagari tokens always count as Hindi, whatever their romanized
/// form. Paths and words in neither lexicon are ignored. The result is
/// `Mixed` when each language holds at least `min_share` of the
/// recognized tokens.
pub fn detect_language(tokens: &[Token], min_share: f32) -> Language {
    let mut primary = 0usize;
    let mut secondary = 0usize;

    for token in tokens {
        match token.script {
            Script::Path => {}
            Script::Devanagari => secondary += 1,
            Script::Latin => {
                if is_hindi(&token.text) {
                    secondary += 1;
                } else if is_english(&token.text) {
                    primary += 1;
                }
            }
        }
    }

    let known = primary + secondary;
    if known == 0 {
        return Language::Primary;
    }

    let primary_share = primary as f32 / known as f32;
    let secondary_share = secondary as f32 / known as f32;

    if primary > 0 && secondary > 0 && primary_share >= min_share && secondary_share >= min_share
    {
        Language::Mixed
    } else if secondary > primary {
        Language::Secondary
    } else {
        Language::Primary
    }
}
