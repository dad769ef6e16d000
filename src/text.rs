use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

pub const MAX_WORDS: usize = 100;

static PUNCTUATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s]").expect("valid punctuation regex"));

const STOP_WORDS: &[&str] = &[
    "the", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by", "from", "up",
    "about", "into", "through", "during", "before", "after", "above", "below", "between",
    "among", "around", "a", "an", "is", "was", "are", "were", "be", "been", "being", "have",
    "has", "had", "do", "does", "did", "will", "would", "could", "should", "may", "might",
    "must", "can", "this", "that", "these", "those", "i", "you", "he", "she", "it", "we", "they",
    "me", "him", "her", "us", "them",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WordData {
    pub text: String,
    pub size: usize,
}

fn keep(word: &str) -> bool {
    word.chars().count() > 2 && !STOP_WORDS.contains(&word) && word.parse::<f64>().is_err()
}

/// Most frequent words across `texts`, highest count first, at most [`MAX_WORDS`].
/// Words with equal counts keep the order in which they were first seen.
pub fn word_frequencies<I, S>(texts: I) -> Vec<WordData>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut order: Vec<String> = Vec::new();
    let mut counts: HashMap<String, usize> = HashMap::new();
    for text in texts {
        let lowered = text.as_ref().to_lowercase();
        let cleaned = PUNCTUATION_RE.replace_all(&lowered, "");
        for word in cleaned.split_whitespace().filter(|w| keep(w)) {
            match counts.get_mut(word) {
                Some(count) => *count += 1,
                None => {
                    counts.insert(word.to_string(), 1);
                    order.push(word.to_string());
                }
            }
        }
    }

    let mut words: Vec<WordData> = order
        .into_iter()
        .map(|text| {
            let size = counts.get(&text).copied().unwrap_or_default();
            WordData { text, size }
        })
        .collect();
    // stable sort keeps first-seen order among equal counts
    words.sort_by(|a, b| b.size.cmp(&a.size));
    words.truncate(MAX_WORDS);
    words
}
