use std::sync::LazyLock;

use regex::Regex;

use crate::models::Rating;
use crate::sheet::Cell;

static VERY_NEGATIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"very\s*dissatisfied|strongly\s*disagree").expect("valid very-negative regex")
});
static VERY_POSITIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"very\s*satisfied|strongly\s*agree").expect("valid very-positive regex")
});
static NEGATIVE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"dissatisfied|disagree").expect("valid negative regex"));
static NEUTRAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"neither|neutral").expect("valid neutral regex"));
static POSITIVE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"satisfied|agree").expect("valid positive regex"));

pub fn evaluation_rating(cell: &Cell) -> Rating {
    match cell {
        Cell::Number(n) => rating_from_number(*n),
        Cell::Text(text) => evaluation_text_rating(text),
        _ => Rating::ABSENT,
    }
}

pub fn evaluation_text_rating(text: &str) -> Rating {
    let normalized = text.trim().to_lowercase();
    let score = match normalized.as_str() {
        "very dissatisfied" | "did not prepare at all" => 1,
        "dissatisfied" | "prepared very little" => 2,
        "neither dissatisfied nor satisfied" | "neither satisfied nor dissatisfied" | "neutral"
        | "prepared a little" => 3,
        "satisfied" | "prepared reasonably well" => 4,
        "very satisfied" | "prepared very well" => 5,
        _ => return parse_numeric(&normalized),
    };
    Rating::new(score).unwrap_or(Rating::ABSENT)
}

pub fn proposal_rating(cell: &Cell) -> Rating {
    match cell {
        Cell::Number(n) => rating_from_number(*n),
        Cell::Text(text) => proposal_text_rating(text),
        _ => Rating::ABSENT,
    }
}

pub fn proposal_text_rating(text: &str) -> Rating {
    let normalized = text.trim().to_lowercase().replace(',', ".");
    if let Some(digit) = normalized.chars().find(|c| ('1'..='5').contains(c)) {
        return digit
            .to_digit(10)
            .and_then(|d| u8::try_from(d).ok())
            .and_then(Rating::new)
            .unwrap_or(Rating::ABSENT);
    }
    // Most specific phrases first: "very satisfied" contains "satisfied" and
    // "neither agree nor disagree" contains "disagree".
    let score = if VERY_NEGATIVE_RE.is_match(&normalized) {
        1
    } else if VERY_POSITIVE_RE.is_match(&normalized) {
        5
    } else if NEUTRAL_RE.is_match(&normalized) {
        3
    } else if NEGATIVE_RE.is_match(&normalized) {
        2
    } else if POSITIVE_RE.is_match(&normalized) {
        4
    } else {
        return parse_numeric(&normalized);
    };
    Rating::new(score).unwrap_or(Rating::ABSENT)
}

fn parse_numeric(text: &str) -> Rating {
    text.trim()
        .parse::<f64>()
        .map(rating_from_number)
        .unwrap_or(Rating::ABSENT)
}

/// Rounds to the nearest whole score. Values off the 1-5 scale count as unanswered.
pub fn rating_from_number(value: f64) -> Rating {
    if !value.is_finite() {
        return Rating::ABSENT;
    }
    let rounded = value.round();
    if (1.0..=f64::from(Rating::MAX)).contains(&rounded) {
        Rating::new(rounded as u8).unwrap_or(Rating::ABSENT)
    } else {
        Rating::ABSENT
    }
}
