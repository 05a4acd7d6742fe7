use std::fmt;
use std::sync::LazyLock;

use newsdesk_core::Candidate;
use regex::Regex;

static NUMERIC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:[$€£¥]\s?\d)|(?:\d[\d,.]*\s?(?:%|percent|per cent|million|billion|trillion|bn|mn))",
    )
    .expect("valid regex")
});

/// Terms that signal policy, market, or legal substance.
const DOMAIN_KEYWORDS: &[&str] = &[
    "inflation",
    "interest rate",
    "gdp",
    "tariff",
    "budget",
    "deficit",
    "central bank",
    "legislation",
    "regulation",
    "supreme court",
    "ruling",
    "sanctions",
    "treaty",
    "merger",
    "acquisition",
    "earnings",
    "bond",
    "election",
    "referendum",
    "clinical trial",
    "emissions",
    "semiconductor",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Complexity {
    Low,
    Medium,
    High,
}

impl fmt::Display for Complexity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Complexity::Low => "low",
            Complexity::Medium => "medium",
            Complexity::High => "high",
        })
    }
}

/// Estimate how much reasoning an article needs.
///
/// Points: description over 600 chars = 2, over 250 = 1; a numeric or
/// monetary figure = 1; two or more domain keywords = 2, one = 1.
/// Totals of 0–1 are low, 2–3 medium, 4 and above high.
#[must_use]
pub fn estimate_complexity(candidate: &Candidate) -> Complexity {
    let description = candidate.description.as_deref().unwrap_or("");
    let text = format!("{} {description}", candidate.title);
    let lower = text.to_lowercase();

    let length_points = match description.chars().count() {
        n if n > 600 => 2,
        n if n > 250 => 1,
        _ => 0,
    };
    let numeric_points = u8::from(NUMERIC_RE.is_match(&text));
    let keyword_points = match DOMAIN_KEYWORDS.iter().filter(|k| lower.contains(*k)).count() {
        0 => 0,
        1 => 1,
        _ => 2,
    };

    match length_points + numeric_points + keyword_points {
        0 | 1 => Complexity::Low,
        2 | 3 => Complexity::Medium,
        _ => Complexity::High,
    }
}
