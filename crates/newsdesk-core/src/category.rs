//! Keyword-based category inference for articles that have not been analyzed yet.

use crate::article::Category;

/// Ordered `(category, keywords)` table. The first category with a matching
/// keyword wins, so more specific categories come first.
///
/// Keywords are lowercase single words matched against whole words.
pub(crate) const CATEGORY_KEYWORDS: &[(Category, &[&str])] = &[
    (
        Category::Health,
        &[
            "health", "hospital", "vaccine", "virus", "disease", "patients", "medical",
            "outbreak", "cancer", "pandemic",
        ],
    ),
    (
        Category::Environment,
        &[
            "climate", "emissions", "wildfire", "flood", "drought", "pollution", "carbon",
            "biodiversity", "heatwave",
        ],
    ),
    (
        Category::Technology,
        &[
            "ai", "software", "chip", "chips", "semiconductor", "startup", "cyber",
            "smartphone", "algorithm", "robot", "internet",
        ],
    ),
    (
        Category::Science,
        &[
            "research", "scientists", "study", "space", "nasa", "physics", "telescope",
            "genome", "discovery",
        ],
    ),
    (
        Category::Economy,
        &[
            "inflation", "gdp", "economy", "recession", "unemployment", "rates", "tariff",
            "tariffs", "yen", "dollar", "bank",
        ],
    ),
    (
        Category::Business,
        &[
            "company", "earnings", "profit", "shares", "merger", "acquisition", "ceo",
            "revenue", "ipo", "layoffs",
        ],
    ),
    (
        Category::Politics,
        &[
            "election", "minister", "parliament", "president", "senate", "congress",
            "government", "vote", "policy", "cabinet",
        ],
    ),
    (
        Category::International,
        &[
            "war", "summit", "diplomatic", "embassy", "treaty", "sanctions", "united",
            "nato", "foreign",
        ],
    ),
    (
        Category::Sports,
        &[
            "match", "league", "tournament", "championship", "olympics", "coach", "goal",
            "season", "cup",
        ],
    ),
    (
        Category::Culture,
        &[
            "film", "movie", "music", "festival", "album", "museum", "art", "novel",
            "actor",
        ],
    ),
];

/// Infer a category from free text (title + description).
///
/// Falls back to [`Category::Society`] when nothing matches.
#[must_use]
pub fn classify(text: &str) -> Category {
    let words: Vec<String> = text
        .split_whitespace()
        .map(|w| {
            w.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|w| !w.is_empty())
        .collect();

    CATEGORY_KEYWORDS
        .iter()
        .find(|(_, keywords)| words.iter().any(|w| keywords.contains(&w.as_str())))
        .map_or(Category::Society, |(category, _)| *category)
}
