//! Built-in few-shot examples, used when the exemplar store has none.

use newsdesk_core::{Candidate, Category, Region};

use crate::store::{infer_category, PromptExample};

struct BuiltIn {
    category: Category,
    region: Region,
    title: &'static str,
    output: &'static str,
}

const BUILT_INS: &[BuiltIn] = &[
    BuiltIn {
        category: Category::Economy,
        region: Region::Domestic,
        title: "Central bank holds benchmark rate at 3.5% as inflation eases",
        output: r#"{
  "summary": "The central bank kept its benchmark rate at 3.5 percent, citing a third straight month of slowing inflation, and signalled cuts are possible next year.",
  "stakeholder_impacts": [
    {"stakeholder": "Mortgage holders", "impact": "Variable-rate payments stay flat for now.", "direction": "neutral"},
    {"stakeholder": "Savers", "impact": "Deposit rates remain near recent highs.", "direction": "positive"}
  ],
  "background": "Rates were raised eleven times over two years to fight post-pandemic inflation.",
  "keywords": ["central bank", "interest rates", "inflation"],
  "category": "economy",
  "sentiment": "neutral",
  "sentiment_confidence": 0.8,
  "importance": 7
}"#,
    },
    BuiltIn {
        category: Category::Politics,
        region: Region::Domestic,
        title: "Parliament passes budget after overnight session",
        output: r#"{
  "summary": "Lawmakers approved next year's budget by a narrow margin after an overnight sitting, ending weeks of stalemate over defence and welfare spending.",
  "stakeholder_impacts": [
    {"stakeholder": "Public sector workers", "impact": "Pay settlements funded in the budget can now be paid.", "direction": "positive"},
    {"stakeholder": "Opposition parties", "impact": "Failed to secure amendments on welfare cuts.", "direction": "negative"}
  ],
  "background": "The coalition lost its majority in the spring and has relied on independents since.",
  "keywords": ["budget", "parliament", "coalition"],
  "category": "politics",
  "sentiment": "neutral",
  "sentiment_confidence": 0.7,
  "importance": 8
}"#,
    },
    BuiltIn {
        category: Category::Technology,
        region: Region::International,
        title: "Chipmaker opens new fabrication plant amid supply concerns",
        output: r#"{
  "summary": "A major semiconductor manufacturer opened a fabrication plant that will add about a tenth of its global capacity when fully running in two years.",
  "stakeholder_impacts": [
    {"stakeholder": "Device makers", "impact": "More secure supply of advanced chips from 2028.", "direction": "positive"},
    {"stakeholder": "Local residents", "impact": "Concerns over water use in a drought-prone region.", "direction": "mixed"}
  ],
  "background": "Chip shortages in 2021 and 2022 halted car and electronics production worldwide.",
  "keywords": ["semiconductors", "supply chain", "manufacturing"],
  "category": "technology",
  "sentiment": "positive",
  "sentiment_confidence": 0.75,
  "importance": 6
}"#,
    },
    BuiltIn {
        category: Category::Health,
        region: Region::Domestic,
        title: "Hospitals report record winter waiting times",
        output: r#"{
  "summary": "Emergency departments recorded their longest average waits on record last month, with one in five patients waiting more than twelve hours.",
  "stakeholder_impacts": [
    {"stakeholder": "Patients", "impact": "Longer delays for urgent treatment.", "direction": "negative"},
    {"stakeholder": "Hospital staff", "impact": "Sustained overtime and burnout risk.", "direction": "negative"}
  ],
  "background": "Bed occupancy has stayed above 95 percent since the start of the flu season.",
  "keywords": ["hospitals", "waiting times", "healthcare"],
  "category": "health",
  "sentiment": "negative",
  "sentiment_confidence": 0.85,
  "importance": 7
}"#,
    },
    BuiltIn {
        category: Category::International,
        region: Region::International,
        title: "Ceasefire talks resume in Geneva",
        output: r#"{
  "summary": "Negotiators returned to Geneva for a new round of ceasefire talks, with humanitarian corridors and prisoner exchanges at the top of the agenda.",
  "stakeholder_impacts": [
    {"stakeholder": "Civilians in the conflict zone", "impact": "Possible access to aid if corridors are agreed.", "direction": "positive"},
    {"stakeholder": "Mediating governments", "impact": "Credibility tied to a tangible outcome.", "direction": "mixed"}
  ],
  "background": "Two earlier rounds collapsed over sequencing of troop withdrawals.",
  "keywords": ["ceasefire", "diplomacy", "Geneva"],
  "category": "international",
  "sentiment": "neutral",
  "sentiment_confidence": 0.6,
  "importance": 8
}"#,
    },
];

/// Up to `limit` built-in examples: same inferred category first, then same
/// region.
#[must_use]
pub fn builtin_examples(candidate: &Candidate, limit: usize) -> Vec<PromptExample> {
    let category = infer_category(candidate);
    let mut picked: Vec<&BuiltIn> = BUILT_INS.iter().filter(|b| b.category == category).collect();

    if picked.is_empty() {
        if let Some(region) = candidate.region {
            picked = BUILT_INS.iter().filter(|b| b.region == region).collect();
        }
    }

    picked
        .into_iter()
        .take(limit)
        .map(|b| PromptExample {
            title: b.title.to_string(),
            output: b.output.to_string(),
        })
        .collect()
}
