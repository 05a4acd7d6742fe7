use std::fmt::Write as _;

use newsdesk_core::Candidate;

use super::complexity::Complexity;
use crate::store::PromptExample;

const HOUSE_STYLE: &str = "You are a senior news analyst writing for a general audience.
House style:
- Plain, neutral language. No hype, no speculation beyond what the article supports.
- Prefer concrete facts: who, what, how much, by when.
- The summary stands on its own for a reader who will not open the article.
- Stakeholder impacts name specific groups, never \"everyone\" or \"society\".
- Background explains why this matters now, not the history of the topic.";

const RUBRIC: &str = "Importance rubric (1-10):
- 9-10: affects most readers directly, or marks a historic turn.
- 7-8: major national or international development with clear consequences.
- 4-6: notable within its field or region.
- 1-3: minor, local, or incremental.
sentiment_confidence is your confidence in the sentiment label, from 0 to 1.";

fn reasoning_steps(complexity: Complexity) -> &'static str {
    match complexity {
        Complexity::Low => "Before answering, identify the main event and who it touches.",
        Complexity::Medium => "Before answering, work through:
1. The main event and the figures reported.
2. The groups affected and in which direction.
3. What a reader needs to know to put it in context.",
        Complexity::High => "Before answering, work through:
1. The main event, separating reported facts from claims.
2. Every figure given, and what it is compared against.
3. First-order effects on each stakeholder group, then second-order effects.
4. The policy, market, or legal context that explains the timing.
5. Whether the overall tone is positive, negative, or neutral for most readers.
Only the final JSON goes in the answer.",
    }
}

/// System prompt for one item: style, rubric, reasoning template, examples.
pub(crate) fn system_prompt(complexity: Complexity, examples: &[PromptExample]) -> String {
    let mut out = format!(
        "{HOUSE_STYLE}\n\n{RUBRIC}\n\n{}",
        reasoning_steps(complexity)
    );
    for (i, example) in examples.iter().enumerate() {
        let _ = write!(
            out,
            "\n\nExample {}\nArticle: {}\nAnswer:\n{}",
            i + 1,
            example.title,
            example.output
        );
    }
    out
}

pub(crate) fn user_prompt(candidate: &Candidate) -> String {
    let mut out = format!("Title: {}\n", candidate.title);
    if let Some(source) = &candidate.source_name {
        let _ = writeln!(out, "Source: {source}");
    }
    if let Some(published) = candidate.published_at {
        let _ = writeln!(out, "Published: {}", published.to_rfc3339());
    }
    if let Some(region) = candidate.region {
        let _ = writeln!(out, "Region: {region}");
    }
    let _ = writeln!(out, "Link: {}", candidate.link);
    if let Some(description) = &candidate.description {
        let _ = write!(out, "\n{description}\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_grows_with_complexity() {
        let low = system_prompt(Complexity::Low, &[]);
        let high = system_prompt(Complexity::High, &[]);
        assert!(low.contains("House style"));
        assert!(!low.contains("second-order"));
        assert!(high.contains("second-order"));
    }

    #[test]
    fn examples_are_numbered_in_order() {
        let examples = vec![
            PromptExample {
                title: "First".into(),
                output: "{}".into(),
            },
            PromptExample {
                title: "Second".into(),
                output: "{}".into(),
            },
        ];
        let prompt = system_prompt(Complexity::Medium, &examples);
        let first = prompt.find("Example 1\nArticle: First").unwrap();
        let second = prompt.find("Example 2\nArticle: Second").unwrap();
        assert!(first < second);
    }

    #[test]
    fn user_prompt_skips_missing_fields() {
        let candidate = Candidate {
            title: "Headline".into(),
            link: "https://news.example.com/a".into(),
            description: None,
            published_at: None,
            source_name: None,
            region: None,
        };
        assert_eq!(
            user_prompt(&candidate),
            "Title: Headline\nLink: https://news.example.com/a\n"
        );
    }
}
