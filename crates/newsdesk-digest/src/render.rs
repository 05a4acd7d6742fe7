use std::fmt::Write as _;

use crate::types::DailyDigest;

/// Render a digest as Markdown for storage, display, and grading.
#[must_use]
pub fn render_markdown(digest: &DailyDigest) -> String {
    let mut out = format!("# {}\n\n_{}_\n\n{}\n", digest.headline, digest.date, digest.overview);

    for section in &digest.sections {
        let _ = write!(out, "\n## {}\n\n{}\n", section.title, section.body);
        if !section.articles.is_empty() {
            out.push('\n');
            for article in &section.articles {
                match &article.link {
                    Some(link) => {
                        let _ = writeln!(out, "- [{}]({link}) `#{}`", article.title, article.id);
                    }
                    None => {
                        let _ = writeln!(out, "- {} `#{}`", article.title, article.id);
                    }
                }
            }
        }
    }

    if !digest.insights.is_empty() {
        out.push_str("\n## Key insights\n");
        for insight in &digest.insights {
            let _ = write!(out, "\n{}. **{}** {}\n", insight.rank, insight.title, insight.detail);
            for evidence in &insight.evidence {
                let mut cite = String::new();
                if let Some(id) = evidence.article_id {
                    let _ = write!(cite, " `#{id}`");
                }
                if let Some(source) = &evidence.source {
                    let _ = write!(cite, " ({source})");
                }
                let _ = writeln!(out, "   - {}{cite}", evidence.text);
            }
        }
    }

    let s = &digest.sentiment;
    let _ = write!(
        out,
        "\n---\n\nSentiment: {} positive, {} neutral, {} negative\n",
        s.positive, s.neutral, s.negative
    );
    out
}
