//! Digest data model.

use chrono::NaiveDate;
use newsdesk_core::{ArticleAnalysis, Sentiment};
use newsdesk_db::ArticleRow;
use serde::{Deserialize, Serialize};

/// Title used for a cited id that is not in the corpus.
pub const UNAVAILABLE_TITLE: &str = "(unavailable)";

/// One stored article the digest may cite, keyed by its database id.
#[derive(Debug, Clone, PartialEq)]
pub struct CorpusArticle {
    pub id: i64,
    pub title: String,
    pub link: String,
    pub source_name: Option<String>,
    pub analysis: ArticleAnalysis,
}

impl CorpusArticle {
    /// Decode a stored row. Rows whose analysis no longer parses are skipped
    /// by callers.
    ///
    /// # Errors
    ///
    /// Returns [`serde_json::Error`] if the `analysis` column does not decode.
    pub fn from_row(row: &ArticleRow) -> Result<Self, serde_json::Error> {
        Ok(Self {
            id: row.id,
            title: row.title.clone(),
            link: row.link.clone(),
            source_name: row.source_name.clone(),
            analysis: row.analysis()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyDigest {
    pub date: NaiveDate,
    pub headline: String,
    pub overview: String,
    pub sections: Vec<Section>,
    /// Ordered by `rank`, starting at 1.
    pub insights: Vec<Insight>,
    pub sentiment: SentimentTally,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub title: String,
    pub body: String,
    pub articles: Vec<ArticleRef>,
}

/// A resolved citation. Unknown ids keep their number but carry
/// [`UNAVAILABLE_TITLE`] and no link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleRef {
    pub id: i64,
    pub title: String,
    pub link: Option<String>,
}

impl ArticleRef {
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.link.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub rank: u32,
    pub title: String,
    pub detail: String,
    pub evidence: Vec<EvidenceItem>,
}

/// A cited justification. `article_id` is kept as generated so the
/// evidence check can judge it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceItem {
    pub text: String,
    pub article_id: Option<i64>,
    pub source: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentTally {
    pub positive: u32,
    pub neutral: u32,
    pub negative: u32,
}

impl SentimentTally {
    #[must_use]
    pub fn from_corpus(corpus: &[CorpusArticle]) -> Self {
        corpus.iter().fold(Self::default(), |mut tally, a| {
            match a.analysis.sentiment {
                Sentiment::Positive => tally.positive += 1,
                Sentiment::Neutral => tally.neutral += 1,
                Sentiment::Negative => tally.negative += 1,
            }
            tally
        })
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.positive + self.neutral + self.negative
    }
}
