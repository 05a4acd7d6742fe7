use std::collections::HashSet;

use newsdesk_core::Candidate;

use crate::store::ArticleStore;

/// Drop candidates whose link is already stored, before any paid work.
///
/// Duplicate links within the batch are collapsed first (first occurrence
/// wins). If the existence check fails, a warning is logged and the
/// collapsed batch is returned unfiltered; the insert path still refuses
/// duplicates later.
pub async fn deduplicate(store: &dyn ArticleStore, candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut seen = HashSet::new();
    let unique: Vec<Candidate> = candidates
        .into_iter()
        .filter(|c| seen.insert(c.link.trim().to_owned()))
        .collect();

    if unique.is_empty() {
        return unique;
    }

    let links: Vec<String> = unique.iter().map(|c| c.link.trim().to_owned()).collect();
    match store.existing_links(&links).await {
        Ok(known) => unique
            .into_iter()
            .filter(|c| !known.contains(c.link.trim()))
            .collect(),
        Err(e) => {
            tracing::warn!(
                error = %e,
                candidates = unique.len(),
                "existence check failed; continuing without deduplication"
            );
            unique
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use newsdesk_core::AnalyzedItem;
    use newsdesk_db::DbError;

    use super::*;

    /// In-memory store keyed by link. `fail_lookups` simulates an outage of
    /// the existence check; `fail_saves_for` rejects specific links.
    #[derive(Default)]
    pub(crate) struct MemoryStore {
        pub(crate) links: Mutex<Vec<String>>,
        pub(crate) fail_lookups: bool,
        pub(crate) fail_saves_for: Vec<String>,
    }

    #[async_trait]
    impl ArticleStore for MemoryStore {
        async fn existing_links(&self, links: &[String]) -> Result<HashSet<String>, DbError> {
            if self.fail_lookups {
                return Err(DbError::Sqlx(sqlx::Error::PoolTimedOut));
            }
            let stored = self.links.lock().unwrap();
            Ok(links.iter().filter(|l| stored.contains(*l)).cloned().collect())
        }

        async fn save_article(&self, item: &AnalyzedItem) -> Result<Option<i64>, DbError> {
            let link = item.candidate().link.clone();
            if self.fail_saves_for.contains(&link) {
                return Err(DbError::Sqlx(sqlx::Error::PoolTimedOut));
            }
            let mut stored = self.links.lock().unwrap();
            if stored.contains(&link) {
                return Ok(None);
            }
            stored.push(link);
            Ok(Some(i64::try_from(stored.len()).unwrap()))
        }
    }

    fn candidate(link: &str) -> Candidate {
        Candidate {
            title: link.to_string(),
            link: link.to_string(),
            description: None,
            published_at: None,
            source_name: None,
            region: None,
        }
    }

    #[tokio::test]
    async fn removes_known_links_and_in_batch_repeats() {
        let store = MemoryStore {
            links: Mutex::new(vec!["https://a.example.com".to_string()]),
            ..MemoryStore::default()
        };
        let out = deduplicate(
            &store,
            vec![
                candidate("https://a.example.com"),
                candidate("https://b.example.com"),
                candidate("https://b.example.com "),
                candidate("https://c.example.com"),
            ],
        )
        .await;

        let links: Vec<&str> = out.iter().map(|c| c.link.as_str()).collect();
        assert_eq!(links, vec!["https://b.example.com", "https://c.example.com"]);
    }

    #[tokio::test]
    async fn storage_outage_returns_input_unfiltered() {
        let store = MemoryStore {
            links: Mutex::new(vec!["https://a.example.com".to_string()]),
            fail_lookups: true,
            ..MemoryStore::default()
        };
        let out = deduplicate(
            &store,
            vec![candidate("https://a.example.com"), candidate("https://b.example.com")],
        )
        .await;
        assert_eq!(out.len(), 2);
    }
}
