//! Human feedback on stored articles and the exemplar read path.
//!
//! A rated article marked as an exemplar becomes a few-shot example for
//! future analysis prompts in the same category.

use sqlx::PgPool;

use crate::articles::ArticleRow;
use crate::DbError;

const MIN_RATING: i16 = 1;
const MAX_RATING: i16 = 5;

fn check_rating(rating: i16) -> Result<(), DbError> {
    if (MIN_RATING..=MAX_RATING).contains(&rating) {
        Ok(())
    } else {
        Err(DbError::InvalidRating(rating))
    }
}

/// Record a 1–5 rating for an article.
///
/// # Errors
///
/// Returns [`DbError::InvalidRating`] for out-of-range ratings,
/// [`DbError::NotFound`] if the article does not exist, or [`DbError::Sqlx`].
pub async fn rate_article(pool: &PgPool, id: i64, rating: i16) -> Result<(), DbError> {
    check_rating(rating)?;

    let result = sqlx::query(
        "UPDATE articles SET user_rating = $1, updated_at = NOW() WHERE id = $2",
    )
    .bind(rating)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// Rate an article and promote it to the exemplar pool.
///
/// # Errors
///
/// Same as [`rate_article`].
pub async fn mark_as_exemplar(pool: &PgPool, id: i64, rating: i16) -> Result<(), DbError> {
    check_rating(rating)?;

    let result = sqlx::query(
        "UPDATE articles SET user_rating = $1, is_exemplar = TRUE, updated_at = NOW() \
         WHERE id = $2",
    )
    .bind(rating)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// Highest-rated exemplars, optionally restricted to one category.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_exemplars(
    pool: &PgPool,
    category: Option<&str>,
    limit: i64,
) -> Result<Vec<ArticleRow>, DbError> {
    let rows = sqlx::query_as::<_, ArticleRow>(
        "SELECT id, link, title, description, source_name, region, published_at, \
                image_url, title_score, quality_score, category, sentiment, importance, \
                analysis, user_rating, is_exemplar, collected_at \
         FROM articles \
         WHERE is_exemplar AND ($1::TEXT IS NULL OR category = $1) \
         ORDER BY user_rating DESC NULLS LAST, collected_at DESC \
         LIMIT $2",
    )
    .bind(category)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratings_outside_one_to_five_are_rejected() {
        assert!(check_rating(1).is_ok());
        assert!(check_rating(5).is_ok());
        assert!(matches!(check_rating(0), Err(DbError::InvalidRating(0))));
        assert!(matches!(check_rating(6), Err(DbError::InvalidRating(6))));
    }
}
