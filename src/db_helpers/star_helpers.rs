use sqlx::{Sqlite, SqliteConnection, SqlitePool};

use crate::{
    errors::RequestError,
    models::{StarState, StarSummary},
};

use super::{ensure_prompt_exists, lock_prompt, require_user, retry_on_conflict};

async fn count_stars(conn: &mut SqliteConnection, prompt_id: i64) -> Result<i64, RequestError> {
    let count =
        sqlx::query_scalar::<Sqlite, i64>("SELECT COUNT(*) FROM prompt_stars WHERE prompt_id = $1")
            .bind(prompt_id)
            .fetch_one(conn)
            .await?;
    Ok(count)
}

/// Flips the caller's star. Every call changes state; there is no "set".
pub async fn toggle_star_in_db(
    pool: &SqlitePool,
    user_id: Option<i64>,
    prompt_id: i64,
) -> Result<StarState, RequestError> {
    let user_id = require_user(user_id)?;
    retry_on_conflict("star", || flip_star(pool, user_id, prompt_id)).await
}

async fn flip_star(
    pool: &SqlitePool,
    user_id: i64,
    prompt_id: i64,
) -> Result<StarState, RequestError> {
    let mut tx = pool.begin().await?;
    lock_prompt(&mut tx, prompt_id).await?;

    let removed = sqlx::query("DELETE FROM prompt_stars WHERE user_id = $1 AND prompt_id = $2")
        .bind(user_id)
        .bind(prompt_id)
        .execute(&mut tx)
        .await?
        .rows_affected()
        > 0;
    if !removed {
        sqlx::query("INSERT INTO prompt_stars (user_id, prompt_id) VALUES ($1, $2)")
            .bind(user_id)
            .bind(prompt_id)
            .execute(&mut tx)
            .await?;
    }

    let count = count_stars(&mut tx, prompt_id).await?;
    tx.commit().await?;

    let starred = !removed;
    tracing::debug!(prompt_id, user_id, starred, count, "toggled star");
    Ok(StarState { starred, count })
}

pub async fn get_star_summary_in_db(
    pool: &SqlitePool,
    user_id: Option<i64>,
    prompt_id: i64,
) -> Result<StarSummary, RequestError> {
    ensure_prompt_exists(pool, prompt_id).await?;
    let mut conn = pool.acquire().await?;
    let count = count_stars(&mut conn, prompt_id).await?;
    let is_starred = match user_id {
        Some(user_id) => sqlx::query_scalar::<Sqlite, i64>(
            "SELECT COUNT(*) FROM prompt_stars WHERE user_id = $1 AND prompt_id = $2",
        )
        .bind(user_id)
        .bind(prompt_id)
        .fetch_one(&mut *conn)
        .await?
            > 0,
        None => false,
    };
    Ok(StarSummary { count, is_starred })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db_helpers::test_support::{count, create_prompt, create_user, test_db};

    #[tokio::test]
    async fn toggling_twice_restores_the_original_state() {
        let db = test_db().await;
        let author = create_user(&db.pool, "author").await;
        let fan = create_user(&db.pool, "fan").await;
        let prompt = create_prompt(&db.pool, author, "Shiny").await;

        let before = get_star_summary_in_db(&db.pool, Some(fan), prompt.id)
            .await
            .unwrap();
        assert_eq!(before, StarSummary { count: 0, is_starred: false });

        let first = toggle_star_in_db(&db.pool, Some(fan), prompt.id).await.unwrap();
        assert_eq!(first, StarState { starred: true, count: 1 });
        let second = toggle_star_in_db(&db.pool, Some(fan), prompt.id).await.unwrap();
        assert_eq!(second, StarState { starred: false, count: 0 });

        let after = get_star_summary_in_db(&db.pool, Some(fan), prompt.id)
            .await
            .unwrap();
        assert_eq!(after, before);
    }

    #[tokio::test]
    async fn counts_cover_every_user_and_anonymous_callers_see_not_starred() {
        let db = test_db().await;
        let author = create_user(&db.pool, "author").await;
        let a = create_user(&db.pool, "a").await;
        let b = create_user(&db.pool, "b").await;
        let prompt = create_prompt(&db.pool, author, "Popular").await;

        toggle_star_in_db(&db.pool, Some(a), prompt.id).await.unwrap();
        let state = toggle_star_in_db(&db.pool, Some(b), prompt.id).await.unwrap();
        assert_eq!(state, StarState { starred: true, count: 2 });

        let anonymous = get_star_summary_in_db(&db.pool, None, prompt.id)
            .await
            .unwrap();
        assert_eq!(anonymous, StarSummary { count: 2, is_starred: false });
        assert_eq!(
            count(&db.pool, "SELECT COUNT(*) FROM prompt_stars").await,
            2
        );
    }

    #[tokio::test]
    async fn stars_need_a_user_and_an_existing_prompt() {
        let db = test_db().await;
        let fan = create_user(&db.pool, "fan").await;
        assert!(matches!(
            toggle_star_in_db(&db.pool, None, 1).await,
            Err(RequestError::Unauthenticated(_))
        ));
        assert!(matches!(
            toggle_star_in_db(&db.pool, Some(fan), 404).await,
            Err(RequestError::NotFound(_))
        ));
        assert!(matches!(
            get_star_summary_in_db(&db.pool, None, 404).await,
            Err(RequestError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn concurrent_toggles_by_one_user_never_duplicate_the_row() {
        let db = test_db().await;
        let author = create_user(&db.pool, "author").await;
        let fan = create_user(&db.pool, "fan").await;
        let prompt_id = create_prompt(&db.pool, author, "Raced").await.id;

        let handles: Vec<_> = (0..6)
            .map(|_| {
                let pool = db.pool.clone();
                tokio::spawn(async move { toggle_star_in_db(&pool, Some(fan), prompt_id).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        // an even number of flips lands back on "not starred"
        let summary = get_star_summary_in_db(&db.pool, Some(fan), prompt_id)
            .await
            .unwrap();
        assert_eq!(summary, StarSummary { count: 0, is_starred: false });
    }
}
