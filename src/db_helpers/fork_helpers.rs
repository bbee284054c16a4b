use sqlx::{Sqlite, SqlitePool};

use crate::{
    errors::RequestError,
    models::{ForkSummary, Prompt},
};

use super::{ensure_prompt_exists, fetch_prompt, lock_prompt, require_user};

pub const FORK_TITLE_PREFIX: &str = "Fork of ";

/// Copies the prompt for the caller and records the lineage, both in one
/// transaction.
pub async fn fork_prompt_in_db(
    pool: &SqlitePool,
    user_id: Option<i64>,
    original_id: i64,
) -> Result<Prompt, RequestError> {
    let user_id = require_user(user_id)?;
    let mut tx = pool.begin().await?;
    lock_prompt(&mut tx, original_id).await?;

    let forked_id = sqlx::query_scalar::<Sqlite, i64>(
        r#"
        INSERT INTO prompts (user_id, title, content, description, category, version)
        SELECT $1, $2 || title, content, description, category, version
        FROM   prompts
        WHERE  id = $3
        RETURNING id
        "#,
    )
    .bind(user_id)
    .bind(FORK_TITLE_PREFIX)
    .bind(original_id)
    .fetch_one(&mut tx)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO prompt_tags (prompt_id, tag_id, position)
        SELECT $1, tag_id, position
        FROM   prompt_tags
        WHERE  prompt_id = $2
        "#,
    )
    .bind(forked_id)
    .bind(original_id)
    .execute(&mut tx)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO prompt_forks (original_prompt_id, forked_prompt_id, user_id)
        VALUES ($1, $2, $3)
        "#,
    )
    .bind(original_id)
    .bind(forked_id)
    .bind(user_id)
    .execute(&mut tx)
    .await?;

    let forked = fetch_prompt(&mut tx, forked_id)
        .await?
        .ok_or(RequestError::ServerError)?;
    tx.commit().await?;

    tracing::debug!(original_id, forked_id, user_id, "forked prompt");
    Ok(forked)
}

pub async fn get_fork_summary_in_db(
    pool: &SqlitePool,
    user_id: Option<i64>,
    prompt_id: i64,
) -> Result<ForkSummary, RequestError> {
    ensure_prompt_exists(pool, prompt_id).await?;
    let (count, mine) = sqlx::query_as::<Sqlite, (i64, i64)>(
        r#"
        SELECT COUNT(*),
               COUNT(CASE WHEN user_id = $2 THEN 1 END)
        FROM   prompt_forks
        WHERE  original_prompt_id = $1
        "#,
    )
    .bind(prompt_id)
    .bind(user_id)
    .fetch_one(pool)
    .await?;
    Ok(ForkSummary {
        count,
        is_forked: mine > 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db_helpers::test_support::{count, create_prompt, create_user, test_db};

    #[tokio::test]
    async fn forking_copies_content_and_records_lineage() {
        let db = test_db().await;
        let author = create_user(&db.pool, "author").await;
        let forker = create_user(&db.pool, "forker").await;
        let original = create_prompt(&db.pool, author, "Poet").await;

        let fork = fork_prompt_in_db(&db.pool, Some(forker), original.id)
            .await
            .unwrap();
        assert_ne!(fork.id, original.id);
        assert_eq!(fork.title, "Fork of Poet");
        assert_eq!(fork.content, original.content);
        assert_eq!(fork.description, original.description);
        assert_eq!(fork.tags, original.tags);
        assert_eq!(fork.category, original.category);
        assert_eq!(fork.version, original.version);
        assert_eq!(fork.user_id, forker);
        assert_eq!(fork.author_username, "forker");
        assert_eq!((fork.upvotes, fork.downvotes), (0, 0));

        assert_eq!(count(&db.pool, "SELECT COUNT(*) FROM prompts").await, 2);
        assert_eq!(
            count(
                &db.pool,
                &format!(
                    "SELECT COUNT(*) FROM prompt_forks WHERE original_prompt_id = {} AND forked_prompt_id = {}",
                    original.id, fork.id
                )
            )
            .await,
            1
        );

        let summary = get_fork_summary_in_db(&db.pool, Some(forker), original.id)
            .await
            .unwrap();
        assert_eq!(summary, ForkSummary { count: 1, is_forked: true });
        let for_author = get_fork_summary_in_db(&db.pool, Some(author), original.id)
            .await
            .unwrap();
        assert_eq!(for_author, ForkSummary { count: 1, is_forked: false });
        let anonymous = get_fork_summary_in_db(&db.pool, None, original.id)
            .await
            .unwrap();
        assert!(!anonymous.is_forked);
    }

    #[tokio::test]
    async fn a_failed_lineage_insert_leaves_no_forked_prompt() {
        let db = test_db().await;
        let author = create_user(&db.pool, "author").await;
        let forker = create_user(&db.pool, "forker").await;
        let original = create_prompt(&db.pool, author, "Fragile").await;

        sqlx::query(
            r#"
            CREATE TRIGGER reject_forks BEFORE INSERT ON prompt_forks
            BEGIN
                SELECT RAISE(ABORT, 'fork rejected');
            END
            "#,
        )
        .execute(&db.pool)
        .await
        .unwrap();

        let result = fork_prompt_in_db(&db.pool, Some(forker), original.id).await;
        assert!(matches!(result, Err(RequestError::Storage(_))));
        assert_eq!(count(&db.pool, "SELECT COUNT(*) FROM prompts").await, 1);
        assert_eq!(count(&db.pool, "SELECT COUNT(*) FROM prompt_forks").await, 0);
        assert_eq!(
            count(&db.pool, "SELECT COUNT(*) FROM prompt_tags").await,
            original.tags.len() as i64
        );
    }

    #[tokio::test]
    async fn forking_needs_a_user_and_an_existing_prompt() {
        let db = test_db().await;
        let forker = create_user(&db.pool, "forker").await;
        assert!(matches!(
            fork_prompt_in_db(&db.pool, None, 1).await,
            Err(RequestError::Unauthenticated(_))
        ));
        assert!(matches!(
            fork_prompt_in_db(&db.pool, Some(forker), 404).await,
            Err(RequestError::NotFound(_))
        ));
        assert!(matches!(
            get_fork_summary_in_db(&db.pool, None, 404).await,
            Err(RequestError::NotFound(_))
        ));
        assert_eq!(count(&db.pool, "SELECT COUNT(*) FROM prompts").await, 0);
    }
}
