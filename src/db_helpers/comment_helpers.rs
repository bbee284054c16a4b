use sqlx::{Sqlite, SqlitePool};

use crate::{data_formats::CommentRequest, errors::RequestError, models::Comment};

use super::{ensure_prompt_exists, require_user};

const COMMENT_QUERY: &str = r#"
        SELECT comments.id,
               comments.prompt_id,
               comments.user_id,
               comments.content,
               comments.created_at,
               users.username AS author_username,
               users.avatar   AS author_avatar
        FROM   comments
               INNER JOIN users
                       ON users.id = comments.user_id
"#;

pub async fn add_comment_in_db(
    pool: &SqlitePool,
    user_id: Option<i64>,
    prompt_id: i64,
    CommentRequest { content }: CommentRequest,
) -> Result<Comment, RequestError> {
    let user_id = require_user(user_id)?;
    let mut tx = pool.begin().await?;

    let inserted = sqlx::query_scalar::<Sqlite, i64>(
        r#"
        INSERT INTO comments (prompt_id, user_id, content)
        SELECT id, $2, $3 FROM prompts WHERE id = $1
        RETURNING id
        "#,
    )
    .bind(prompt_id)
    .bind(user_id)
    .bind(content)
    .fetch_optional(&mut tx)
    .await?
    .ok_or(RequestError::NotFound("Prompt not found"))?;

    let query = format!("{COMMENT_QUERY} WHERE comments.id = $1");
    let comment = sqlx::query_as::<Sqlite, Comment>(&query)
        .bind(inserted)
        .fetch_one(&mut tx)
        .await?;
    tx.commit().await?;
    Ok(comment)
}

pub async fn get_comments_in_db(
    pool: &SqlitePool,
    prompt_id: i64,
) -> Result<Vec<Comment>, RequestError> {
    ensure_prompt_exists(pool, prompt_id).await?;
    let query = format!(
        "{COMMENT_QUERY} WHERE comments.prompt_id = $1 ORDER BY comments.created_at, comments.id"
    );
    let comments = sqlx::query_as::<Sqlite, Comment>(&query)
        .bind(prompt_id)
        .fetch_all(pool)
        .await?;
    Ok(comments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db_helpers::test_support::{count, create_prompt, create_user, test_db};

    fn comment(content: &str) -> CommentRequest {
        CommentRequest {
            content: content.to_string(),
        }
    }

    #[tokio::test]
    async fn comments_come_back_in_the_order_they_were_written() {
        let db = test_db().await;
        let author = create_user(&db.pool, "author").await;
        let reader = create_user(&db.pool, "reader").await;
        let prompt = create_prompt(&db.pool, author, "Chatty").await;

        let first = add_comment_in_db(&db.pool, Some(reader), prompt.id, comment("first"))
            .await
            .unwrap();
        assert_eq!(first.author_username, "reader");
        assert_eq!(first.prompt_id, prompt.id);
        add_comment_in_db(&db.pool, Some(author), prompt.id, comment("second"))
            .await
            .unwrap();

        let comments = get_comments_in_db(&db.pool, prompt.id).await.unwrap();
        let contents: Vec<_> = comments.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second"]);
        assert_eq!(comments[1].author_username, "author");
    }

    #[tokio::test]
    async fn commenting_needs_a_user_and_an_existing_prompt() {
        let db = test_db().await;
        let reader = create_user(&db.pool, "reader").await;
        assert!(matches!(
            add_comment_in_db(&db.pool, None, 1, comment("hi")).await,
            Err(RequestError::Unauthenticated(_))
        ));
        assert!(matches!(
            add_comment_in_db(&db.pool, Some(reader), 404, comment("hi")).await,
            Err(RequestError::NotFound(_))
        ));
        assert!(matches!(
            get_comments_in_db(&db.pool, 404).await,
            Err(RequestError::NotFound(_))
        ));
        assert_eq!(count(&db.pool, "SELECT COUNT(*) FROM comments").await, 0);
    }
}
