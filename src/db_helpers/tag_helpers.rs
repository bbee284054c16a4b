use std::collections::HashMap;

use sqlx::{Sqlite, SqliteConnection, SqlitePool};

use crate::errors::RequestError;

pub async fn get_tags_in_db(pool: &SqlitePool) -> Result<Vec<String>, RequestError> {
    let result = sqlx::query_scalar::<Sqlite, String>(
        r#"
        SELECT DISTINCT tags.name FROM tags
        JOIN prompt_tags ON prompt_tags.tag_id = tags.id
        ORDER BY tags.name
        "#,
    )
    .fetch_all(pool)
    .await?;
    Ok(result)
}

/// Replaces the prompt's tags, keeping the given order.
pub(crate) async fn set_prompt_tags(
    conn: &mut SqliteConnection,
    prompt_id: i64,
    tags: &[String],
) -> Result<(), RequestError> {
    sqlx::query("DELETE FROM prompt_tags WHERE prompt_id = $1")
        .bind(prompt_id)
        .execute(&mut *conn)
        .await?;

    for (position, tag) in tags.iter().enumerate() {
        let tag_id = sqlx::query_scalar::<Sqlite, i64>(
            r#"
            INSERT INTO tags (name)
            VALUES ($1)
            ON CONFLICT (name) DO UPDATE SET name = excluded.name
            RETURNING id
            "#,
        )
        .bind(tag)
        .fetch_one(&mut *conn)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO prompt_tags (prompt_id, tag_id, position)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(prompt_id)
        .bind(tag_id)
        .bind(position as i64)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// Tags of each prompt in `prompt_ids`, in their stored order.
pub(crate) async fn load_tags(
    conn: &mut SqliteConnection,
    prompt_ids: &[i64],
) -> Result<HashMap<i64, Vec<String>>, RequestError> {
    let mut tags: HashMap<i64, Vec<String>> = HashMap::new();
    if prompt_ids.is_empty() {
        return Ok(tags);
    }

    let placeholders = (1..=prompt_ids.len())
        .map(|i| format!("${i}"))
        .collect::<Vec<_>>()
        .join(", ");
    let query = format!(
        r#"
        SELECT prompt_tags.prompt_id, tags.name FROM prompt_tags
        JOIN tags ON tags.id = prompt_tags.tag_id
        WHERE prompt_tags.prompt_id IN ({placeholders})
        ORDER BY prompt_tags.prompt_id, prompt_tags.position
        "#
    );
    let mut query = sqlx::query_as::<Sqlite, (i64, String)>(&query);
    for id in prompt_ids {
        query = query.bind(*id);
    }
    for (prompt_id, name) in query.fetch_all(&mut *conn).await? {
        tags.entry(prompt_id).or_default().push(name);
    }
    Ok(tags)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db_helpers::test_support::{create_prompt, create_user, test_db};

    #[tokio::test]
    async fn tags_keep_their_order_and_are_shared() {
        let db = test_db().await;
        let user = create_user(&db.pool, "tagger").await;
        let first = create_prompt(&db.pool, user, "First").await;
        let second = create_prompt(&db.pool, user, "Second").await;

        let mut conn = db.pool.acquire().await.unwrap();
        set_prompt_tags(&mut conn, second.id, &["zeta".to_string(), "alpha".to_string()])
            .await
            .unwrap();

        let tags = load_tags(&mut conn, &[first.id, second.id]).await.unwrap();
        assert_eq!(tags[&first.id], vec!["writing".to_string(), "tone".to_string()]);
        assert_eq!(tags[&second.id], vec!["zeta".to_string(), "alpha".to_string()]);

        let all = get_tags_in_db(&db.pool).await.unwrap();
        assert_eq!(all, vec!["alpha", "tone", "writing", "zeta"]);
    }

    #[tokio::test]
    async fn loading_no_ids_is_empty() {
        let db = test_db().await;
        let mut conn = db.pool.acquire().await.unwrap();
        assert!(load_tags(&mut conn, &[]).await.unwrap().is_empty());
    }
}
