use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqliteConnection, SqlitePool};

use crate::data_formats::{
    CreatePromptRequest, PromptQueryParams, UpdatePromptRequest, DEFAULT_VERSION, MAX_LIMIT,
};
use crate::errors::RequestError;
use crate::models::{Prompt, PromptRow, PromptVersion};
use crate::ranking::{rank_prompts, SortMode};

use super::{
    ensure_prompt_exists, load_tags, lock_prompt, require_user, set_prompt_tags, QueryBuilder,
};

pub(crate) const PROMPT_QUERY: &str = r#"
            SELECT prompts.id          AS "id",
                   prompts.user_id     AS "user_id",
                   prompts.title       AS "title",
                   prompts.content     AS "content",
                   prompts.description AS "description",
                   prompts.category    AS "category",
                   prompts.version     AS "version",
                   prompts.upvotes     AS "upvotes",
                   prompts.downvotes   AS "downvotes",
                   prompts.created_at  AS "created_at",
                   prompts.updated_at  AS "updated_at",
                   users.username      AS "author_username",
                   users.avatar        AS "author_avatar"
            FROM   prompts
                   JOIN users
                     ON users.id = prompts.user_id
"#;

const LIST_FILTERS: &str = r#"
            WHERE  ( $1 IS NULL
                      OR prompts.title LIKE $1 ESCAPE '\'
                      OR prompts.content LIKE $1 ESCAPE '\'
                      OR prompts.description LIKE $1 ESCAPE '\' )
               AND ( prompts.category = $2 COLLATE NOCASE
                      OR $2 IS NULL )
               AND ( $3 IS NULL
                      OR EXISTS (SELECT 1
                                 FROM   prompt_tags
                                        JOIN tags
                                          ON tags.id = prompt_tags.tag_id
                                 WHERE  prompt_tags.prompt_id = prompts.id
                                        AND tags.name = $3) )
"#;

const NOW: &str = "strftime('%Y-%m-%dT%H:%M:%fZ', 'now')";

fn like_pattern(search: &str) -> String {
    let escaped = search
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Reads one prompt with its author and tags on `conn`, which may be inside a
/// transaction.
pub(crate) async fn fetch_prompt(
    conn: &mut SqliteConnection,
    prompt_id: i64,
) -> Result<Option<Prompt>, RequestError> {
    let query = format!("{PROMPT_QUERY} WHERE prompts.id = $1");
    let row = sqlx::query_as::<Sqlite, PromptRow>(&query)
        .bind(prompt_id)
        .fetch_optional(&mut *conn)
        .await?;
    let row = match row {
        Some(row) => row,
        None => return Ok(None),
    };
    let mut tags = load_tags(&mut *conn, &[row.id]).await?;
    let tags = tags.remove(&row.id).unwrap_or_default();
    Ok(Some(Prompt::from_row(row, tags)))
}

pub async fn get_prompt_in_db(pool: &SqlitePool, prompt_id: i64) -> Result<Prompt, RequestError> {
    let mut conn = pool.acquire().await?;
    fetch_prompt(&mut conn, prompt_id)
        .await?
        .ok_or(RequestError::NotFound("Prompt not found"))
}

/// Filters in SQL, ranks with `now`, then pages.
pub async fn list_prompts_in_db(
    pool: &SqlitePool,
    PromptQueryParams {
        sort,
        search,
        category,
        tag,
        limit,
        offset,
    }: PromptQueryParams,
    now: DateTime<Utc>,
) -> Result<Vec<Prompt>, RequestError> {
    let mode = match present(sort) {
        Some(sort) => sort.parse::<SortMode>()?,
        None => SortMode::default(),
    };
    let search = present(search).map(|s| like_pattern(&s));

    let mut conn = pool.acquire().await?;
    let query = format!("{PROMPT_QUERY} {LIST_FILTERS}");
    let rows = sqlx::query_as::<Sqlite, PromptRow>(&query)
        .bind(search)
        .bind(present(category))
        .bind(present(tag))
        .fetch_all(&mut *conn)
        .await?;

    let prompts = rows
        .into_iter()
        .map(|row| Prompt::from_row(row, Vec::new()))
        .collect();
    let mut page: Vec<Prompt> = rank_prompts(prompts, mode, now)
        .into_iter()
        .skip(offset as usize)
        .take(limit.min(MAX_LIMIT) as usize)
        .collect();

    let ids: Vec<i64> = page.iter().map(|p| p.id).collect();
    let mut tags = load_tags(&mut conn, &ids).await?;
    for prompt in page.iter_mut() {
        prompt.tags = tags.remove(&prompt.id).unwrap_or_default();
    }
    Ok(page)
}

pub async fn create_prompt_in_db(
    pool: &SqlitePool,
    user_id: Option<i64>,
    CreatePromptRequest {
        title,
        content,
        description,
        tags,
        category,
        version,
    }: CreatePromptRequest,
) -> Result<Prompt, RequestError> {
    let user_id = require_user(user_id)?;
    let mut tx = pool.begin().await?;

    let prompt_id = sqlx::query_scalar::<Sqlite, i64>(
        r#"
        INSERT INTO prompts (user_id, title, content, description, category, version)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id
        "#,
    )
    .bind(user_id)
    .bind(title)
    .bind(content)
    .bind(description)
    .bind(category)
    .bind(version.unwrap_or_else(|| DEFAULT_VERSION.to_string()))
    .fetch_one(&mut tx)
    .await?;

    set_prompt_tags(&mut tx, prompt_id, &tags).await?;
    let prompt = fetch_prompt(&mut tx, prompt_id)
        .await?
        .ok_or(RequestError::ServerError)?;
    tx.commit().await?;

    tracing::debug!(prompt_id, user_id, "created prompt");
    Ok(prompt)
}

pub async fn update_prompt_in_db(
    pool: &SqlitePool,
    user_id: Option<i64>,
    prompt_id: i64,
    UpdatePromptRequest {
        title,
        content,
        description,
        tags,
        category,
        version,
        changes,
    }: UpdatePromptRequest,
) -> Result<Prompt, RequestError> {
    let user_id = require_user(user_id)?;
    let mut tx = pool.begin().await?;

    let owner = lock_prompt(&mut tx, prompt_id).await?;
    if owner != user_id {
        return Err(RequestError::Forbidden);
    }

    // snapshot only when the edit actually replaces content or version
    let snapshotted = sqlx::query(
        r#"
        INSERT INTO prompt_versions (prompt_id, user_id, version, content, description, changes)
        SELECT id, $2, version, content, description, $3
        FROM   prompts
        WHERE  id = $1
               AND ( ( $4 IS NOT NULL AND $4 <> content )
                      OR ( $5 IS NOT NULL AND $5 <> version ) )
        "#,
    )
    .bind(prompt_id)
    .bind(user_id)
    .bind(changes)
    .bind(content.as_deref())
    .bind(version.as_deref())
    .execute(&mut tx)
    .await?
    .rows_affected()
        > 0;

    let (query, params) = QueryBuilder::new("prompts")
        .add_param("title", title)
        .add_param("content", content)
        .add_nullable_param("description", description)
        .add_nullable_param("category", category)
        .add_param("version", version)
        .add_expression(&format!("updated_at = {NOW}"))
        .build("id");
    let mut query = sqlx::query::<Sqlite>(&query);
    for param in params {
        query = query.bind(param);
    }
    query.bind(prompt_id).execute(&mut tx).await?;

    if let Some(tags) = tags {
        set_prompt_tags(&mut tx, prompt_id, &tags).await?;
    }

    let prompt = fetch_prompt(&mut tx, prompt_id)
        .await?
        .ok_or(RequestError::NotFound("Prompt not found"))?;
    tx.commit().await?;

    tracing::debug!(prompt_id, user_id, snapshotted, "updated prompt");
    Ok(prompt)
}

/// Earlier states of the prompt, newest first.
pub async fn get_prompt_versions_in_db(
    pool: &SqlitePool,
    prompt_id: i64,
) -> Result<Vec<PromptVersion>, RequestError> {
    ensure_prompt_exists(pool, prompt_id).await?;
    let versions = sqlx::query_as::<Sqlite, PromptVersion>(
        r#"
        SELECT id, prompt_id, user_id, version, content, description, changes, created_at
        FROM   prompt_versions
        WHERE  prompt_id = $1
        ORDER  BY created_at DESC, id DESC
        "#,
    )
    .bind(prompt_id)
    .fetch_all(pool)
    .await?;
    Ok(versions)
}

pub async fn delete_prompt_in_db(
    pool: &SqlitePool,
    user_id: Option<i64>,
    prompt_id: i64,
) -> Result<(), RequestError> {
    let user_id = require_user(user_id)?;
    let mut tx = pool.begin().await?;

    let owner = lock_prompt(&mut tx, prompt_id).await?;
    if owner != user_id {
        return Err(RequestError::Forbidden);
    }
    sqlx::query("DELETE FROM prompts WHERE id = $1")
        .bind(prompt_id)
        .execute(&mut tx)
        .await?;
    tx.commit().await?;

    tracing::debug!(prompt_id, user_id, "deleted prompt");
    Ok(())
}
