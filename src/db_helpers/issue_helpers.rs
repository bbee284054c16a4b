use sqlx::{Sqlite, SqlitePool};

use crate::{data_formats::IssueRequest, errors::RequestError, models::Issue};

use super::{ensure_prompt_exists, require_user};

const ISSUE_QUERY: &str = r#"
        SELECT prompt_issues.id,
               prompt_issues.prompt_id,
               prompt_issues.user_id,
               prompt_issues.title,
               prompt_issues.description,
               prompt_issues.status,
               prompt_issues.created_at,
               users.username AS author_username,
               users.avatar   AS author_avatar
        FROM   prompt_issues
               INNER JOIN users
                       ON users.id = prompt_issues.user_id
"#;

/// New issues always start out `open`.
pub async fn open_issue_in_db(
    pool: &SqlitePool,
    user_id: Option<i64>,
    prompt_id: i64,
    IssueRequest { title, description }: IssueRequest,
) -> Result<Issue, RequestError> {
    let user_id = require_user(user_id)?;
    let mut tx = pool.begin().await?;

    let inserted = sqlx::query_scalar::<Sqlite, i64>(
        r#"
        INSERT INTO prompt_issues (prompt_id, user_id, title, description)
        SELECT id, $2, $3, $4 FROM prompts WHERE id = $1
        RETURNING id
        "#,
    )
    .bind(prompt_id)
    .bind(user_id)
    .bind(title)
    .bind(description)
    .fetch_optional(&mut tx)
    .await?
    .ok_or(RequestError::NotFound("Prompt not found"))?;

    let query = format!("{ISSUE_QUERY} WHERE prompt_issues.id = $1");
    let issue = sqlx::query_as::<Sqlite, Issue>(&query)
        .bind(inserted)
        .fetch_one(&mut tx)
        .await?;
    tx.commit().await?;

    tracing::debug!(prompt_id, user_id, issue_id = issue.id, "opened issue");
    Ok(issue)
}

pub async fn get_issues_in_db(
    pool: &SqlitePool,
    prompt_id: i64,
) -> Result<Vec<Issue>, RequestError> {
    ensure_prompt_exists(pool, prompt_id).await?;
    let query = format!(
        "{ISSUE_QUERY} WHERE prompt_issues.prompt_id = $1 ORDER BY prompt_issues.created_at, prompt_issues.id"
    );
    let issues = sqlx::query_as::<Sqlite, Issue>(&query)
        .bind(prompt_id)
        .fetch_all(pool)
        .await?;
    Ok(issues)
}
