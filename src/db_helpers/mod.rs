use std::future::Future;

use sqlx::{Sqlite, SqliteConnection, SqlitePool};

use crate::{errors::RequestError, models::User};

mod comment_helpers;
mod fork_helpers;
mod issue_helpers;
mod prompt_helpers;
mod star_helpers;
mod tag_helpers;
mod user_helpers;
mod vote_helpers;

pub use comment_helpers::*;
pub use fork_helpers::*;
pub use issue_helpers::*;
pub use prompt_helpers::*;
pub use star_helpers::*;
pub use tag_helpers::*;
pub use user_helpers::*;
pub use vote_helpers::*;

/// Builds `UPDATE <table> SET ... WHERE <key> = $n` from the fields that are present.
struct QueryBuilder {
    table: &'static str,
    assignments: Vec<String>,
    params: Vec<Option<String>>,
    seperator: &'static str,
}

impl QueryBuilder {
    fn new(table: &'static str) -> Self {
        Self {
            table,
            assignments: vec![],
            params: vec![],
            seperator: ", ",
        }
    }

    fn add_param(self, column: &str, param: Option<String>) -> Self {
        match param {
            Some(value) => self.push(column, Some(value)),
            None => self,
        }
    }

    /// `Some("")` clears the column.
    fn add_nullable_param(self, column: &str, param: Option<String>) -> Self {
        match param {
            Some(value) if value.is_empty() => self.push(column, None),
            Some(value) => self.push(column, Some(value)),
            None => self,
        }
    }

    fn add_expression(mut self, assignment: &str) -> Self {
        self.assignments.push(assignment.to_string());
        self
    }

    fn push(mut self, column: &str, value: Option<String>) -> Self {
        self.params.push(value);
        self.assignments
            .push(format!("{} = ${}", column, self.params.len()));
        self
    }

    fn has_params(&self) -> bool {
        !self.params.is_empty()
    }

    /// The key is bound last, as `$<params + 1>`.
    pub fn build(self, key_column: &str) -> (String, Vec<Option<String>>) {
        let query = format!(
            "UPDATE {} SET {} WHERE {} = ${}",
            self.table,
            self.assignments.join(self.seperator),
            key_column,
            self.params.len() + 1
        );
        (query, self.params)
    }
}

// ----------------- Helper Functions -----------------

pub fn require_user(user_id: Option<i64>) -> Result<i64, RequestError> {
    user_id.ok_or(RequestError::Unauthenticated("Need to be authenticated"))
}

/// Claims the write lock on the prompt as the first statement of the
/// transaction, so concurrent writers wait on the busy timeout rather than
/// failing a read-to-write lock upgrade. Returns the prompt's owner.
pub(crate) async fn lock_prompt(
    conn: &mut SqliteConnection,
    prompt_id: i64,
) -> Result<i64, RequestError> {
    sqlx::query_scalar::<Sqlite, i64>(
        "UPDATE prompts SET upvotes = upvotes WHERE id = $1 RETURNING user_id",
    )
    .bind(prompt_id)
    .fetch_optional(conn)
    .await?
    .ok_or(RequestError::NotFound("Prompt not found"))
}

pub async fn ensure_prompt_exists(pool: &SqlitePool, prompt_id: i64) -> Result<(), RequestError> {
    let exists = sqlx::query_scalar::<Sqlite, i64>("SELECT id FROM prompts WHERE id = $1")
        .bind(prompt_id)
        .fetch_optional(pool)
        .await?;
    match exists {
        Some(_) => Ok(()),
        None => Err(RequestError::NotFound("Prompt not found")),
    }
}

/// Runs `operation` again once if it lost a race on a unique index or a lock.
pub(crate) async fn retry_on_conflict<T, F, Fut>(
    operation: &'static str,
    mut run: F,
) -> Result<T, RequestError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RequestError>>,
{
    match run().await {
        Err(RequestError::Conflict(reason)) => {
            tracing::warn!(operation, reason, "conflict, retrying once");
            run().await
        }
        other => other,
    }
}

const USER_QUERY: &str = r#"
        SELECT id, username, email, password, api_key, avatar, created_at FROM users
"#;

pub async fn get_user_by_email(
    pool: &SqlitePool,
    email: &str,
) -> Result<Option<User>, RequestError> {
    let query = format!("{USER_QUERY} WHERE email = $1");
    let result = sqlx::query_as::<Sqlite, User>(&query)
        .bind(email)
        .fetch_optional(pool)
        .await?;
    Ok(result)
}

pub async fn get_user_by_id(pool: &SqlitePool, id: i64) -> Result<Option<User>, RequestError> {
    let query = format!("{USER_QUERY} WHERE id = $1");
    let result = sqlx::query_as::<Sqlite, User>(&query)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(result)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_builder_numbers_params_and_binds_key_last() {
        let builder = QueryBuilder::new("prompts")
            .add_param("title", Some("New".into()))
            .add_param("content", None)
            .add_nullable_param("description", Some(String::new()))
            .add_expression("updated_at = CURRENT_TIMESTAMP");
        assert!(builder.has_params());
        let (query, params) = builder.build("id");
        assert_eq!(
            query,
            "UPDATE prompts SET title = $1, description = $2, updated_at = CURRENT_TIMESTAMP WHERE id = $3"
        );
        assert_eq!(params, vec![Some("New".to_string()), None]);
    }

    #[test]
    fn query_builder_without_fields_has_no_params() {
        assert!(!QueryBuilder::new("users").add_param("email", None).has_params());
    }

    #[tokio::test]
    async fn retry_runs_again_after_a_conflict_only() {
        let mut calls = 0;
        let result = retry_on_conflict("test", || {
            calls += 1;
            let attempt = calls;
            async move {
                if attempt == 1 {
                    Err(RequestError::Conflict("raced"))
                } else {
                    Ok(attempt)
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(result, 2);

        let mut calls = 0;
        let result: Result<(), _> = retry_on_conflict("test", || {
            calls += 1;
            async { Err(RequestError::NotFound("missing")) }
        })
        .await;
        assert!(matches!(result, Err(RequestError::NotFound(_))));
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn locking_a_missing_prompt_is_not_found() {
        let db = test_support::test_db().await;
        let mut tx = db.pool.begin().await.unwrap();
        let result = lock_prompt(&mut tx, 999).await;
        assert!(matches!(result, Err(RequestError::NotFound(_))));
    }

    #[tokio::test]
    async fn locking_returns_the_owner() {
        let db = test_support::test_db().await;
        let owner = test_support::create_user(&db.pool, "owner").await;
        let prompt = test_support::create_prompt(&db.pool, owner, "Greeter").await;
        let mut tx = db.pool.begin().await.unwrap();
        assert_eq!(lock_prompt(&mut tx, prompt.id).await.unwrap(), owner);
    }
}
