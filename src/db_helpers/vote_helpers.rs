use sqlx::{Sqlite, SqlitePool};

use crate::{
    errors::RequestError,
    models::VoteTally,
    voting::{VoteTransition, VoteValue},
};

use super::{lock_prompt, require_user, retry_on_conflict};

const RECOUNT_VOTES: &str = r#"
        UPDATE prompts
        SET    upvotes = (SELECT Count(*)
                          FROM   votes
                          WHERE  votes.prompt_id = $1
                                 AND votes.value = 1),
               downvotes = (SELECT Count(*)
                            FROM   votes
                            WHERE  votes.prompt_id = $1
                                   AND votes.value = -1)
        WHERE  id = $1
        RETURNING upvotes, downvotes
"#;

/// Applies the caller's vote and returns the recounted tally. The vote row and
/// the prompt counters change in one transaction.
pub async fn apply_vote_in_db(
    pool: &SqlitePool,
    user_id: Option<i64>,
    prompt_id: i64,
    value: VoteValue,
) -> Result<VoteTally, RequestError> {
    let user_id = require_user(user_id)?;
    retry_on_conflict("vote", || cast_vote(pool, user_id, prompt_id, value)).await
}

async fn cast_vote(
    pool: &SqlitePool,
    user_id: i64,
    prompt_id: i64,
    value: VoteValue,
) -> Result<VoteTally, RequestError> {
    let mut tx = pool.begin().await?;
    lock_prompt(&mut tx, prompt_id).await?;

    let existing = sqlx::query_scalar::<Sqlite, i64>(
        "SELECT value FROM votes WHERE user_id = $1 AND prompt_id = $2",
    )
    .bind(user_id)
    .bind(prompt_id)
    .fetch_optional(&mut tx)
    .await?;

    let transition = VoteTransition::resolve(existing, value);
    match transition {
        VoteTransition::Insert(value) => {
            sqlx::query("INSERT INTO votes (user_id, prompt_id, value) VALUES ($1, $2, $3)")
                .bind(user_id)
                .bind(prompt_id)
                .bind(value)
                .execute(&mut tx)
                .await?;
        }
        VoteTransition::Update(value) => {
            sqlx::query("UPDATE votes SET value = $1 WHERE user_id = $2 AND prompt_id = $3")
                .bind(value)
                .bind(user_id)
                .bind(prompt_id)
                .execute(&mut tx)
                .await?;
        }
        VoteTransition::Delete => {
            sqlx::query("DELETE FROM votes WHERE user_id = $1 AND prompt_id = $2")
                .bind(user_id)
                .bind(prompt_id)
                .execute(&mut tx)
                .await?;
        }
        VoteTransition::Unchanged => {}
    }

    let tally = sqlx::query_as::<Sqlite, VoteTally>(RECOUNT_VOTES)
        .bind(prompt_id)
        .fetch_one(&mut tx)
        .await?;
    tx.commit().await?;

    tracing::debug!(
        prompt_id,
        user_id,
        ?transition,
        upvotes = tally.upvotes,
        downvotes = tally.downvotes,
        "applied vote"
    );
    Ok(tally)
}

/// The caller's current vote: -1, 1, or 0 when there is none.
pub async fn get_vote_state_in_db(
    pool: &SqlitePool,
    user_id: Option<i64>,
    prompt_id: i64,
) -> Result<i64, RequestError> {
    let user_id = require_user(user_id)?;
    let value = sqlx::query_scalar::<Sqlite, i64>(
        "SELECT value FROM votes WHERE user_id = $1 AND prompt_id = $2",
    )
    .bind(user_id)
    .bind(prompt_id)
    .fetch_optional(pool)
    .await?;
    Ok(value.unwrap_or(0))
}
