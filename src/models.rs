use chrono::{DateTime, Utc};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password: String,
    pub api_key: Option<String>,
    pub avatar: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A prompt row joined with its author, as read before tags are attached.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PromptRow {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub content: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub version: String,
    pub upvotes: i64,
    pub downvotes: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub author_username: String,
    pub author_avatar: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Prompt {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub content: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub category: Option<String>,
    pub version: String,
    pub upvotes: i64,
    pub downvotes: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub author_username: String,
    pub author_avatar: Option<String>,
}

impl Prompt {
    pub fn from_row(row: PromptRow, tags: Vec<String>) -> Self {
        let PromptRow {
            id,
            user_id,
            title,
            content,
            description,
            category,
            version,
            upvotes,
            downvotes,
            created_at,
            updated_at,
            author_username,
            author_avatar,
        } = row;
        Prompt {
            id,
            user_id,
            title,
            content,
            description,
            tags,
            category,
            version,
            upvotes,
            downvotes,
            created_at,
            updated_at,
            author_username,
            author_avatar,
        }
    }
}

/// Materialized vote counters of a prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow)]
pub struct VoteTally {
    pub upvotes: i64,
    pub downvotes: i64,
}

/// A prompt's state before one of its edits.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PromptVersion {
    pub id: i64,
    pub prompt_id: i64,
    pub user_id: i64,
    pub version: String,
    pub content: String,
    pub description: Option<String>,
    pub changes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StarState {
    pub starred: bool,
    pub count: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StarSummary {
    pub count: i64,
    pub is_starred: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForkSummary {
    pub count: i64,
    pub is_forked: bool,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Comment {
    pub id: i64,
    pub prompt_id: i64,
    pub user_id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub author_username: String,
    pub author_avatar: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Issue {
    pub id: i64,
    pub prompt_id: i64,
    pub user_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub author_username: String,
    pub author_avatar: Option<String>,
}
