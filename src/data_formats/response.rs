use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{
    Comment, ForkSummary, Issue, Prompt, PromptVersion, StarState, StarSummary, User, VoteTally,
};

#[derive(Deserialize, Serialize, Debug)]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
    pub token: String,
    pub username: String,
    pub avatar: Option<String>,
    #[serde(rename = "hasApiKey")]
    pub has_api_key: bool,
}

/// Public view of a user, also embedded as the author of prompts and comments.
#[derive(Deserialize, Serialize, Debug, Default, Clone)]
pub struct AuthorResponse {
    pub id: i64,
    pub username: String,
    pub avatar: Option<String>,
}

#[derive(Deserialize, Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub id: i64,
    pub username: String,
    pub avatar: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PromptResponse {
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
    pub user: AuthorResponse,
}

#[derive(Deserialize, Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CommentResponse {
    pub id: i64,
    pub prompt_id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub user: AuthorResponse,
}

#[derive(Deserialize, Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct IssueResponse {
    pub id: i64,
    pub prompt_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub user: AuthorResponse,
}

#[derive(Deserialize, Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PromptVersionResponse {
    pub id: i64,
    pub prompt_id: i64,
    pub user_id: i64,
    pub version: String,
    pub content: String,
    pub description: Option<String>,
    pub changes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct VoteResponse {
    pub ok: bool,
    pub upvotes: i64,
    pub downvotes: i64,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct VoteStateResponse {
    pub value: i64,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct StarToggleResponse {
    pub starred: bool,
    pub count: i64,
}

#[derive(Deserialize, Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct StarCountResponse {
    pub count: i64,
    pub is_starred: bool,
}

#[derive(Deserialize, Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ForkCountResponse {
    pub count: i64,
    pub is_forked: bool,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct OkResponse {
    pub ok: bool,
}

impl UserResponse {
    pub fn new(
        User {
            id,
            username,
            email,
            avatar,
            api_key,
            ..
        }: User,
        token: String,
    ) -> Self {
        UserResponse {
            id,
            username,
            email,
            avatar,
            has_api_key: api_key.is_some(),
            token,
        }
    }
}

impl ProfileResponse {
    pub fn new(
        User {
            id,
            username,
            avatar,
            created_at,
            ..
        }: User,
    ) -> Self {
        ProfileResponse {
            id,
            username,
            avatar,
            created_at,
        }
    }
}

impl PromptResponse {
    pub fn new(
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
        }: Prompt,
    ) -> Self {
        PromptResponse {
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
            user: AuthorResponse {
                id: user_id,
                username: author_username,
                avatar: author_avatar,
            },
        }
    }
}

impl CommentResponse {
    pub fn new(
        Comment {
            id,
            prompt_id,
            user_id,
            content,
            created_at,
            author_username,
            author_avatar,
        }: Comment,
    ) -> Self {
        CommentResponse {
            id,
            prompt_id,
            content,
            created_at,
            user: AuthorResponse {
                id: user_id,
                username: author_username,
                avatar: author_avatar,
            },
        }
    }
}

impl IssueResponse {
    pub fn new(
        Issue {
            id,
            prompt_id,
            user_id,
            title,
            description,
            status,
            created_at,
            author_username,
            author_avatar,
        }: Issue,
    ) -> Self {
        IssueResponse {
            id,
            prompt_id,
            title,
            description,
            status,
            created_at,
            user: AuthorResponse {
                id: user_id,
                username: author_username,
                avatar: author_avatar,
            },
        }
    }
}

impl From<PromptVersion> for PromptVersionResponse {
    fn from(
        PromptVersion {
            id,
            prompt_id,
            user_id,
            version,
            content,
            description,
            changes,
            created_at,
        }: PromptVersion,
    ) -> Self {
        PromptVersionResponse {
            id,
            prompt_id,
            user_id,
            version,
            content,
            description,
            changes,
            created_at,
        }
    }
}

impl From<VoteTally> for VoteResponse {
    fn from(VoteTally { upvotes, downvotes }: VoteTally) -> Self {
        VoteResponse {
            ok: true,
            upvotes,
            downvotes,
        }
    }
}

impl From<StarState> for StarToggleResponse {
    fn from(StarState { starred, count }: StarState) -> Self {
        StarToggleResponse { starred, count }
    }
}

impl From<StarSummary> for StarCountResponse {
    fn from(StarSummary { count, is_starred }: StarSummary) -> Self {
        StarCountResponse { count, is_starred }
    }
}

impl From<ForkSummary> for ForkCountResponse {
    fn from(ForkSummary { count, is_forked }: ForkSummary) -> Self {
        ForkCountResponse { count, is_forked }
    }
}
