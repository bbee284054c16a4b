use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::errors::RequestError;

pub const MAX_TAGS: usize = 10;
pub const MAX_TAG_LENGTH: usize = 32;
pub const DEFAULT_VERSION: &str = "1.0.0";

// ----------------- User Request -----------------
#[derive(Deserialize, Serialize, Debug)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, Serialize, Debug, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "email must be a valid address"))]
    pub email: String,
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    pub password: String,
    #[validate(length(min = 3, max = 32, message = "username must be 3 to 32 characters"))]
    pub username: String,
    #[serde(default)]
    pub avatar: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Default, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct UpdateUserRequest {
    #[validate(email(message = "email must be a valid address"))]
    pub email: Option<String>,
    #[validate(length(min = 3, max = 32, message = "username must be 3 to 32 characters"))]
    pub username: Option<String>,
    pub avatar: Option<String>,
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    pub password: Option<String>,
    pub api_key: Option<String>,
}

impl RegisterRequest {
    pub fn normalize(mut self) -> Result<Self, RequestError> {
        self.email = self.email.trim().to_string();
        self.username = self.username.trim().to_string();
        self.avatar = non_empty(self.avatar);
        self.validate()?;
        Ok(self)
    }
}

impl UpdateUserRequest {
    pub fn normalize(mut self) -> Result<Self, RequestError> {
        self.email = self.email.map(|e| e.trim().to_string());
        self.username = self.username.map(|u| u.trim().to_string());
        // kept as Some("") so the column is cleared
        self.avatar = self.avatar.map(|a| a.trim().to_string());
        self.api_key = self.api_key.map(|k| k.trim().to_string());
        self.validate()?;
        Ok(self)
    }
}

// ----------------- Prompt Request -----------------
#[derive(Deserialize, Serialize, Debug, Validate)]
pub struct CreatePromptRequest {
    #[validate(length(min = 1, max = 200, message = "title must be 1 to 200 characters"))]
    pub title: String,
    #[validate(length(min = 1, max = 20000, message = "content must be 1 to 20000 characters"))]
    pub content: String,
    #[serde(default)]
    #[validate(length(max = 2000, message = "description must be at most 2000 characters"))]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    #[validate(length(min = 1, max = 50, message = "category must be 1 to 50 characters"))]
    pub category: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

/// Absent fields are left alone; an empty description or category clears it.
#[derive(Deserialize, Serialize, Debug, Default, Validate)]
#[serde(default)]
pub struct UpdatePromptRequest {
    #[validate(length(min = 1, max = 200, message = "title must be 1 to 200 characters"))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 20000, message = "content must be 1 to 20000 characters"))]
    pub content: Option<String>,
    #[validate(length(max = 2000, message = "description must be at most 2000 characters"))]
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    #[validate(length(max = 50, message = "category must be at most 50 characters"))]
    pub category: Option<String>,
    pub version: Option<String>,
    /// Note recorded with the snapshot when content or version changes.
    #[validate(length(max = 1000, message = "changes must be at most 1000 characters"))]
    pub changes: Option<String>,
}

impl CreatePromptRequest {
    pub fn normalize(mut self) -> Result<Self, RequestError> {
        self.title = self.title.trim().to_string();
        self.content = self.content.trim().to_string();
        self.description = non_empty(self.description);
        self.category = non_empty(self.category);
        self.tags = normalize_tags(self.tags)?;
        self.version = match non_empty(self.version) {
            Some(version) => Some(check_version(version)?),
            None => None,
        };
        self.validate()?;
        Ok(self)
    }
}

impl UpdatePromptRequest {
    pub fn normalize(mut self) -> Result<Self, RequestError> {
        self.title = self.title.map(|t| t.trim().to_string());
        self.content = self.content.map(|c| c.trim().to_string());
        self.description = self.description.map(|d| d.trim().to_string());
        self.category = self.category.map(|c| c.trim().to_string());
        self.tags = self.tags.map(normalize_tags).transpose()?;
        self.version = self.version.map(check_version).transpose()?;
        self.changes = non_empty(self.changes);
        self.validate()?;
        Ok(self)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Trims, drops blanks and repeats (first occurrence wins), then enforces limits.
pub fn normalize_tags(tags: Vec<String>) -> Result<Vec<String>, RequestError> {
    let mut normalized: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if tag.is_empty() || normalized.iter().any(|t| t == tag) {
            continue;
        }
        if tag.chars().count() > MAX_TAG_LENGTH {
            return Err(RequestError::Validation(format!(
                "tag '{tag}' is longer than {MAX_TAG_LENGTH} characters"
            )));
        }
        normalized.push(tag.to_string());
    }
    if normalized.len() > MAX_TAGS {
        return Err(RequestError::Validation(format!(
            "a prompt can have at most {MAX_TAGS} tags"
        )));
    }
    Ok(normalized)
}

/// Accepts `MAJOR.MINOR.PATCH` with numeric parts.
pub fn check_version(version: String) -> Result<String, RequestError> {
    let version = version.trim().to_string();
    let parts: Vec<&str> = version.split('.').collect();
    let valid = parts.len() == 3
        && parts
            .iter()
            .all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()));
    if !valid {
        return Err(RequestError::Validation(format!(
            "version '{version}' must look like 1.0.0"
        )));
    }
    Ok(version)
}

// ----------------- Vote Request -----------------
#[derive(Deserialize, Serialize, Debug)]
pub struct VoteRequest {
    #[serde(default)]
    pub value: serde_json::Value,
}

// ----------------- Comment / Issue Request -----------------
#[derive(Deserialize, Serialize, Debug, Validate)]
pub struct CommentRequest {
    #[validate(length(min = 1, max = 2000, message = "comment must be 1 to 2000 characters"))]
    pub content: String,
}

#[derive(Deserialize, Serialize, Debug, Validate)]
pub struct IssueRequest {
    #[validate(length(min = 1, max = 200, message = "title must be 1 to 200 characters"))]
    pub title: String,
    #[serde(default)]
    #[validate(length(max = 5000, message = "description must be at most 5000 characters"))]
    pub description: Option<String>,
}

impl CommentRequest {
    pub fn normalize(mut self) -> Result<Self, RequestError> {
        self.content = self.content.trim().to_string();
        self.validate()?;
        Ok(self)
    }
}

impl IssueRequest {
    pub fn normalize(mut self) -> Result<Self, RequestError> {
        self.title = self.title.trim().to_string();
        self.description = non_empty(self.description);
        self.validate()?;
        Ok(self)
    }
}
