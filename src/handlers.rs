use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query,
    },
    http::{StatusCode, Uri},
    Extension, Json,
};
use sqlx::SqlitePool;

use crate::{
    authentication::{hash_password_argon2, verify_password_argon2, AuthKeys, AuthUser, MaybeUser},
    data_formats::{
        CommentRequest, CommentResponse, CreatePromptRequest, ForkCountResponse, IssueRequest,
        IssueResponse, LoginRequest, OkResponse, ProfileResponse, PromptQueryParams,
        PromptResponse, PromptVersionResponse, RegisterRequest, StarCountResponse,
        StarToggleResponse, Tags, UpdatePromptRequest, UpdateUserRequest, UserResponse,
        UserWrapper, VoteRequest, VoteResponse, VoteStateResponse,
    },
    db_helpers::{
        add_comment_in_db, apply_vote_in_db, create_prompt_in_db, delete_prompt_in_db,
        fork_prompt_in_db, get_comments_in_db, get_fork_summary_in_db, get_issues_in_db,
        get_prompt_in_db, get_prompt_versions_in_db, get_star_summary_in_db, get_tags_in_db,
        get_user_by_email, get_user_by_id, get_vote_state_in_db, insert_user,
        list_prompts_in_db, open_issue_in_db, require_user, toggle_star_in_db,
        update_prompt_in_db, update_user_in_db,
    },
    errors::RequestError,
    voting::VoteValue,
};

type UserJson = UserWrapper<UserResponse>;

type JsonResult<T> = Result<Json<T>, RequestError>;

/// Unwraps a JSON body, reporting a malformed one as a validation error.
fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, RequestError> {
    match payload {
        Ok(Json(body)) => Ok(body),
        Err(rejection) => Err(RequestError::Validation(rejection.body_text())),
    }
}

fn issue_token(keys: &AuthKeys, user_id: i64) -> Result<String, RequestError> {
    keys.issue_token(user_id).map_err(|e| {
        tracing::error!(error = %e, user_id, "could not issue token");
        RequestError::ServerError
    })
}

// ----------------- Helper Handlers -----------------
pub async fn alive() -> &'static str {
    "alive"
}

pub async fn not_found(uri: Uri) -> Result<(), (StatusCode, String)> {
    Err((
        StatusCode::NOT_FOUND,
        format!("URL {} provided was not found", uri),
    ))
}

// ----------------- User Handlers -----------------
pub async fn login_user(
    Extension(pool): Extension<Arc<SqlitePool>>,
    Extension(keys): Extension<Arc<AuthKeys>>,
    payload: Result<Json<UserWrapper<LoginRequest>>, JsonRejection>,
) -> JsonResult<UserJson> {
    let UserWrapper { user: request } = json_body(payload)?;
    let user = get_user_by_email(&pool, request.email.trim())
        .await?
        .ok_or(RequestError::Unauthenticated("Invalid email or password"))?;

    let is_password_correct = verify_password_argon2(request.password, user.password.clone())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "could not verify password");
            RequestError::ServerError
        })?;
    if !is_password_correct {
        return Err(RequestError::Unauthenticated("Invalid email or password"));
    }

    let token = issue_token(&keys, user.id)?;
    Ok(Json(UserWrapper::wrap_with_user_data(UserResponse::new(
        user, token,
    ))))
}

pub async fn register_user(
    Extension(pool): Extension<Arc<SqlitePool>>,
    Extension(keys): Extension<Arc<AuthKeys>>,
    payload: Result<Json<UserWrapper<RegisterRequest>>, JsonRejection>,
) -> JsonResult<UserJson> {
    let UserWrapper { user: request } = json_body(payload)?;
    let mut request = request.normalize()?;
    request.password = hash_password_argon2(request.password)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "could not hash password");
            RequestError::ServerError
        })?;

    let user = insert_user(&pool, &request).await?;
    let token = issue_token(&keys, user.id)?;
    Ok(Json(UserWrapper::wrap_with_user_data(UserResponse::new(
        user, token,
    ))))
}

pub async fn get_current_user(
    Extension(pool): Extension<Arc<SqlitePool>>,
    MaybeUser(maybe_user): MaybeUser,
) -> JsonResult<UserJson> {
    let AuthUser { id, token } =
        maybe_user.ok_or(RequestError::Unauthenticated("Need to be authenticated"))?;
    let user = get_user_by_id(&pool, id)
        .await?
        .ok_or(RequestError::Unauthenticated("User no longer exists"))?;
    Ok(Json(UserWrapper::wrap_with_user_data(UserResponse::new(
        user, token,
    ))))
}

pub async fn update_user(
    MaybeUser(maybe_user): MaybeUser,
    Extension(pool): Extension<Arc<SqlitePool>>,
    payload: Result<Json<UserWrapper<UpdateUserRequest>>, JsonRejection>,
) -> JsonResult<UserJson> {
    let AuthUser { id, token } =
        maybe_user.ok_or(RequestError::Unauthenticated("Need to be authenticated"))?;
    let UserWrapper { user: request } = json_body(payload)?;
    let user = update_user_in_db(&pool, id, request.normalize()?).await?;
    Ok(Json(UserWrapper::wrap_with_user_data(UserResponse::new(
        user, token,
    ))))
}

pub async fn get_user_profile(
    Extension(pool): Extension<Arc<SqlitePool>>,
    Path(user_id): Path<i64>,
) -> JsonResult<ProfileResponse> {
    let user = get_user_by_id(&pool, user_id)
        .await?
        .ok_or(RequestError::NotFound("User not found"))?;
    Ok(Json(ProfileResponse::new(user)))
}
// ----------------- End User Handlers -----------------

pub async fn list_tags(Extension(pool): Extension<Arc<SqlitePool>>) -> JsonResult<Tags> {
    let tags = get_tags_in_db(&pool).await?;
    Ok(Json(Tags { tags }))
}

// ----------------- Prompt Handlers -----------------
pub async fn list_prompts(
    Extension(pool): Extension<Arc<SqlitePool>>,
    params: Result<Query<PromptQueryParams>, QueryRejection>,
) -> JsonResult<Vec<PromptResponse>> {
    let Query(params) =
        params.map_err(|rejection| RequestError::Validation(rejection.body_text()))?;
    let prompts = list_prompts_in_db(&pool, params, chrono::Utc::now()).await?;
    Ok(Json(prompts.into_iter().map(PromptResponse::new).collect()))
}

pub async fn create_prompt(
    Extension(pool): Extension<Arc<SqlitePool>>,
    user: MaybeUser,
    payload: Result<Json<CreatePromptRequest>, JsonRejection>,
) -> JsonResult<PromptResponse> {
    let user_id = require_user(user.get_id())?;
    let request = json_body(payload)?.normalize()?;
    let prompt = create_prompt_in_db(&pool, Some(user_id), request).await?;
    Ok(Json(PromptResponse::new(prompt)))
}

pub async fn get_prompt(
    Extension(pool): Extension<Arc<SqlitePool>>,
    Path(prompt_id): Path<i64>,
) -> JsonResult<PromptResponse> {
    let prompt = get_prompt_in_db(&pool, prompt_id).await?;
    Ok(Json(PromptResponse::new(prompt)))
}

pub async fn update_prompt(
    Extension(pool): Extension<Arc<SqlitePool>>,
    user: MaybeUser,
    Path(prompt_id): Path<i64>,
    payload: Result<Json<UpdatePromptRequest>, JsonRejection>,
) -> JsonResult<PromptResponse> {
    let user_id = require_user(user.get_id())?;
    let request = json_body(payload)?.normalize()?;
    let prompt = update_prompt_in_db(&pool, Some(user_id), prompt_id, request).await?;
    Ok(Json(PromptResponse::new(prompt)))
}

pub async fn delete_prompt(
    Extension(pool): Extension<Arc<SqlitePool>>,
    user: MaybeUser,
    Path(prompt_id): Path<i64>,
) -> JsonResult<OkResponse> {
    delete_prompt_in_db(&pool, user.get_id(), prompt_id).await?;
    Ok(Json(OkResponse { ok: true }))
}

// ----------------- Vote / Star / Fork Handlers -----------------
pub async fn vote_prompt(
    Extension(pool): Extension<Arc<SqlitePool>>,
    user: MaybeUser,
    Path(prompt_id): Path<i64>,
    payload: Result<Json<VoteRequest>, JsonRejection>,
) -> JsonResult<VoteResponse> {
    let user_id = require_user(user.get_id())?;
    let VoteRequest { value } = json_body(payload)?;
    let value = VoteValue::from_json(&value)?;
    let tally = apply_vote_in_db(&pool, Some(user_id), prompt_id, value).await?;
    Ok(Json(tally.into()))
}

pub async fn get_vote_state(
    Extension(pool): Extension<Arc<SqlitePool>>,
    user: MaybeUser,
    Path(prompt_id): Path<i64>,
) -> JsonResult<VoteStateResponse> {
    let value = get_vote_state_in_db(&pool, user.get_id(), prompt_id).await?;
    Ok(Json(VoteStateResponse { value }))
}

pub async fn toggle_star(
    Extension(pool): Extension<Arc<SqlitePool>>,
    user: MaybeUser,
    Path(prompt_id): Path<i64>,
) -> JsonResult<StarToggleResponse> {
    let state = toggle_star_in_db(&pool, user.get_id(), prompt_id).await?;
    Ok(Json(state.into()))
}

pub async fn get_stars(
    Extension(pool): Extension<Arc<SqlitePool>>,
    user: MaybeUser,
    Path(prompt_id): Path<i64>,
) -> JsonResult<StarCountResponse> {
    let summary = get_star_summary_in_db(&pool, user.get_id(), prompt_id).await?;
    Ok(Json(summary.into()))
}

pub async fn fork_prompt(
    Extension(pool): Extension<Arc<SqlitePool>>,
    user: MaybeUser,
    Path(prompt_id): Path<i64>,
) -> JsonResult<PromptResponse> {
    let forked = fork_prompt_in_db(&pool, user.get_id(), prompt_id).await?;
    Ok(Json(PromptResponse::new(forked)))
}

pub async fn get_forks(
    Extension(pool): Extension<Arc<SqlitePool>>,
    user: MaybeUser,
    Path(prompt_id): Path<i64>,
) -> JsonResult<ForkCountResponse> {
    let summary = get_fork_summary_in_db(&pool, user.get_id(), prompt_id).await?;
    Ok(Json(summary.into()))
}

// ----------------- Comment / Issue Handlers -----------------
pub async fn list_comments(
    Extension(pool): Extension<Arc<SqlitePool>>,
    Path(prompt_id): Path<i64>,
) -> JsonResult<Vec<CommentResponse>> {
    let comments = get_comments_in_db(&pool, prompt_id).await?;
    Ok(Json(comments.into_iter().map(CommentResponse::new).collect()))
}

pub async fn add_comment(
    Extension(pool): Extension<Arc<SqlitePool>>,
    user: MaybeUser,
    Path(prompt_id): Path<i64>,
    payload: Result<Json<CommentRequest>, JsonRejection>,
) -> JsonResult<CommentResponse> {
    let user_id = require_user(user.get_id())?;
    let request = json_body(payload)?.normalize()?;
    let comment = add_comment_in_db(&pool, Some(user_id), prompt_id, request).await?;
    Ok(Json(CommentResponse::new(comment)))
}

pub async fn list_versions(
    Extension(pool): Extension<Arc<SqlitePool>>,
    Path(prompt_id): Path<i64>,
) -> JsonResult<Vec<PromptVersionResponse>> {
    let versions = get_prompt_versions_in_db(&pool, prompt_id).await?;
    Ok(Json(versions.into_iter().map(Into::into).collect()))
}

pub async fn list_issues(
    Extension(pool): Extension<Arc<SqlitePool>>,
    Path(prompt_id): Path<i64>,
) -> JsonResult<Vec<IssueResponse>> {
    let issues = get_issues_in_db(&pool, prompt_id).await?;
    Ok(Json(issues.into_iter().map(IssueResponse::new).collect()))
}

pub async fn open_issue(
    Extension(pool): Extension<Arc<SqlitePool>>,
    user: MaybeUser,
    Path(prompt_id): Path<i64>,
    payload: Result<Json<IssueRequest>, JsonRejection>,
) -> JsonResult<IssueResponse> {
    let user_id = require_user(user.get_id())?;
    let request = json_body(payload)?.normalize()?;
    let issue = open_issue_in_db(&pool, Some(user_id), prompt_id, request).await?;
    Ok(Json(IssueResponse::new(issue)))
}
