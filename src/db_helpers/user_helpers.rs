use sqlx::{Sqlite, SqlitePool};

use crate::{
    authentication::hash_password_argon2,
    data_formats::{RegisterRequest, UpdateUserRequest},
    errors::RequestError,
    models::User,
};

use super::{get_user_by_id, QueryBuilder};

/// `user.password` must already be hashed.
pub async fn insert_user(pool: &SqlitePool, user: &RegisterRequest) -> Result<User, RequestError> {
    let mut tx = pool.begin().await?;
    let user = sqlx::query_as::<Sqlite, User>(
        r#"
        INSERT INTO users (email, username, password, avatar)
        VALUES ($1, $2, $3, $4)
        RETURNING id, username, email, password, api_key, avatar, created_at
        "#,
    )
    .bind(&user.email)
    .bind(&user.username)
    .bind(&user.password)
    .bind(&user.avatar)
    .fetch_one(&mut tx)
    .await
    .map_err(|e| match RequestError::from(e) {
        RequestError::Conflict(_) => RequestError::Conflict("Username or email already taken"),
        other => other,
    })?;
    tx.commit().await?;
    tracing::info!(user_id = user.id, "registered user");
    Ok(user)
}

pub async fn update_user_in_db(
    pool: &SqlitePool,
    id: i64,
    UpdateUserRequest {
        email,
        username,
        avatar,
        password,
        api_key,
    }: UpdateUserRequest,
) -> Result<User, RequestError> {
    let password = match password {
        Some(password) => Some(
            hash_password_argon2(password)
                .await
                .map_err(|_| RequestError::ServerError)?,
        ),
        None => None,
    };

    let builder = QueryBuilder::new("users")
        .add_param("email", email)
        .add_param("username", username)
        .add_nullable_param("avatar", avatar)
        .add_param("password", password)
        .add_nullable_param("api_key", api_key);

    if builder.has_params() {
        let mut tx = pool.begin().await?;
        let (query, params) = builder.build("id");
        let mut query = sqlx::query::<Sqlite>(&query);
        for param in params {
            query = query.bind(param);
        }
        query
            .bind(id)
            .execute(&mut tx)
            .await
            .map_err(|e| match RequestError::from(e) {
                RequestError::Conflict(_) => {
                    RequestError::Conflict("Username or email already taken")
                }
                other => other,
            })?;
        tx.commit().await?;
    }

    match get_user_by_id(pool, id).await? {
        Some(user) => Ok(user),
        None => Err(RequestError::NotFound("User not found")),
    }
}
