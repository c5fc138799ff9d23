use crate::api::ErrorResponse;
use crate::auth::{create_session, hash_password};
use crate::config::Config;
use crate::db::DbPool;
use crate::error::{ServiceError, ServiceResult};
use crate::models::{NewUser, User};
use crate::schema::users;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SignupRequest {
    pub email: String,
    pub username: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SignupResponse {
    pub user_id: Uuid,
    pub token: String,
}

/// Column widths of the `users` table.
const MAX_EMAIL_LENGTH: usize = 254;
const MAX_NAME_LENGTH: usize = 150;

fn check_length(field: &str, value: &str, max: usize) -> ServiceResult<()> {
    if value.trim().chars().count() > max {
        return Err(ServiceError::validation(format!(
            "{field} cannot be longer than {max} characters"
        )));
    }
    Ok(())
}

fn validate(req: &SignupRequest) -> ServiceResult<()> {
    if !req.email.contains('@') {
        return Err(ServiceError::validation("Email address is invalid"));
    }
    if req.username.trim().is_empty() {
        return Err(ServiceError::validation("Username cannot be empty"));
    }
    check_length("Email", &req.email, MAX_EMAIL_LENGTH)?;
    check_length("Username", &req.username, MAX_NAME_LENGTH)?;
    check_length("First name", &req.first_name, MAX_NAME_LENGTH)?;
    check_length("Last name", &req.last_name, MAX_NAME_LENGTH)?;
    if req.password.len() < 8 {
        return Err(ServiceError::validation(
            "Password must be at least 8 characters",
        ));
    }
    Ok(())
}

fn hashing_failed(err: impl std::fmt::Display) -> ServiceError {
    ServiceError::Internal(format!("Failed to hash password: {err}"))
}

#[utoipa::path(
    post,
    path = "/api/auth/signup",
    tag = "auth",
    request_body(content = SignupRequest, example = json!({
        "email": "cook@example.com",
        "username": "cook",
        "first_name": "Julia",
        "last_name": "Child",
        "password": "password123"
    })),
    responses(
        (status = 201, description = "User created successfully", body = SignupResponse),
        (status = 400, description = "Invalid request or account already exists", body = ErrorResponse)
    )
)]
pub async fn signup(
    State(pool): State<Arc<DbPool>>,
    State(config): State<Arc<Config>>,
    Json(req): Json<SignupRequest>,
) -> ServiceResult<impl IntoResponse> {
    validate(&req)?;

    let password_hash = hash_password(&req.password).map_err(hashing_failed)?;

    let mut conn = pool.get()?;

    let new_user = NewUser {
        email: req.email.trim(),
        username: req.username.trim(),
        first_name: req.first_name.trim(),
        last_name: req.last_name.trim(),
        password_hash: &password_hash,
    };

    let user: User = match diesel::insert_into(users::table)
        .values(&new_user)
        .returning(User::as_returning())
        .get_result(&mut conn)
    {
        Ok(u) => u,
        Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
            return Err(ServiceError::AlreadyExists(
                "Email or username already registered".to_string(),
            ))
        }
        Err(e) => return Err(e.into()),
    };

    let token = create_session(&mut conn, user.id, config.session_ttl_days)?;

    tracing::info!(user_id = %user.id, "user signed up");

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            user_id: user.id,
            token,
        }),
    ))
}
