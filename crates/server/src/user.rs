//! Account endpoints plus the user row the auth middleware resolves.

use api_types::user::{Register, Registered, UserView};
use argon2::{
    Argon2,
    password_hash::{PasswordHasher, SaltString, rand_core::OsRng},
};
use axum::{Extension, Json, extract::State, http::StatusCode};
use sea_orm::entity::prelude::*;

use crate::{ServerError, parse_id, server::ServerState};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub password_hash: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

fn hash_password(password: &str) -> Result<String, ServerError> {
    if password.trim().is_empty() {
        return Err(ServerError::Generic(
            "password must not be empty".to_string(),
        ));
    }

    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|err| ServerError::Generic(err.to_string()))?
        .to_string())
}

/// Handle account registration, the only unauthenticated request.
pub async fn register(
    State(state): State<ServerState>,
    Json(payload): Json<Register>,
) -> Result<(StatusCode, Json<Registered>), ServerError> {
    let password_hash = hash_password(&payload.password)?;
    let user = state
        .engine
        .register_user(
            &payload.first_name,
            &payload.last_name,
            &payload.email,
            payload.phone.as_deref(),
            &password_hash,
        )
        .await?;

    let id = parse_id(&user.id)?;
    Ok((StatusCode::CREATED, Json(Registered { id })))
}

/// Handle requests for the authenticated user's own profile.
pub async fn me(Extension(user): Extension<Model>) -> Result<Json<UserView>, ServerError> {
    let id = parse_id(&user.id)?;
    Ok(Json(UserView {
        id,
        name: format!("{} {}", user.first_name, user.last_name),
        email: user.email,
        first_name: user.first_name,
        last_name: user.last_name,
        phone: user.phone,
    }))
}

/// Handle account deletion for the authenticated user.
pub async fn delete_me(
    Extension(user): Extension<Model>,
    State(state): State<ServerState>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_user(&user.id).await?;

    Ok(StatusCode::OK)
}
