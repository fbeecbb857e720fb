use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordVerifier},
};
use axum::{
    Router,
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Basic},
};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

use std::sync::Arc;

use crate::{expenses, groups, splits, user};
use engine::Engine;

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
    pub db: DatabaseConnection,
}

/// Basic auth against the users table.
///
/// The username is the account email (stored lowercased) and the password is
/// checked against the argon2 hash. Every failure mode is a plain 401 so the
/// response does not leak whether the account exists.
async fn auth(
    auth_header: Option<TypedHeader<Authorization<Basic>>>,
    State(state): State<ServerState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(TypedHeader(credentials)) = auth_header else {
        return Err(StatusCode::UNAUTHORIZED);
    };
    if credentials.username().is_empty() || credentials.password().is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    let user: Option<user::Model> = user::Entity::find()
        .filter(user::Column::Email.eq(credentials.username().to_lowercase()))
        .one(&state.db)
        .await
        .map_err(|_| StatusCode::UNAUTHORIZED)?;

    let Some(user) = user else {
        return Err(StatusCode::UNAUTHORIZED);
    };

    let Ok(stored_hash) = PasswordHash::new(&user.password_hash) else {
        return Err(StatusCode::UNAUTHORIZED);
    };
    if Argon2::default()
        .verify_password(credentials.password().as_bytes(), &stored_hash)
        .is_err()
    {
        return Err(StatusCode::UNAUTHORIZED);
    }

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

pub fn router(engine: Engine, db: DatabaseConnection) -> Router {
    let state = ServerState {
        engine: Arc::new(engine),
        db,
    };

    Router::new()
        .route("/api/me", get(user::me))
        .route("/api/users/me", axum::routing::delete(user::delete_me))
        .route("/api/groups", post(groups::create).get(groups::list))
        .route(
            "/api/groups/{group_id}",
            get(groups::detail).delete(groups::remove),
        )
        .route("/api/groups/{group_id}/members", post(groups::add_members))
        .route(
            "/api/groups/{group_id}/expenses",
            post(expenses::create).get(expenses::list_for_group),
        )
        .route("/api/expenses", get(expenses::list_for_user))
        .route(
            "/api/expenses/{expense_id}",
            get(expenses::detail).delete(expenses::remove),
        )
        .route(
            "/api/expenses/{expense_id}/splits/{split_id}",
            axum::routing::put(splits::update),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), auth))
        // Registration is the one route that must work without credentials.
        .route("/api/register", post(user::register))
        .with_state(state)
}

pub async fn run_with_listener(
    engine: Engine,
    db: DatabaseConnection,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, router(engine, db)).await
}
