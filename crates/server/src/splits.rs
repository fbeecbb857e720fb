//! Split settlement endpoints

use api_types::expense::SplitView;
use api_types::split::SplitUpdate;
use axum::{
    Extension, Json,
    extract::{Path, State},
};
use engine::SplitStatusUpdate;
use uuid::Uuid;

use crate::{ServerError, expenses, server::ServerState, user};

/// Handle requests for updating the accepted/paid flags on a split.
pub async fn update(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path((expense_id, split_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<SplitUpdate>,
) -> Result<Json<SplitView>, ServerError> {
    let update = SplitStatusUpdate {
        accept: payload.is_accepted,
        pay: payload.is_paid,
    };
    let detail = state
        .engine
        .update_split(expense_id, split_id, update, &user.id)
        .await?;

    Ok(Json(expenses::split_view(detail)?))
}
