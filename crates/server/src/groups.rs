//! Group API endpoints

use api_types::group::{GroupCreated, GroupNew, GroupSummary, GroupView, MemberView, MembersAdd};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{ServerError, parse_id, server::ServerState, user};

fn summary_view(group: engine::Group) -> Result<GroupSummary, ServerError> {
    Ok(GroupSummary {
        id: parse_id(&group.id)?,
        created_by: parse_id(&group.created_by)?,
        title: group.title,
        created_at: group.created_at,
    })
}

/// Handle requests for creating a new group.
pub async fn create(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<GroupNew>,
) -> Result<(StatusCode, Json<GroupCreated>), ServerError> {
    let group = state
        .engine
        .create_group(&payload.title, &payload.member_emails, &user.id)
        .await?;

    let group_id = parse_id(&group.id)?;
    Ok((StatusCode::CREATED, Json(GroupCreated { group_id })))
}

/// Handle requests for the authenticated user's groups.
pub async fn list(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
) -> Result<Json<Vec<GroupSummary>>, ServerError> {
    let groups = state
        .engine
        .groups_for_user(&user.id)
        .await?
        .into_iter()
        .map(summary_view)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(groups))
}

/// Handle requests for a single group with its member roster.
pub async fn detail(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(group_id): Path<Uuid>,
) -> Result<Json<GroupView>, ServerError> {
    let (group, members) = state.engine.group_with_members(group_id, &user.id).await?;

    let members = members
        .into_iter()
        .map(|member| {
            Ok(MemberView {
                user_id: parse_id(&member.user_id)?,
                name: member.name,
                email: member.email,
            })
        })
        .collect::<Result<Vec<_>, ServerError>>()?;

    Ok(Json(GroupView {
        id: parse_id(&group.id)?,
        created_by: parse_id(&group.created_by)?,
        title: group.title,
        created_at: group.created_at,
        members,
    }))
}

/// Handle requests for adding members to a group, creator only.
pub async fn add_members(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(group_id): Path<Uuid>,
    Json(payload): Json<MembersAdd>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .add_group_members(group_id, &payload.member_emails, &user.id)
        .await?;

    Ok(StatusCode::CREATED)
}

/// Handle requests for deleting a group, creator only.
pub async fn remove(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(group_id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_group(group_id, &user.id).await?;

    Ok(StatusCode::OK)
}
