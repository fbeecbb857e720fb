//! Expense API endpoints

use api_types::expense::{ExpenseNew, ExpenseView, SplitInput, SplitType, SplitView};
use api_types::{Money, Percentage};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use engine::{Amount, ExpenseDetail, Percent, SplitDetail, SplitKind, SplitSpec};
use uuid::Uuid;

use crate::{ServerError, parse_id, server::ServerState, user};

fn map_kind(kind: SplitKind) -> SplitType {
    match kind {
        SplitKind::Even => SplitType::Even,
        SplitKind::Percentage => SplitType::Percentage,
        SplitKind::FixedAmount => SplitType::Amount,
    }
}

fn split_spec(split_type: SplitType, splits: Vec<SplitInput>) -> Result<SplitSpec, ServerError> {
    match split_type {
        SplitType::Even => Ok(SplitSpec::Even {
            members: splits.into_iter().map(|split| split.user_id).collect(),
        }),
        SplitType::Percentage => {
            let shares = splits
                .into_iter()
                .map(|split| {
                    let percentage = split.percentage.ok_or_else(|| {
                        ServerError::Generic(
                            "percentage is required for percentage splits".to_string(),
                        )
                    })?;
                    Ok((split.user_id, Percent::new(percentage.0)))
                })
                .collect::<Result<Vec<_>, ServerError>>()?;
            Ok(SplitSpec::Percentage { shares })
        }
        SplitType::Amount => {
            let shares = splits
                .into_iter()
                .map(|split| {
                    let amount = split.amount.ok_or_else(|| {
                        ServerError::Generic("amount is required for amount splits".to_string())
                    })?;
                    Ok((split.user_id, Amount::new(amount.0)))
                })
                .collect::<Result<Vec<_>, ServerError>>()?;
            Ok(SplitSpec::FixedAmount { shares })
        }
    }
}

pub(crate) fn split_view(detail: SplitDetail) -> Result<SplitView, ServerError> {
    Ok(SplitView {
        split_id: parse_id(&detail.split.id)?,
        user_id: parse_id(&detail.split.user_id)?,
        user_name: detail.user_name,
        amount: Money(detail.split.amount.cents()),
        percentage: Percentage(detail.split.percent.tenths()),
        is_accepted: detail.split.status.accepted,
        is_paid: detail.split.status.paid,
    })
}

pub(crate) fn expense_view(detail: ExpenseDetail) -> Result<ExpenseView, ServerError> {
    let splits = detail
        .splits
        .into_iter()
        .map(split_view)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ExpenseView {
        expense_id: parse_id(&detail.expense.id)?,
        group_id: parse_id(&detail.expense.group_id)?,
        created_by: parse_id(&detail.expense.created_by)?,
        group_title: detail.group_title,
        title: detail.expense.title,
        total_amount: Money(detail.expense.total.cents()),
        description: detail.expense.description,
        split_type: map_kind(detail.expense.kind),
        created_at: detail.expense.created_at,
        is_settled: detail.expense.is_settled,
        splits,
    })
}

/// Handle requests for recording a new expense in a group.
pub async fn create(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(group_id): Path<Uuid>,
    Json(payload): Json<ExpenseNew>,
) -> Result<(StatusCode, Json<ExpenseView>), ServerError> {
    let spec = split_spec(payload.split_type, payload.splits)?;
    let detail = state
        .engine
        .create_expense(
            group_id,
            &payload.title,
            payload.description.as_deref(),
            Amount::new(payload.total_amount.0),
            spec,
            &user.id,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(expense_view(detail)?)))
}

/// Handle requests for a group's expenses, members only.
pub async fn list_for_group(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(group_id): Path<Uuid>,
) -> Result<Json<Vec<ExpenseView>>, ServerError> {
    let expenses = state
        .engine
        .expenses_for_group(group_id, &user.id)
        .await?
        .into_iter()
        .map(expense_view)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(expenses))
}

/// Handle requests for every expense the user holds a split in.
pub async fn list_for_user(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
) -> Result<Json<Vec<ExpenseView>>, ServerError> {
    let expenses = state
        .engine
        .expenses_for_user(&user.id)
        .await?
        .into_iter()
        .map(expense_view)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(expenses))
}

/// Handle requests for a single expense with its splits.
pub async fn detail(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(expense_id): Path<Uuid>,
) -> Result<Json<ExpenseView>, ServerError> {
    let detail = state.engine.expense_with_splits(expense_id, &user.id).await?;

    Ok(Json(expense_view(detail)?))
}

/// Handle requests for deleting an expense, creator only.
pub async fn remove(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(expense_id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_expense(expense_id, &user.id).await?;

    Ok(StatusCode::OK)
}
