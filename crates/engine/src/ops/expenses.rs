use std::collections::{HashMap, HashSet};

use sea_orm::{
    DatabaseTransaction, QueryFilter, QueryOrder, Statement, TransactionTrait, prelude::*,
};
use uuid::Uuid;

use crate::{
    Amount, EngineError, ResultEngine,
    expenses::{self, Expense},
    groups,
    split::SplitSpec,
    splits::{self, Split},
    users,
};

use super::{Engine, normalize_optional_text, normalize_required_text, with_tx};

/// One split row enriched with the participant's display name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SplitDetail {
    pub split: Split,
    pub user_name: String,
}

/// An expense with its group title and its splits in submission order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExpenseDetail {
    pub expense: Expense,
    pub group_title: String,
    pub splits: Vec<SplitDetail>,
}

impl Engine {
    /// Records an expense in a group and its splits, atomically.
    ///
    /// The actor must be a group member and every participant named by the
    /// split spec must be one too. The shares are computed and reconciled
    /// before anything is written.
    pub async fn create_expense(
        &self,
        group_id: Uuid,
        title: &str,
        description: Option<&str>,
        total: Amount,
        spec: SplitSpec,
        user_id: &str,
    ) -> ResultEngine<ExpenseDetail> {
        let title = normalize_required_text(title, "expense title")?;
        let description = normalize_optional_text(description);
        let shares = spec.compute(total)?;

        let group_id = group_id.to_string();
        with_tx!(self, |db_tx| {
            let group = self.require_group_member(&db_tx, &group_id, user_id).await?;

            let participant_ids: Vec<String> =
                shares.iter().map(|s| s.member_id.to_string()).collect();
            let user_rows = users::Entity::find()
                .filter(users::Column::Id.is_in(participant_ids.clone()))
                .all(&db_tx)
                .await?;
            let names: HashMap<String, String> = user_rows
                .into_iter()
                .map(|u| (u.id.clone(), format!("{} {}", u.first_name, u.last_name)))
                .collect();

            for participant_id in &participant_ids {
                let known = names.contains_key(participant_id)
                    && self.is_group_member(&db_tx, &group.id, participant_id).await?;
                if !known {
                    return Err(EngineError::Validation(format!(
                        "participant {participant_id} is not a member of this group"
                    )));
                }
            }

            let expense = Expense::new(
                group.id.clone(),
                title,
                description,
                total,
                spec.kind(),
                user_id,
            )?;
            let entry: expenses::ActiveModel = (&expense).into();
            entry.insert(&db_tx).await?;

            let mut details = Vec::with_capacity(shares.len());
            for (position, share) in shares.iter().enumerate() {
                let split = Split::from_share(&expense.id, position as i32, share);
                let entry: splits::ActiveModel = (&split).into();
                entry.insert(&db_tx).await?;

                let user_name = names.get(&split.user_id).cloned().unwrap_or_default();
                details.push(SplitDetail { split, user_name });
            }

            Ok(ExpenseDetail {
                expense,
                group_title: group.title,
                splits: details,
            })
        })
    }

    /// Returns one expense with its splits. Group members only.
    pub async fn expense_with_splits(
        &self,
        expense_id: Uuid,
        user_id: &str,
    ) -> ResultEngine<ExpenseDetail> {
        let expense_id = expense_id.to_string();
        with_tx!(self, |db_tx| {
            let model = self.require_expense(&db_tx, &expense_id).await?;
            self.require_group_member(&db_tx, &model.group_id, user_id)
                .await?;

            let mut details = self.assemble_details(&db_tx, vec![model]).await?;
            details
                .pop()
                .ok_or_else(|| EngineError::KeyNotFound("expense".to_string()))
        })
    }

    /// Lists a group's expenses, oldest first. Group members only.
    pub async fn expenses_for_group(
        &self,
        group_id: Uuid,
        user_id: &str,
    ) -> ResultEngine<Vec<ExpenseDetail>> {
        let group_id = group_id.to_string();
        with_tx!(self, |db_tx| {
            let group = self.require_group_member(&db_tx, &group_id, user_id).await?;

            let models = expenses::Entity::find()
                .filter(expenses::Column::GroupId.eq(group.id))
                .order_by_asc(expenses::Column::CreatedAt)
                .all(&db_tx)
                .await?;
            self.assemble_details(&db_tx, models).await
        })
    }

    /// Lists every expense the actor holds a split in, oldest first.
    pub async fn expenses_for_user(&self, user_id: &str) -> ResultEngine<Vec<ExpenseDetail>> {
        with_tx!(self, |db_tx| {
            let own_splits = splits::Entity::find()
                .filter(splits::Column::UserId.eq(user_id.to_string()))
                .all(&db_tx)
                .await?;
            let expense_ids: HashSet<String> =
                own_splits.into_iter().map(|s| s.expense_id).collect();

            let models = expenses::Entity::find()
                .filter(expenses::Column::Id.is_in(expense_ids))
                .order_by_asc(expenses::Column::CreatedAt)
                .all(&db_tx)
                .await?;
            self.assemble_details(&db_tx, models).await
        })
    }

    /// Deletes an expense and its splits. Expense creator only.
    pub async fn delete_expense(&self, expense_id: Uuid, user_id: &str) -> ResultEngine<()> {
        let expense_id = expense_id.to_string();
        with_tx!(self, |db_tx| {
            let model = self.require_expense(&db_tx, &expense_id).await?;
            if model.created_by != user_id {
                return Err(EngineError::Forbidden(
                    "only the expense creator can delete it".to_string(),
                ));
            }

            let backend = db_tx.get_database_backend();
            db_tx
                .execute(Statement::from_sql_and_values(
                    backend,
                    "DELETE FROM splits WHERE expense_id = ?;",
                    vec![model.id.clone().into()],
                ))
                .await?;
            db_tx
                .execute(Statement::from_sql_and_values(
                    backend,
                    "DELETE FROM expenses WHERE id = ?;",
                    vec![model.id.into()],
                ))
                .await?;

            Ok(())
        })
    }

    /// Builds the detail views for a batch of expense rows: group titles,
    /// splits in submission order, participant names.
    async fn assemble_details(
        &self,
        db_tx: &DatabaseTransaction,
        models: Vec<expenses::Model>,
    ) -> ResultEngine<Vec<ExpenseDetail>> {
        if models.is_empty() {
            return Ok(Vec::new());
        }

        let group_ids: HashSet<String> = models.iter().map(|m| m.group_id.clone()).collect();
        let group_rows = groups::Entity::find()
            .filter(groups::Column::Id.is_in(group_ids))
            .all(db_tx)
            .await?;
        let titles: HashMap<String, String> =
            group_rows.into_iter().map(|g| (g.id, g.title)).collect();

        let expense_ids: Vec<String> = models.iter().map(|m| m.id.clone()).collect();
        let split_rows = splits::Entity::find()
            .filter(splits::Column::ExpenseId.is_in(expense_ids))
            .order_by_asc(splits::Column::Position)
            .all(db_tx)
            .await?;

        let user_ids: HashSet<String> = split_rows.iter().map(|s| s.user_id.clone()).collect();
        let user_rows = users::Entity::find()
            .filter(users::Column::Id.is_in(user_ids))
            .all(db_tx)
            .await?;
        let names: HashMap<String, String> = user_rows
            .into_iter()
            .map(|u| (u.id.clone(), format!("{} {}", u.first_name, u.last_name)))
            .collect();

        let mut splits_by_expense: HashMap<String, Vec<SplitDetail>> = HashMap::new();
        for row in split_rows {
            let user_name = names.get(&row.user_id).cloned().unwrap_or_default();
            splits_by_expense
                .entry(row.expense_id.clone())
                .or_default()
                .push(SplitDetail {
                    split: Split::from(row),
                    user_name,
                });
        }

        models
            .into_iter()
            .map(|model| {
                let group_title = titles.get(&model.group_id).cloned().unwrap_or_default();
                let splits = splits_by_expense.remove(&model.id).unwrap_or_default();
                Ok(ExpenseDetail {
                    expense: Expense::try_from(model)?,
                    group_title,
                    splits,
                })
            })
            .collect()
    }
}
