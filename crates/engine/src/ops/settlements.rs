use sea_orm::{ActiveValue, QueryFilter, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    EngineError, ResultEngine, expenses,
    settlement::SplitStatusUpdate,
    splits::{self, Split},
    users,
};

use super::{Engine, expenses::SplitDetail, with_tx};

impl Engine {
    /// Raises a split's settlement flags.
    ///
    /// Only the split's own participant may do this. Flags never go back
    /// down, so a `false` in the update leaves the flag as it is. When the
    /// last split of an expense turns paid, the expense flips to settled in
    /// the same transaction.
    pub async fn update_split(
        &self,
        expense_id: Uuid,
        split_id: Uuid,
        update: SplitStatusUpdate,
        user_id: &str,
    ) -> ResultEngine<SplitDetail> {
        let expense_id = expense_id.to_string();
        let split_id = split_id.to_string();
        with_tx!(self, |db_tx| {
            let expense = self.require_expense(&db_tx, &expense_id).await?;
            let row = splits::Entity::find_by_id(split_id.clone())
                .filter(splits::Column::ExpenseId.eq(expense.id.clone()))
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("split".to_string()))?;
            if row.user_id != user_id {
                return Err(EngineError::Forbidden(
                    "only the split's participant can update it".to_string(),
                ));
            }

            let mut split = Split::from(row);
            let next = split.status.apply(update)?;
            if next != split.status {
                let active = splits::ActiveModel {
                    id: ActiveValue::Set(split.id.clone()),
                    is_accepted: ActiveValue::Set(next.accepted),
                    is_paid: ActiveValue::Set(next.paid),
                    ..Default::default()
                };
                active.update(&db_tx).await?;
                split.status = next;
            }

            let rows = splits::Entity::find()
                .filter(splits::Column::ExpenseId.eq(expense.id.clone()))
                .all(&db_tx)
                .await?;
            let settled = !rows.is_empty() && rows.iter().all(|r| r.is_paid);
            if settled != expense.is_settled {
                let active = expenses::ActiveModel {
                    id: ActiveValue::Set(expense.id.clone()),
                    is_settled: ActiveValue::Set(settled),
                    ..Default::default()
                };
                active.update(&db_tx).await?;
            }

            let user_name = users::Entity::find_by_id(split.user_id.clone())
                .one(&db_tx)
                .await?
                .map(|u| format!("{} {}", u.first_name, u.last_name))
                .unwrap_or_default();

            Ok(SplitDetail { split, user_name })
        })
    }
}
