//! Split rows.
//!
//! One row per (expense, participant) pair: the computed share plus the
//! participant's settlement flags. Rows are written together with their
//! expense and only the flags ever change afterwards.

use sea_orm::{ActiveValue, entity::prelude::*};
use uuid::Uuid;

use crate::{Amount, Percent, SplitStatus, split::Share};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Split {
    pub id: String,
    pub expense_id: String,
    pub user_id: String,
    /// Creation order within the expense, so listings keep the order the
    /// shares were submitted in.
    pub position: i32,
    pub amount: Amount,
    pub percent: Percent,
    pub status: SplitStatus,
}

impl Split {
    /// Materializes a computed [`Share`] as a fresh, unsettled split.
    pub fn from_share(expense_id: &str, position: i32, share: &Share) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            expense_id: expense_id.to_string(),
            user_id: share.member_id.to_string(),
            position,
            amount: share.amount,
            percent: share.percent,
            status: SplitStatus::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "splits")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub expense_id: String,
    pub user_id: String,
    pub position: i32,
    pub amount: i64,
    pub percent: i64,
    pub is_accepted: bool,
    pub is_paid: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::expenses::Entity",
        from = "Column::ExpenseId",
        to = "super::expenses::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Expenses,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Users,
}

impl Related<super::expenses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Expenses.def()
    }
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Split> for ActiveModel {
    fn from(split: &Split) -> Self {
        Self {
            id: ActiveValue::Set(split.id.clone()),
            expense_id: ActiveValue::Set(split.expense_id.clone()),
            user_id: ActiveValue::Set(split.user_id.clone()),
            position: ActiveValue::Set(split.position),
            amount: ActiveValue::Set(split.amount.cents()),
            percent: ActiveValue::Set(split.percent.tenths()),
            is_accepted: ActiveValue::Set(split.status.accepted),
            is_paid: ActiveValue::Set(split.status.paid),
        }
    }
}

impl From<Model> for Split {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            expense_id: model.expense_id,
            user_id: model.user_id,
            position: model.position,
            amount: Amount::new(model.amount),
            percent: Percent::new(model.percent),
            status: SplitStatus {
                accepted: model.is_accepted,
                paid: model.is_paid,
            },
        }
    }
}
