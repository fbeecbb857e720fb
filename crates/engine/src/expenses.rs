//! Expense primitives.
//!
//! An `Expense` records a shared cost inside a group. Its total is divided
//! among participants as `Split` rows, created atomically with the expense.
//! Once created an expense is immutable except for the derived `is_settled`
//! flag.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use uuid::Uuid;

use crate::{Amount, EngineError, ResultEngine, SplitKind};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Expense {
    pub id: String,
    pub group_id: String,
    pub title: String,
    pub total: Amount,
    pub description: Option<String>,
    pub kind: SplitKind,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub is_settled: bool,
}

impl Expense {
    pub fn new(
        group_id: String,
        title: String,
        description: Option<String>,
        total: Amount,
        kind: SplitKind,
        created_by: &str,
    ) -> ResultEngine<Self> {
        if !total.is_positive() {
            return Err(EngineError::Validation(
                "total amount must be positive".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            group_id,
            title,
            total,
            description,
            kind,
            created_by: created_by.to_string(),
            created_at: Utc::now(),
            is_settled: false,
        })
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "expenses")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub group_id: String,
    pub title: String,
    pub total_amount: i64,
    pub description: Option<String>,
    pub split_type: String,
    pub created_by: String,
    pub created_at: DateTimeUtc,
    pub is_settled: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::splits::Entity")]
    Splits,
    #[sea_orm(
        belongs_to = "super::groups::Entity",
        from = "Column::GroupId",
        to = "super::groups::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Groups,
}

impl Related<super::splits::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Splits.def()
    }
}

impl Related<super::groups::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Groups.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Expense> for ActiveModel {
    fn from(expense: &Expense) -> Self {
        Self {
            id: ActiveValue::Set(expense.id.clone()),
            group_id: ActiveValue::Set(expense.group_id.clone()),
            title: ActiveValue::Set(expense.title.clone()),
            total_amount: ActiveValue::Set(expense.total.cents()),
            description: ActiveValue::Set(expense.description.clone()),
            split_type: ActiveValue::Set(expense.kind.as_str().to_string()),
            created_by: ActiveValue::Set(expense.created_by.clone()),
            created_at: ActiveValue::Set(expense.created_at),
            is_settled: ActiveValue::Set(expense.is_settled),
        }
    }
}

impl TryFrom<Model> for Expense {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            group_id: model.group_id,
            title: model.title,
            total: Amount::new(model.total_amount),
            description: model.description,
            kind: SplitKind::try_from(model.split_type.as_str())?,
            created_by: model.created_by,
            created_at: model.created_at,
            is_settled: model.is_settled,
        })
    }
}
