use std::collections::HashSet;

use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, Statement, TransactionTrait,
    prelude::*,
};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, group_members, groups, groups::Group, users};

use super::{Engine, normalize_email, normalize_required_text, with_tx};

/// A group member as shown in the group detail view.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemberProfile {
    pub user_id: String,
    pub name: String,
    pub email: String,
}

impl Engine {
    /// Creates a group owned by `user_id`.
    ///
    /// The creator always becomes a member; `member_emails` are resolved to
    /// existing accounts and added alongside. An unknown email fails the
    /// whole creation.
    pub async fn create_group(
        &self,
        title: &str,
        member_emails: &[String],
        user_id: &str,
    ) -> ResultEngine<Group> {
        let title = normalize_required_text(title, "group title")?;

        with_tx!(self, |db_tx| {
            self.require_user_exists(&db_tx, user_id).await?;

            let mut member_ids = vec![user_id.to_string()];
            for email in member_emails {
                let email = normalize_email(email)?;
                let member = self
                    .find_user_by_email(&db_tx, &email)
                    .await?
                    .ok_or(EngineError::KeyNotFound(email))?;
                member_ids.push(member.id);
            }

            let group = Group::new(title, user_id);
            let entry: groups::ActiveModel = (&group).into();
            entry.insert(&db_tx).await?;

            let mut seen = HashSet::new();
            for member_id in member_ids {
                if !seen.insert(member_id.clone()) {
                    continue;
                }
                let membership = group_members::ActiveModel {
                    group_id: ActiveValue::Set(group.id.clone()),
                    user_id: ActiveValue::Set(member_id),
                };
                membership.insert(&db_tx).await?;
            }

            Ok(group)
        })
    }

    /// Returns the group and its members. Members only.
    pub async fn group_with_members(
        &self,
        group_id: Uuid,
        user_id: &str,
    ) -> ResultEngine<(Group, Vec<MemberProfile>)> {
        let group_id = group_id.to_string();
        with_tx!(self, |db_tx| {
            let group = self.require_group_member(&db_tx, &group_id, user_id).await?;
            let members = self.members_of(&db_tx, &group.id).await?;
            Ok((Group::from(group), members))
        })
    }

    /// Lists the groups the actor belongs to, oldest first.
    pub async fn groups_for_user(&self, user_id: &str) -> ResultEngine<Vec<Group>> {
        with_tx!(self, |db_tx| {
            let memberships = group_members::Entity::find()
                .filter(group_members::Column::UserId.eq(user_id.to_string()))
                .all(&db_tx)
                .await?;
            let group_ids: Vec<String> = memberships.into_iter().map(|m| m.group_id).collect();

            let rows = groups::Entity::find()
                .filter(groups::Column::Id.is_in(group_ids))
                .order_by_asc(groups::Column::CreatedAt)
                .all(&db_tx)
                .await?;
            Ok(rows.into_iter().map(Group::from).collect())
        })
    }

    /// Adds members by email. Creator only; already-present members are
    /// silently skipped.
    pub async fn add_group_members(
        &self,
        group_id: Uuid,
        member_emails: &[String],
        user_id: &str,
    ) -> ResultEngine<()> {
        let group_id = group_id.to_string();
        with_tx!(self, |db_tx| {
            let group = self
                .require_group_creator(&db_tx, &group_id, user_id)
                .await?;

            for email in member_emails {
                let email = normalize_email(email)?;
                let member = self
                    .find_user_by_email(&db_tx, &email)
                    .await?
                    .ok_or(EngineError::KeyNotFound(email))?;

                let already =
                    group_members::Entity::find_by_id((group.id.clone(), member.id.clone()))
                        .one(&db_tx)
                        .await?
                        .is_some();
                if already {
                    continue;
                }
                let membership = group_members::ActiveModel {
                    group_id: ActiveValue::Set(group.id.clone()),
                    user_id: ActiveValue::Set(member.id),
                };
                membership.insert(&db_tx).await?;
            }

            Ok(())
        })
    }

    /// Deletes a group with its expenses and splits. Creator only.
    pub async fn delete_group(&self, group_id: Uuid, user_id: &str) -> ResultEngine<()> {
        let group_id = group_id.to_string();
        with_tx!(self, |db_tx| {
            let group = self
                .require_group_creator(&db_tx, &group_id, user_id)
                .await?;
            Self::delete_group_rows(&db_tx, &group.id).await?;
            Ok(())
        })
    }

    /// Deletes every row belonging to a group, children first, within the
    /// caller's transaction.
    pub(super) async fn delete_group_rows(
        db_tx: &DatabaseTransaction,
        group_id: &str,
    ) -> ResultEngine<()> {
        let backend = db_tx.get_database_backend();

        db_tx
            .execute(Statement::from_sql_and_values(
                backend,
                "DELETE FROM splits WHERE expense_id IN (SELECT id FROM expenses WHERE group_id = ?);",
                vec![group_id.into()],
            ))
            .await?;
        db_tx
            .execute(Statement::from_sql_and_values(
                backend,
                "DELETE FROM expenses WHERE group_id = ?;",
                vec![group_id.into()],
            ))
            .await?;
        db_tx
            .execute(Statement::from_sql_and_values(
                backend,
                "DELETE FROM group_members WHERE group_id = ?;",
                vec![group_id.into()],
            ))
            .await?;
        db_tx
            .execute(Statement::from_sql_and_values(
                backend,
                "DELETE FROM groups WHERE id = ?;",
                vec![group_id.into()],
            ))
            .await?;

        Ok(())
    }

    /// Loads the member profiles of a group, ordered by name.
    pub(super) async fn members_of(
        &self,
        db_tx: &DatabaseTransaction,
        group_id: &str,
    ) -> ResultEngine<Vec<MemberProfile>> {
        let memberships = group_members::Entity::find()
            .filter(group_members::Column::GroupId.eq(group_id.to_string()))
            .all(db_tx)
            .await?;
        let user_ids: Vec<String> = memberships.into_iter().map(|m| m.user_id).collect();

        let rows = users::Entity::find()
            .filter(users::Column::Id.is_in(user_ids))
            .order_by_asc(users::Column::FirstName)
            .order_by_asc(users::Column::LastName)
            .all(db_tx)
            .await?;

        Ok(rows
            .into_iter()
            .map(|user| MemberProfile {
                user_id: user.id.clone(),
                name: format!("{} {}", user.first_name, user.last_name),
                email: user.email,
            })
            .collect())
    }
}
