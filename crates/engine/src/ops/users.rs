use sea_orm::{QueryFilter, Statement, TransactionTrait, prelude::*, sea_query::Expr};

use crate::{EngineError, ResultEngine, groups, users, users::User};

use super::{Engine, normalize_email, normalize_optional_text, normalize_required_text, with_tx};

impl Engine {
    /// Registers a new account. The email is unique (case-insensitive).
    ///
    /// `password_hash` must already be an argon2 hash; the engine never sees
    /// clear passwords.
    pub async fn register_user(
        &self,
        first_name: &str,
        last_name: &str,
        email: &str,
        phone: Option<&str>,
        password_hash: &str,
    ) -> ResultEngine<User> {
        let first_name = normalize_required_text(first_name, "first name")?;
        let last_name = normalize_required_text(last_name, "last name")?;
        let email = normalize_email(email)?;
        let phone = normalize_optional_text(phone);
        if password_hash.trim().is_empty() {
            return Err(EngineError::Validation(
                "password hash must not be empty".to_string(),
            ));
        }

        let user = User::new(
            first_name,
            last_name,
            email.clone(),
            phone,
            password_hash.to_string(),
        );
        let entry: users::ActiveModel = (&user).into();

        with_tx!(self, |db_tx| {
            let exists = users::Entity::find()
                .filter(Expr::cust("LOWER(email)").eq(email.clone()))
                .one(&db_tx)
                .await?
                .is_some();
            if exists {
                return Err(EngineError::ExistingKey(email));
            }

            entry.insert(&db_tx).await?;
            Ok(user)
        })
    }

    /// Looks up an account by email, for login.
    pub async fn user_by_email(&self, email: &str) -> ResultEngine<Option<User>> {
        let email = normalize_email(email)?;
        with_tx!(self, |db_tx| {
            let found = self.find_user_by_email(&db_tx, &email).await?;
            Ok(found.map(User::from))
        })
    }

    /// Deletes an account together with everything it owns: the groups it
    /// created, the expenses it created, and its own split rows and
    /// memberships elsewhere.
    pub async fn delete_user(&self, user_id: &str) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            self.require_user_exists(&db_tx, user_id).await?;

            let owned_groups = groups::Entity::find()
                .filter(groups::Column::CreatedBy.eq(user_id.to_string()))
                .all(&db_tx)
                .await?;
            for group in owned_groups {
                Self::delete_group_rows(&db_tx, &group.id).await?;
            }

            // Expenses they created in surviving groups, splits first.
            let backend = self.database.get_database_backend();
            db_tx
                .execute(Statement::from_sql_and_values(
                    backend,
                    "DELETE FROM splits WHERE expense_id IN (SELECT id FROM expenses WHERE created_by = ?);",
                    vec![user_id.into()],
                ))
                .await?;
            db_tx
                .execute(Statement::from_sql_and_values(
                    backend,
                    "DELETE FROM expenses WHERE created_by = ?;",
                    vec![user_id.into()],
                ))
                .await?;

            // Their own shares and memberships in other people's groups.
            db_tx
                .execute(Statement::from_sql_and_values(
                    backend,
                    "DELETE FROM splits WHERE user_id = ?;",
                    vec![user_id.into()],
                ))
                .await?;
            db_tx
                .execute(Statement::from_sql_and_values(
                    backend,
                    "DELETE FROM group_members WHERE user_id = ?;",
                    vec![user_id.into()],
                ))
                .await?;

            db_tx
                .execute(Statement::from_sql_and_values(
                    backend,
                    "DELETE FROM users WHERE id = ?;",
                    vec![user_id.into()],
                ))
                .await?;

            Ok(())
        })
    }
}
