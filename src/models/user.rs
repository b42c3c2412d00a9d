use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgExecutor, PgPool};

/// Username of the bootstrap account; it can be neither renamed, demoted nor deleted.
pub const ADMIN_USERNAME: &str = "admin";

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub hashed_password: String,
    pub is_active: bool,
    pub is_admin: bool,
    pub created_at: NaiveDateTime,
}

/// Short form embedded in booking listings and the login response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserSummary {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub is_admin: bool,
    pub is_active: bool,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        UserSummary {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            is_admin: user.is_admin,
            is_active: user.is_active,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub username: Option<String>,
    pub email: Option<String>,
    pub hashed_password: Option<String>,
    pub is_admin: Option<bool>,
}

const USER_COLUMNS: &str =
    "id, username, email, hashed_password, is_active, is_admin, created_at";

impl User {
    pub fn is_main_admin(&self) -> bool {
        self.username == ADMIN_USERNAME
    }

    pub async fn find_by_username<'e, E: PgExecutor<'e>>(
        executor: E,
        username: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1"))
            .bind(username)
            .fetch_optional(executor)
            .await
    }

    pub async fn find_by_id<'e, E: PgExecutor<'e>>(
        executor: E,
        id: i32,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY id"))
            .fetch_all(pool)
            .await
    }

    /// True when `username` belongs to some user other than `except`.
    pub async fn username_taken<'e, E: PgExecutor<'e>>(
        executor: E,
        username: &str,
        except: Option<i32>,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE username = $1 AND ($2::INT IS NULL OR id <> $2))",
        )
        .bind(username)
        .bind(except)
        .fetch_one(executor)
        .await
    }

    pub async fn email_taken<'e, E: PgExecutor<'e>>(
        executor: E,
        email: &str,
        except: Option<i32>,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = $1 AND ($2::INT IS NULL OR id <> $2))",
        )
        .bind(email)
        .bind(except)
        .fetch_one(executor)
        .await
    }

    pub async fn create<'e, E: PgExecutor<'e>>(
        executor: E,
        username: &str,
        email: &str,
        hashed_password: &str,
        is_admin: bool,
    ) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (username, email, hashed_password, is_active, is_admin, created_at)
             VALUES ($1, $2, $3, TRUE, $4, NOW() AT TIME ZONE 'utc')
             RETURNING {USER_COLUMNS}"
        ))
        .bind(username)
        .bind(email)
        .bind(hashed_password)
        .bind(is_admin)
        .fetch_one(executor)
        .await
    }

    pub async fn update<'e, E: PgExecutor<'e>>(
        executor: E,
        id: i32,
        changes: &UserChanges,
    ) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET
                username = COALESCE($2, username),
                email = COALESCE($3, email),
                hashed_password = COALESCE($4, hashed_password),
                is_admin = COALESCE($5, is_admin)
             WHERE id = $1
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(changes.username.as_deref())
        .bind(changes.email.as_deref())
        .bind(changes.hashed_password.as_deref())
        .bind(changes.is_admin)
        .fetch_one(executor)
        .await
    }

    pub async fn delete<'e, E: PgExecutor<'e>>(executor: E, id: i32) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
