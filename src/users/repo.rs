use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// User record. The password hash and outstanding codes never leave the
/// server in JSON.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub surname: String,
    pub phone: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_admin: bool,
    pub is_email_verified: bool,
    pub is_banned: bool,
    pub push_token: Option<String>,
    #[serde(skip_serializing)]
    pub email_verification_code: Option<String>,
    #[serde(skip_serializing)]
    pub email_verification_code_expires: Option<OffsetDateTime>,
    #[serde(skip_serializing)]
    pub reset_password_code: Option<String>,
    #[serde(skip_serializing)]
    pub reset_password_code_expires: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

const USER_COLUMNS: &str = r#"
    id, name, surname, phone, email, password_hash,
    is_admin, is_email_verified, is_banned, push_token,
    email_verification_code, email_verification_code_expires,
    reset_password_code, reset_password_code_expires,
    created_at, updated_at
"#;

impl User {
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn list_all(db: &PgPool) -> anyhow::Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC"
        ))
        .fetch_all(db)
        .await?;
        Ok(users)
    }

    /// Insert an unverified user carrying a fresh email verification code.
    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        db: &PgPool,
        name: &str,
        surname: &str,
        phone: &str,
        email: &str,
        password_hash: &str,
        verification_code: &str,
        code_expires: OffsetDateTime,
    ) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (name, surname, phone, email, password_hash,
                               email_verification_code, email_verification_code_expires)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(name)
        .bind(surname)
        .bind(phone)
        .bind(email)
        .bind(password_hash)
        .bind(verification_code)
        .bind(code_expires)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    /// Flip the verified flag and clear the code pair in one statement.
    /// Returns `None` when the code does not match or has expired.
    pub async fn verify_email(
        db: &PgPool,
        email: &str,
        code: &str,
    ) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET is_email_verified = TRUE,
                email_verification_code = NULL,
                email_verification_code_expires = NULL,
                updated_at = now()
            WHERE email = $1
              AND email_verification_code = $2
              AND email_verification_code_expires > now()
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(email)
        .bind(code)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn set_reset_code(
        db: &PgPool,
        id: Uuid,
        code: &str,
        expires: OffsetDateTime,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET reset_password_code = $2,
                reset_password_code_expires = $3,
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(code)
        .bind(expires)
        .execute(db)
        .await?;
        Ok(())
    }

    /// Load the user only when the reset code matches and is unexpired.
    pub async fn find_by_reset_code(
        db: &PgPool,
        email: &str,
        code: &str,
    ) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {USER_COLUMNS} FROM users
            WHERE email = $1
              AND reset_password_code = $2
              AND reset_password_code_expires > now()
            "#
        ))
        .bind(email)
        .bind(code)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Replace the password and clear the reset pair in one statement; the
    /// WHERE clause repeats the code check so a concurrently consumed code
    /// cannot authorize a second write.
    pub async fn reset_password(
        db: &PgPool,
        email: &str,
        code: &str,
        new_password_hash: &str,
    ) -> anyhow::Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $3,
                reset_password_code = NULL,
                reset_password_code_expires = NULL,
                updated_at = now()
            WHERE email = $1
              AND reset_password_code = $2
              AND reset_password_code_expires > now()
            "#,
        )
        .bind(email)
        .bind(code)
        .bind(new_password_hash)
        .execute(db)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn update_profile(
        db: &PgPool,
        id: Uuid,
        name: Option<&str>,
        surname: Option<&str>,
        password_hash: Option<&str>,
    ) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET name = COALESCE($2, name),
                surname = COALESCE($3, surname),
                password_hash = COALESCE($4, password_hash),
                updated_at = now()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(name)
        .bind(surname)
        .bind(password_hash)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn set_push_token(db: &PgPool, id: Uuid, push_token: &str) -> anyhow::Result<bool> {
        let result = sqlx::query(
            "UPDATE users SET push_token = $2, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(push_token)
        .execute(db)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn set_banned(db: &PgPool, id: Uuid, banned: bool) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET is_banned = $2, updated_at = now()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(banned)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            name: "Ada".into(),
            surname: "Lovelace".into(),
            phone: "+905551112233".into(),
            email: "ada@example.com".into(),
            password_hash: "$argon2id$fake".into(),
            is_admin: false,
            is_email_verified: true,
            is_banned: false,
            push_token: None,
            email_verification_code: Some("123456".into()),
            email_verification_code_expires: Some(OffsetDateTime::now_utc()),
            reset_password_code: None,
            reset_password_code_expires: None,
            created_at: OffsetDateTime::now_utc(),
            updated_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn secrets_never_serialize() {
        let json = serde_json::to_string(&sample_user()).unwrap();
        assert!(!json.contains("password_hash"));
        assert!(!json.contains("passwordHash"));
        assert!(!json.contains("123456"));
        assert!(json.contains("ada@example.com"));
        assert!(json.contains("isAdmin"));
    }
}
