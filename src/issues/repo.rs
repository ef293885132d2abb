use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// Triage state of a report. Only admins move an issue out of `Pending`,
/// either directly or via feedback dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "issue_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum IssueStatus {
    Pending,
    Solved,
    Unsolved,
}

/// A user-submitted report. `user_id` is set at creation and never
/// reassigned.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub code: String,
    pub address: String,
    pub image: String,
    pub status: IssueStatus,
    pub feedback_message: Option<String>,
    pub feedback_photo: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

const ISSUE_COLUMNS: &str = r#"
    id, user_id, title, description, code, address, image, status,
    feedback_message, feedback_photo, created_at, updated_at
"#;

impl Issue {
    pub async fn create(
        db: &PgPool,
        user_id: Uuid,
        title: &str,
        description: &str,
        code: &str,
        address: &str,
        image: &str,
    ) -> anyhow::Result<Issue> {
        let issue = sqlx::query_as::<_, Issue>(&format!(
            r#"
            INSERT INTO issues (user_id, title, description, code, address, image)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {ISSUE_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(title)
        .bind(description)
        .bind(code)
        .bind(address)
        .bind(image)
        .fetch_one(db)
        .await?;
        Ok(issue)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Issue>> {
        let issue = sqlx::query_as::<_, Issue>(&format!(
            "SELECT {ISSUE_COLUMNS} FROM issues WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(issue)
    }

    pub async fn list_by_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<Issue>> {
        let issues = sqlx::query_as::<_, Issue>(&format!(
            "SELECT {ISSUE_COLUMNS} FROM issues WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(db)
        .await?;
        Ok(issues)
    }

    pub async fn list_all(db: &PgPool) -> anyhow::Result<Vec<Issue>> {
        let issues = sqlx::query_as::<_, Issue>(&format!(
            "SELECT {ISSUE_COLUMNS} FROM issues ORDER BY created_at DESC"
        ))
        .fetch_all(db)
        .await?;
        Ok(issues)
    }

    pub async fn set_status(
        db: &PgPool,
        id: Uuid,
        status: IssueStatus,
    ) -> anyhow::Result<Option<Issue>> {
        let issue = sqlx::query_as::<_, Issue>(&format!(
            r#"
            UPDATE issues
            SET status = $2, updated_at = now()
            WHERE id = $1
            RETURNING {ISSUE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(status)
        .fetch_optional(db)
        .await?;
        Ok(issue)
    }

    /// Status change plus feedback note in a single write, used by the
    /// feedback dispatch flow after the push send has succeeded.
    pub async fn set_status_with_feedback(
        db: &PgPool,
        id: Uuid,
        status: IssueStatus,
        feedback_message: &str,
    ) -> anyhow::Result<Option<Issue>> {
        let issue = sqlx::query_as::<_, Issue>(&format!(
            r#"
            UPDATE issues
            SET status = $2, feedback_message = $3, updated_at = now()
            WHERE id = $1
            RETURNING {ISSUE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(status)
        .bind(feedback_message)
        .fetch_optional(db)
        .await?;
        Ok(issue)
    }

    /// Returns the removed row so the caller can clean up its stored image.
    pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Issue>> {
        let issue = sqlx::query_as::<_, Issue>(&format!(
            "DELETE FROM issues WHERE id = $1 RETURNING {ISSUE_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(issue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&IssueStatus::Pending).unwrap(),
            "\"pending\""
        );
        assert_eq!(
            serde_json::to_string(&IssueStatus::Solved).unwrap(),
            "\"solved\""
        );
        assert_eq!(
            serde_json::to_string(&IssueStatus::Unsolved).unwrap(),
            "\"unsolved\""
        );
    }

    #[test]
    fn issue_serializes_camel_case() {
        let issue = Issue {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: "Broken streetlight".into(),
            description: "Dark at night".into(),
            code: "SITE-42".into(),
            address: "Main St 1".into(),
            image: "uploads/abc.jpg".into(),
            status: IssueStatus::Pending,
            feedback_message: None,
            feedback_photo: None,
            created_at: OffsetDateTime::now_utc(),
            updated_at: OffsetDateTime::now_utc(),
        };
        let json = serde_json::to_value(&issue).unwrap();
        assert_eq!(json["status"], "pending");
        assert!(json.get("userId").is_some());
        assert!(json.get("feedbackMessage").is_some());
    }
}
