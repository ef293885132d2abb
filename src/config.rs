use serde::Deserialize;

/// Operating mode, controls the admin cookie `Secure` flag and error verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    pub fn is_production(self) -> bool {
        self == AppEnv::Production
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    /// Secret for mobile-client user tokens (bearer header).
    pub user_secret: String,
    /// Secret for admin-panel tokens (http-only cookie). Independent of
    /// `user_secret` so the two token kinds never validate cross-wise.
    pub admin_secret: String,
    pub user_ttl_days: i64,
    pub admin_ttl_hours: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub username: String,
    pub password: String,
    pub from: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub env: AppEnv,
    pub jwt: JwtConfig,
    pub smtp: SmtpConfig,
    pub expo_push_url: String,
    pub storage_endpoint: String,
    pub storage_bucket: String,
    pub storage_access_key: String,
    pub storage_secret_key: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let env = match std::env::var("APP_ENV").as_deref() {
            Ok("production") => AppEnv::Production,
            _ => AppEnv::Development,
        };
        let jwt = JwtConfig {
            user_secret: std::env::var("JWT_SECRET")?,
            admin_secret: std::env::var("JWT_ADMIN_SECRET")?,
            user_ttl_days: std::env::var("JWT_USER_TTL_DAYS")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(30),
            admin_ttl_hours: std::env::var("JWT_ADMIN_TTL_HOURS")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(24),
        };
        let smtp = SmtpConfig {
            host: std::env::var("SMTP_HOST").unwrap_or_else(|_| "smtp.gmail.com".into()),
            username: std::env::var("SMTP_EMAIL_USER")?,
            password: std::env::var("SMTP_EMAIL_PASSWORD")?,
            from: std::env::var("SMTP_EMAIL_FROM")
                .unwrap_or_else(|_| "no-reply@cityreport.local".into()),
        };
        Ok(Self {
            database_url,
            env,
            jwt,
            smtp,
            expo_push_url: std::env::var("EXPO_PUSH_URL")
                .unwrap_or_else(|_| "https://exp.host/--/api/v2/push/send".into()),
            storage_endpoint: std::env::var("STORAGE_ENDPOINT")?,
            storage_bucket: std::env::var("STORAGE_BUCKET")?,
            storage_access_key: std::env::var("STORAGE_ACCESS_KEY")?,
            storage_secret_key: std::env::var("STORAGE_SECRET_KEY")?,
        })
    }
}
