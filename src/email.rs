use async_trait::async_trait;
use lettre::{
    message::header::ContentType,
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use crate::config::SmtpConfig;

/// Outbound email boundary. Delivery guarantees are the relay's problem;
/// callers decide whether a send failure is fatal.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html: &str) -> anyhow::Result<()>;
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl SmtpMailer {
    pub fn new(cfg: &SmtpConfig) -> anyhow::Result<Self> {
        // App passwords copied from provider consoles tend to carry spaces.
        let password: String = cfg.password.split_whitespace().collect();
        let creds = Credentials::new(cfg.username.trim().to_string(), password);
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&cfg.host)?
            .credentials(creds)
            .build();
        Ok(Self {
            transport,
            from: cfg.from.clone(),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, html: &str) -> anyhow::Result<()> {
        let email = Message::builder()
            .from(self.from.parse()?)
            .to(to.parse()?)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html.to_string())?;
        self.transport.send(email).await?;
        Ok(())
    }
}

pub fn verification_email_body(code: &str) -> String {
    format!(
        "<h3>Verify your email address to continue.</h3>\
         <h4>Your confirmation code:</h4>\
         <h2>{code}</h2>\
         <p><i>This code expires in 10 minutes.</i></p>"
    )
}

pub fn password_reset_email_body(code: &str) -> String {
    format!(
        "<h3>Reset your password</h3>\
         <h4>Your reset confirmation code:</h4>\
         <h2>{code}</h2>\
         <p><i>This code expires in 10 minutes.</i></p>"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn templates_carry_the_code() {
        let body = verification_email_body("123456");
        assert!(body.contains("<h2>123456</h2>"));
        assert!(body.contains("10 minutes"));

        let body = password_reset_email_body("654321");
        assert!(body.contains("<h2>654321</h2>"));
    }
}
