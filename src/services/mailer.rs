use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

/// Outbound email collaborator. Account flows depend on this seam, so tests
/// and local setups can swap the HTTP provider for a capturing or no-op
/// implementation.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_verification(&self, to: &str, username: &str, code: &str) -> Result<()>;

    async fn send_welcome(&self, to: &str, username: &str, uid: i64) -> Result<()>;

    async fn send_password_reset(&self, to: &str, username: &str, reset_url: &str) -> Result<()>;

    /// Free-form admin email. `from_name` overrides the configured sender
    /// display name.
    async fn send_custom(
        &self,
        to: &str,
        username: &str,
        subject: &str,
        message: &str,
        from_name: Option<&str>,
    ) -> Result<()>;
}

const RESEND_API: &str = "https://api.resend.com/emails";

#[derive(Serialize)]
struct ResendRequest<'a> {
    from: String,
    to: &'a str,
    subject: &'a str,
    html: String,
}

/// Resend-style HTTP provider.
pub struct ResendMailer {
    client: reqwest::Client,
    api_key: String,
    from_address: String,
    from_name: String,
}

impl ResendMailer {
    #[must_use]
    pub const fn new(
        client: reqwest::Client,
        api_key: String,
        from_address: String,
        from_name: String,
    ) -> Self {
        Self {
            client,
            api_key,
            from_address,
            from_name,
        }
    }

    async fn dispatch(
        &self,
        to: &str,
        subject: &str,
        html: String,
        from_name: Option<&str>,
    ) -> Result<()> {
        let from = format!(
            "{} <{}>",
            from_name.unwrap_or(&self.from_name),
            self.from_address
        );

        let response = self
            .client
            .post(RESEND_API)
            .bearer_auth(&self.api_key)
            .json(&ResendRequest {
                from,
                to,
                subject,
                html,
            })
            .send()
            .await
            .context("Email provider request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            anyhow::bail!("Email provider returned {status}");
        }

        Ok(())
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send_verification(&self, to: &str, username: &str, code: &str) -> Result<()> {
        self.dispatch(to, "Verify your email", verification_body(username, code), None)
            .await
    }

    async fn send_welcome(&self, to: &str, username: &str, uid: i64) -> Result<()> {
        self.dispatch(to, "Welcome to lynkr", welcome_body(username, uid), None)
            .await
    }

    async fn send_password_reset(&self, to: &str, username: &str, reset_url: &str) -> Result<()> {
        self.dispatch(
            to,
            "Reset your password",
            password_reset_body(username, reset_url),
            None,
        )
        .await
    }

    async fn send_custom(
        &self,
        to: &str,
        username: &str,
        subject: &str,
        message: &str,
        from_name: Option<&str>,
    ) -> Result<()> {
        self.dispatch(to, subject, custom_body(username, message), from_name)
            .await
    }
}

/// Logs instead of sending. Used when no provider key is configured.
pub struct NoopMailer;

#[async_trait]
impl Mailer for NoopMailer {
    async fn send_verification(&self, to: &str, _username: &str, code: &str) -> Result<()> {
        debug!(to, code, "Email delivery disabled; skipping verification email");
        Ok(())
    }

    async fn send_welcome(&self, to: &str, _username: &str, _uid: i64) -> Result<()> {
        debug!(to, "Email delivery disabled; skipping welcome email");
        Ok(())
    }

    async fn send_password_reset(&self, to: &str, _username: &str, _reset_url: &str) -> Result<()> {
        debug!(to, "Email delivery disabled; skipping reset email");
        Ok(())
    }

    async fn send_custom(
        &self,
        to: &str,
        _username: &str,
        subject: &str,
        _message: &str,
        _from_name: Option<&str>,
    ) -> Result<()> {
        debug!(to, subject, "Email delivery disabled; skipping custom email");
        Ok(())
    }
}

fn layout(inner: &str) -> String {
    format!(
        "<div style=\"max-width:600px;margin:0 auto;padding:40px 20px;\
         font-family:'Inter',-apple-system,sans-serif;\">\
         <h1 style=\"text-align:center;font-size:28px;\">lynkr</h1>\
         <div style=\"border:1px solid #e5e5e5;border-radius:16px;padding:32px;\">{inner}</div>\
         <p style=\"text-align:center;color:#6b7280;font-size:14px;margin-top:32px;\">\
         If you didn't expect this email, please ignore it.</p></div>"
    )
}

fn verification_body(username: &str, code: &str) -> String {
    let username = html_escape::encode_text(username);
    let code = html_escape::encode_text(code);
    layout(&format!(
        "<p>Hi {username},</p>\
         <p>Your verification code is:</p>\
         <p style=\"font-size:32px;letter-spacing:8px;text-align:center;\"><strong>{code}</strong></p>\
         <p>It expires in 5 minutes.</p>"
    ))
}

fn welcome_body(username: &str, uid: i64) -> String {
    let username = html_escape::encode_text(username);
    layout(&format!(
        "<p>Hi {username},</p>\
         <p>Your email is verified and your page is live. You are member #{uid}.</p>"
    ))
}

fn password_reset_body(username: &str, reset_url: &str) -> String {
    let username = html_escape::encode_text(username);
    let reset_url = html_escape::encode_double_quoted_attribute(reset_url);
    layout(&format!(
        "<p>Hi {username},</p>\
         <p>Someone requested a password reset for your account. The link below is valid for 1 hour.</p>\
         <p style=\"text-align:center;\"><a href=\"{reset_url}\">Reset password</a></p>"
    ))
}

fn custom_body(username: &str, message: &str) -> String {
    let username = html_escape::encode_text(username);
    let message = html_escape::encode_text(message);
    layout(&format!(
        "<p>Hi {username},</p>\
         <div style=\"white-space:pre-wrap;\">{message}</div>"
    ))
}
