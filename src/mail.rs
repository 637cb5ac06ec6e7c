//! Outbound mail for verification and password reset links.

use anyhow::Context;
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncFileTransport, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::{info, warn};

use crate::config::MailConfig;

#[derive(Debug, Clone)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: OutgoingEmail) -> anyhow::Result<()>;
}

enum Transport {
    Smtp(AsyncSmtpTransport<Tokio1Executor>),
    File(AsyncFileTransport<Tokio1Executor>),
}

pub struct LettreMailer {
    transport: Transport,
    from: Mailbox,
}

impl LettreMailer {
    pub fn new(config: &MailConfig) -> anyhow::Result<Self> {
        let from = config
            .from
            .parse::<Mailbox>()
            .with_context(|| format!("parse MAIL_FROM {}", config.from))?;

        let transport = match &config.smtp {
            Some(smtp) => {
                let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&smtp.host)
                    .context("create SMTP transport")?
                    .port(smtp.port)
                    .credentials(Credentials::new(
                        smtp.username.clone(),
                        smtp.password.clone(),
                    ))
                    .build();
                Transport::Smtp(transport)
            }
            None => {
                warn!(dir = %config.outbox_dir, "SMTP_HOST not set; writing mails to outbox dir");
                std::fs::create_dir_all(&config.outbox_dir)
                    .with_context(|| format!("create outbox dir {}", config.outbox_dir))?;
                Transport::File(AsyncFileTransport::<Tokio1Executor>::new(&config.outbox_dir))
            }
        };

        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Mailer for LettreMailer {
    async fn send(&self, email: OutgoingEmail) -> anyhow::Result<()> {
        let to = email
            .to
            .parse::<Mailbox>()
            .with_context(|| format!("parse recipient {}", email.to))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(&email.subject)
            .header(ContentType::TEXT_HTML)
            .body(email.html)
            .context("build mail message")?;

        match &self.transport {
            Transport::Smtp(smtp) => {
                smtp.send(message).await.context("send SMTP mail")?;
            }
            Transport::File(file) => {
                file.send(message).await.context("write mail to outbox")?;
            }
        }
        info!(to = %email.to, subject = %email.subject, "mail sent");
        Ok(())
    }
}

pub fn verification_email(to: &str, name: &str, link: &str) -> OutgoingEmail {
    OutgoingEmail {
        to: to.to_string(),
        subject: "Confirm your e-mail".to_string(),
        html: layout(
            "Confirm your e-mail",
            &format!(
                "<p>Hello {name},</p>\
                 <p>Thanks for signing up. Click the link below to activate your account:</p>\
                 <p><a href=\"{link}\">Activate my account</a></p>\
                 <p>Or paste this address into your browser: {link}</p>"
            ),
        ),
    }
}

pub fn password_reset_email(to: &str, name: &str, link: &str) -> OutgoingEmail {
    OutgoingEmail {
        to: to.to_string(),
        subject: "Password reset request".to_string(),
        html: layout(
            "Password reset request",
            &format!(
                "<p>Hello {name},</p>\
                 <p>We received a request to reset your password. If it wasn't you, ignore this e-mail.</p>\
                 <p>Confirm the request by opening the link below, then choose a new password in the app:</p>\
                 <p><a href=\"{link}\">Confirm password reset</a></p>\
                 <p>Or paste this address into your browser: {link}</p>"
            ),
        ),
    }
}

fn layout(title: &str, content: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>{title}</title></head>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333;">
<div style="max-width: 600px; margin: 0 auto; padding: 20px;">
<h2>{title}</h2>
{content}
<p style="margin-top: 30px; font-size: 12px; color: #666;">This is an automated message, please do not reply.</p>
</div>
</body>
</html>"#
    )
}
