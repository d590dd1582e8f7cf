// src/notify/email.rs
use anyhow::{Context, Result};
use lettre::message::{header, Mailbox, Message, MultiPart, SinglePart};
use lettre::transport::smtp::{authentication::Credentials, AsyncSmtpTransport};
use lettre::{AsyncTransport, Tokio1Executor};
use std::time::Duration;

use super::Channel;
use crate::config::EmailConfig;
use crate::report::Report;

pub struct EmailChannel {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Vec<Mailbox>,
}

impl EmailChannel {
    pub fn new(cfg: &EmailConfig) -> Result<Self> {
        let creds = Credentials::new(cfg.username.clone(), cfg.password.clone());
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(&cfg.host)
            .with_context(|| format!("invalid SMTP host {}", cfg.host))?
            .port(cfg.port)
            .credentials(creds)
            .timeout(Some(Duration::from_secs(cfg.timeout_secs)))
            .build();

        let from = cfg
            .from
            .parse()
            .with_context(|| format!("invalid sender {}", cfg.from))?;
        let to = cfg
            .to
            .iter()
            .map(|a| a.parse().with_context(|| format!("invalid recipient {a}")))
            .collect::<Result<Vec<Mailbox>>>()?;
        anyhow::ensure!(!to.is_empty(), "email channel needs at least one recipient");

        Ok(Self { mailer, from, to })
    }

    fn build_message(&self, report: &Report) -> Result<Message> {
        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(report.title.clone());
        for rcpt in &self.to {
            builder = builder.to(rcpt.clone());
        }
        builder
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(header::ContentType::TEXT_PLAIN)
                            .body(report.text.clone()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(header::ContentType::TEXT_HTML)
                            .body(report.html.clone()),
                    ),
            )
            .context("build email")
    }
}

#[async_trait::async_trait]
impl Channel for EmailChannel {
    fn name(&self) -> &str {
        "email"
    }

    async fn send(&self, report: &Report) -> Result<()> {
        let msg = self.build_message(report)?;
        self.mailer.send(msg).await.context("send email")?;
        Ok(())
    }
}
