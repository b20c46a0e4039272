pub mod templates;

use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::SmtpConfig;

pub struct SystemMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

/// What the invitation email needs to know, resolved by the worker.
pub struct InvitationEmail<'a> {
    pub to_email: &'a str,
    pub to_name: &'a str,
    pub inviter_name: &'a str,
    pub project_title: &'a str,
    pub invitation_url: &'a str,
}

impl SystemMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, String> {
        let creds = Credentials::new(config.user.clone(), config.pass.clone());

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| format!("System SMTP error: {e}"))?
            .port(config.port)
            .credentials(creds)
            .build();

        Ok(Self {
            transport,
            from: config.from.clone(),
        })
    }

    pub async fn send_project_invitation(&self, email: &InvitationEmail<'_>) -> Result<(), String> {
        let html = templates::render_project_invitation(
            email.to_name,
            email.inviter_name,
            email.project_title,
            email.invitation_url,
        );
        self.send(email.to_email, templates::PROJECT_INVITATION_SUBJECT, &html)
            .await
    }

    pub async fn send_activation(
        &self,
        to_email: &str,
        to_name: &str,
        activation_url: &str,
    ) -> Result<(), String> {
        let html = templates::render_activation(to_name, activation_url);
        self.send(to_email, templates::ACTIVATION_SUBJECT, &html).await
    }

    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<(), String> {
        let message = Message::builder()
            .from(
                self.from
                    .parse()
                    .map_err(|e| format!("Invalid from address: {e}"))?,
            )
            .to(to.parse().map_err(|e| format!("Invalid to address: {e}"))?)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html_body.to_string())
            .map_err(|e| format!("Failed to build email: {e}"))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| format!("Failed to send email: {e}"))?;

        Ok(())
    }
}
