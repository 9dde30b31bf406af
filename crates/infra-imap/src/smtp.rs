use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Mailbox, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use nimbus_domain::{split_addresses, DraftEmail, SendPort, SendReceipt, SmtpConfig};
use nimbus_error::MailError;
use tracing::info;

pub struct SmtpSender {
    config: SmtpConfig,
}

impl SmtpSender {
    pub fn new(config: SmtpConfig) -> Self {
        Self { config }
    }

    fn transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>, MailError> {
        let creds = Credentials::new(self.config.username.clone(), self.config.password.clone());
        let builder = if self.config.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.server)
                .map_err(|e| MailError::send(format!("SMTP relay: {e}")))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&self.config.server)
        };
        Ok(builder.port(self.config.port).credentials(creds).build())
    }
}

fn parse_mailbox(addr: &str, field: &str) -> Result<Mailbox, MailError> {
    addr.parse()
        .map_err(|e| MailError::invalid_input(format!("invalid {field} '{addr}': {e}")))
}

/// Build the outgoing message. Kept apart from the transport so the
/// envelope can be checked without a server.
pub fn build_message(from: &str, draft: &DraftEmail) -> Result<lettre::Message, MailError> {
    let to = split_addresses(&draft.to);
    if to.is_empty() {
        return Err(MailError::invalid_input("'to' cannot be empty"));
    }

    let mut builder = lettre::Message::builder()
        .from(parse_mailbox(from, "from")?)
        .subject(draft.subject.as_str());

    for addr in &to {
        builder = builder.to(parse_mailbox(addr, "to")?);
    }
    for addr in draft.cc.as_deref().map(split_addresses).unwrap_or_default() {
        builder = builder.cc(parse_mailbox(&addr, "cc")?);
    }
    for addr in draft.bcc.as_deref().map(split_addresses).unwrap_or_default() {
        builder = builder.bcc(parse_mailbox(&addr, "bcc")?);
    }
    if let Some(ref reply_id) = draft.reply_to_id {
        builder = builder.in_reply_to(reply_id.clone());
        builder = builder.references(reply_id.clone());
    }

    let text_part = SinglePart::builder()
        .content_type(ContentType::TEXT_PLAIN)
        .body(draft.body.clone());

    builder
        .singlepart(text_part)
        .map_err(|e| MailError::internal(format!("email build: {e}")))
}

#[async_trait]
impl SendPort for SmtpSender {
    async fn send(&self, draft: &DraftEmail) -> Result<SendReceipt, MailError> {
        let email = build_message(&self.config.sender_email, draft)?;
        let recipients = draft.recipients();

        self.transport()?
            .send(email)
            .await
            .map_err(|e| MailError::send(format!("SMTP send: {e}")))?;

        info!(
            server = %self.config.server,
            recipients = recipients.len(),
            subject = %draft.subject,
            "email sent"
        );

        let message = format!("Email sent to {} recipient(s)", recipients.len());
        Ok(SendReceipt {
            recipients,
            message,
        })
    }
}
