use std::sync::Arc;

use nimbus_domain::{DraftEmail, Email, FolderCatalog, MailboxPort, SendPort, SendReceipt, NO_SUBJECT};
use nimbus_error::MailError;
use tracing::info;

pub const DEFAULT_FETCH_LIMIT: usize = 50;
pub const MAX_FETCH_LIMIT: usize = 200;

pub struct MailService {
    mailbox: Arc<dyn MailboxPort>,
    sender: Option<Arc<dyn SendPort>>,
}

impl MailService {
    pub fn new(mailbox: Arc<dyn MailboxPort>) -> Self {
        Self {
            mailbox,
            sender: None,
        }
    }

    pub fn with_sender(mut self, sender: Arc<dyn SendPort>) -> Self {
        self.sender = Some(sender);
        self
    }

    pub async fn connect(&self) -> Result<(), MailError> {
        self.mailbox.connect().await?;
        info!("mailbox connected");
        Ok(())
    }

    pub async fn is_connected(&self) -> bool {
        self.mailbox.is_connected().await
    }

    pub async fn list_folders(&self, include_hidden: bool) -> Result<FolderCatalog, MailError> {
        let catalog = self.mailbox.list_folders(include_hidden).await?;
        info!(count = catalog.len(), include_hidden, "listed folders");
        Ok(catalog)
    }

    pub async fn fetch_messages(&self, folder: &str, limit: usize) -> Result<Vec<Email>, MailError> {
        validate_not_empty(folder, "folder")?;
        let limit = clamp(limit, 1, MAX_FETCH_LIMIT, DEFAULT_FETCH_LIMIT);
        let emails = self.mailbox.fetch_messages(folder, limit).await?;
        info!(folder, limit, count = emails.len(), "fetched messages");
        Ok(emails)
    }

    /// Same as [`fetch_messages`](Self::fetch_messages) but every body is
    /// cut down for payload-limited consumers.
    pub async fn fetch_for_analysis(
        &self,
        folder: &str,
        limit: usize,
    ) -> Result<Vec<Email>, MailError> {
        let emails = self.fetch_messages(folder, limit).await?;
        Ok(emails.iter().map(Email::analysis_payload).collect())
    }

    pub async fn fetch_raw(&self, folder: &str, id: &str) -> Result<String, MailError> {
        validate_not_empty(folder, "folder")?;
        validate_not_empty(id, "id")?;
        self.mailbox
            .fetch_raw(folder, id)
            .await?
            .ok_or_else(|| MailError::not_found(format!("message {id} in {folder}")))
    }

    pub async fn fetch_html(&self, folder: &str, id: &str) -> Result<Option<String>, MailError> {
        validate_not_empty(folder, "folder")?;
        validate_not_empty(id, "id")?;
        self.mailbox.fetch_html(folder, id).await
    }

    pub async fn folder_count(&self, folder: &str) -> Result<u32, MailError> {
        validate_not_empty(folder, "folder")?;
        if !self.mailbox.folder_exists(folder).await? {
            return Err(MailError::not_found(format!("folder {folder}")));
        }
        self.mailbox.folder_count(folder).await
    }

    pub async fn move_email(&self, folder: &str, id: &str, to: &str) -> Result<(), MailError> {
        validate_not_empty(folder, "folder")?;
        validate_not_empty(id, "id")?;
        validate_not_empty(to, "target folder")?;
        if folder == to {
            return Err(MailError::invalid_input(format!("message is already in {folder}")));
        }
        self.mailbox.move_email(folder, id, to).await?;
        info!(folder, id, to, "moved message");
        Ok(())
    }

    pub async fn send(&self, draft: &DraftEmail) -> Result<SendReceipt, MailError> {
        validate_not_empty(&draft.to, "to")?;
        let sender = self
            .sender
            .as_ref()
            .ok_or_else(|| MailError::invalid_input("sending is not configured"))?;

        let mut draft = draft.clone();
        if draft.subject.trim().is_empty() {
            draft.subject = NO_SUBJECT.to_string();
        }
        let receipt = sender.send(&draft).await?;
        info!(recipients = receipt.recipients.len(), "sent email");
        Ok(receipt)
    }

    pub async fn disconnect(&self) {
        self.mailbox.disconnect().await;
    }
}

fn validate_not_empty(val: &str, name: &str) -> Result<(), MailError> {
    if val.trim().is_empty() {
        return Err(MailError::invalid_input(format!("{name} cannot be empty")));
    }
    Ok(())
}

fn clamp(val: usize, min: usize, max: usize, default: usize) -> usize {
    if val == 0 {
        default
    } else {
        val.max(min).min(max)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use nimbus_domain::EmailParts;

    use super::*;

    #[derive(Default)]
    struct FakeMailbox {
        limits: Mutex<Vec<usize>>,
        moves: Mutex<Vec<(String, String, String)>>,
    }

    #[async_trait]
    impl MailboxPort for FakeMailbox {
        async fn connect(&self) -> Result<(), MailError> {
            Ok(())
        }

        async fn is_connected(&self) -> bool {
            true
        }

        async fn list_folders(&self, _include_hidden: bool) -> Result<FolderCatalog, MailError> {
            Ok(FolderCatalog::sorted(Vec::new()))
        }

        async fn fetch_messages(&self, _folder: &str, limit: usize) -> Result<Vec<Email>, MailError> {
            self.limits.lock().unwrap().push(limit);
            Ok(vec![Email::new(EmailParts {
                id: "7".into(),
                text_body: Some("x".repeat(30_000)),
                ..Default::default()
            })])
        }

        async fn fetch_raw(&self, _folder: &str, id: &str) -> Result<Option<String>, MailError> {
            Ok((id == "7").then(|| "Subject: hi\r\n\r\nbody".to_string()))
        }

        async fn fetch_html(&self, _folder: &str, _id: &str) -> Result<Option<String>, MailError> {
            Ok(None)
        }

        async fn folder_exists(&self, folder: &str) -> Result<bool, MailError> {
            Ok(folder == "INBOX")
        }

        async fn folder_count(&self, _folder: &str) -> Result<u32, MailError> {
            Ok(12)
        }

        async fn move_email(&self, folder: &str, id: &str, to: &str) -> Result<(), MailError> {
            self.moves
                .lock()
                .unwrap()
                .push((folder.into(), id.into(), to.into()));
            Ok(())
        }

        async fn disconnect(&self) {}
    }

    struct EchoSender;

    #[async_trait]
    impl SendPort for EchoSender {
        async fn send(&self, draft: &DraftEmail) -> Result<SendReceipt, MailError> {
            Ok(SendReceipt {
                recipients: draft.recipients(),
                message: draft.subject.clone(),
            })
        }
    }

    fn service() -> (Arc<FakeMailbox>, MailService) {
        let fake = Arc::new(FakeMailbox::default());
        let svc = MailService::new(fake.clone()).with_sender(Arc::new(EchoSender));
        (fake, svc)
    }

    #[tokio::test]
    async fn limit_is_clamped() {
        let (fake, svc) = service();
        svc.fetch_messages("INBOX", 0).await.unwrap();
        svc.fetch_messages("INBOX", 5).await.unwrap();
        svc.fetch_messages("INBOX", 10_000).await.unwrap();
        assert_eq!(*fake.limits.lock().unwrap(), [DEFAULT_FETCH_LIMIT, 5, MAX_FETCH_LIMIT]);
    }

    #[tokio::test]
    async fn empty_folder_rejected() {
        let (_, svc) = service();
        let err = svc.fetch_messages("  ", 10).await.unwrap_err();
        assert!(matches!(err, MailError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn analysis_bodies_are_truncated() {
        let (_, svc) = service();
        let emails = svc.fetch_for_analysis("INBOX", 1).await.unwrap();
        assert_eq!(emails[0].body().unwrap().chars().count(), 25_000);
    }

    #[tokio::test]
    async fn missing_raw_message_is_not_found() {
        let (_, svc) = service();
        assert!(svc.fetch_raw("INBOX", "7").await.unwrap().starts_with("Subject"));
        let err = svc.fetch_raw("INBOX", "8").await.unwrap_err();
        assert!(matches!(err, MailError::NotFound(_)));
    }

    #[tokio::test]
    async fn count_requires_existing_folder() {
        let (_, svc) = service();
        assert_eq!(svc.folder_count("INBOX").await.unwrap(), 12);
        assert!(matches!(
            svc.folder_count("Nope").await.unwrap_err(),
            MailError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn move_checks_arguments() {
        let (fake, svc) = service();
        svc.move_email("INBOX", "3", "Archive").await.unwrap();
        assert!(matches!(
            svc.move_email("INBOX", "3", "INBOX").await.unwrap_err(),
            MailError::InvalidInput(_)
        ));
        assert!(matches!(
            svc.move_email("INBOX", "3", " ").await.unwrap_err(),
            MailError::InvalidInput(_)
        ));
        assert_eq!(
            *fake.moves.lock().unwrap(),
            [("INBOX".to_string(), "3".to_string(), "Archive".to_string())]
        );
    }

    #[tokio::test]
    async fn send_defaults_subject() {
        let (_, svc) = service();
        let draft = DraftEmail {
            to: "a@example.com, b@example.com".into(),
            bcc: Some("c@example.com".into()),
            ..Default::default()
        };
        let receipt = svc.send(&draft).await.unwrap();
        assert_eq!(receipt.recipients, ["a@example.com", "b@example.com", "c@example.com"]);
        assert_eq!(receipt.message, NO_SUBJECT);
    }

    #[tokio::test]
    async fn send_without_sender_fails() {
        let svc = MailService::new(Arc::new(FakeMailbox::default()));
        let draft = DraftEmail {
            to: "a@example.com".into(),
            ..Default::default()
        };
        assert!(matches!(
            svc.send(&draft).await.unwrap_err(),
            MailError::InvalidInput(_)
        ));
    }
}
