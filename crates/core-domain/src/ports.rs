use async_trait::async_trait;
use nimbus_error::MailError;

use crate::entities::{DraftEmail, Email, FolderCatalog, SendReceipt};

/// A mailbox, as seen by request handlers. Implementations
/// serialize access to their single connection internally.
#[async_trait]
pub trait MailboxPort: Send + Sync {
    /// Open the connection. Every other call fails with
    /// [`MailError::NotConnected`] until this succeeds.
    async fn connect(&self) -> Result<(), MailError>;

    async fn is_connected(&self) -> bool;

    async fn list_folders(&self, include_hidden: bool) -> Result<FolderCatalog, MailError>;

    async fn fetch_messages(&self, folder: &str, limit: usize) -> Result<Vec<Email>, MailError>;

    async fn fetch_raw(&self, folder: &str, id: &str) -> Result<Option<String>, MailError>;

    async fn fetch_html(&self, folder: &str, id: &str) -> Result<Option<String>, MailError>;

    async fn folder_exists(&self, folder: &str) -> Result<bool, MailError>;

    async fn folder_count(&self, folder: &str) -> Result<u32, MailError>;

    async fn move_email(&self, folder: &str, id: &str, to: &str) -> Result<(), MailError>;

    async fn disconnect(&self);
}

#[async_trait]
pub trait SendPort: Send + Sync {
    async fn send(&self, draft: &DraftEmail) -> Result<SendReceipt, MailError>;
}
