use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use nimbus_domain::{Email, FolderCatalog, ImapConfig, MailboxPort};
use nimbus_error::MailError;
use tracing::warn;

use crate::session::MailboxSession;

/// Async face of a [`MailboxSession`]. Every call runs on the blocking
/// pool with the session locked.
pub struct ImapMailbox {
    session: Arc<Mutex<MailboxSession>>,
}

impl ImapMailbox {
    pub fn new(session: MailboxSession) -> Self {
        Self {
            session: Arc::new(Mutex::new(session)),
        }
    }

    pub fn tls(config: ImapConfig) -> Self {
        Self::new(MailboxSession::tls(config))
    }

    async fn locked<F, R>(&self, f: F) -> Result<R, MailError>
    where
        F: FnOnce(&mut MailboxSession) -> Result<R, MailError> + Send + 'static,
        R: Send + 'static,
    {
        let session = self.session.clone();
        tokio::task::spawn_blocking(move || {
            let mut guard = session
                .lock()
                .map_err(|_| MailError::internal("mailbox session lock poisoned"))?;
            f(&mut guard)
        })
        .await
        .map_err(|e| MailError::internal(format!("spawn: {e}")))?
    }

    async fn with_session<F, R>(&self, f: F) -> Result<R, MailError>
    where
        F: FnOnce(&mut MailboxSession) -> Result<R, MailError> + Send + 'static,
        R: Send + 'static,
    {
        self.locked(move |s| {
            s.ensure_connected()?;
            f(s)
        })
        .await
    }
}

#[async_trait]
impl MailboxPort for ImapMailbox {
    async fn connect(&self) -> Result<(), MailError> {
        self.locked(MailboxSession::connect).await
    }

    async fn is_connected(&self) -> bool {
        let session = self.session.clone();
        tokio::task::spawn_blocking(move || {
            session
                .lock()
                .map(|mut guard| guard.check_alive())
                .unwrap_or(false)
        })
        .await
        .unwrap_or(false)
    }

    async fn list_folders(&self, include_hidden: bool) -> Result<FolderCatalog, MailError> {
        self.with_session(move |s| s.list_folders(include_hidden)).await
    }

    async fn fetch_messages(&self, folder: &str, limit: usize) -> Result<Vec<Email>, MailError> {
        let folder = folder.to_string();
        self.with_session(move |s| s.fetch_messages(&folder, limit))
            .await
    }

    async fn fetch_raw(&self, folder: &str, id: &str) -> Result<Option<String>, MailError> {
        let (folder, id) = (folder.to_string(), id.to_string());
        self.with_session(move |s| s.fetch_raw(&folder, &id)).await
    }

    async fn fetch_html(&self, folder: &str, id: &str) -> Result<Option<String>, MailError> {
        let (folder, id) = (folder.to_string(), id.to_string());
        self.with_session(move |s| s.fetch_html(&folder, &id)).await
    }

    async fn folder_exists(&self, folder: &str) -> Result<bool, MailError> {
        let folder = folder.to_string();
        self.with_session(move |s| s.folder_exists(&folder)).await
    }

    async fn folder_count(&self, folder: &str) -> Result<u32, MailError> {
        let folder = folder.to_string();
        self.with_session(move |s| s.folder_count(&folder)).await
    }

    async fn move_email(&self, folder: &str, id: &str, to: &str) -> Result<(), MailError> {
        let (folder, id, to) = (folder.to_string(), id.to_string(), to.to_string());
        self.with_session(move |s| s.move_email(&folder, &id, &to))
            .await
    }

    async fn disconnect(&self) {
        let session = self.session.clone();
        let result = tokio::task::spawn_blocking(move || {
            if let Ok(mut guard) = session.lock() {
                guard.disconnect();
            }
        })
        .await;
        if let Err(e) = result {
            warn!("disconnect task failed: {e}");
        }
    }
}
