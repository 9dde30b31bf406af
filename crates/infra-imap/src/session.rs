//! Blocking IMAP session: one connection, one command at a time.

use std::sync::Arc;

use nimbus_domain::{Email, FolderCatalog, ImapConfig, Parsed};
use nimbus_error::MailError;
use nimbus_mailbox::message::html_part;
use nimbus_mailbox::{build_catalog, parse_message, split_list_response};
use tracing::{debug, info, warn};

use crate::connection::{MailConnection, MailConnector, TlsImapConnector};

/// Fetches the full source without setting `\Seen`.
const SOURCE_ITEM: &str = "BODY.PEEK[]";

pub struct MailboxSession {
    config: ImapConfig,
    connector: Arc<dyn MailConnector>,
    conn: Option<Box<dyn MailConnection>>,
    // Set by a successful `connect`, cleared by `disconnect` or a failed
    // reconnect. Only an established session is reconnected.
    established: bool,
}

impl MailboxSession {
    pub fn new(config: ImapConfig, connector: Arc<dyn MailConnector>) -> Self {
        Self {
            config,
            connector,
            conn: None,
            established: false,
        }
    }

    pub fn tls(config: ImapConfig) -> Self {
        Self::new(config, Arc::new(TlsImapConnector))
    }

    pub fn config(&self) -> &ImapConfig {
        &self.config
    }

    /// Open and authenticate a fresh connection, replacing any current one.
    pub fn connect(&mut self) -> Result<(), MailError> {
        self.config.validate()?;
        self.disconnect();
        match self.connector.connect(&self.config) {
            Ok(conn) => {
                self.conn = Some(conn);
                self.established = true;
                info!(server = %self.config.server, user = %self.config.username, "connected");
                Ok(())
            }
            Err(e) => {
                warn!(server = %self.config.server, "connect failed: {e}");
                Err(e)
            }
        }
    }

    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    /// NOOP the current connection and drop it if the server is gone.
    pub fn check_alive(&mut self) -> bool {
        let Some(conn) = self.conn.as_mut() else {
            return false;
        };
        match conn.noop() {
            Ok(()) => true,
            Err(e) => {
                debug!("connection stale: {e}");
                self.conn = None;
                false
            }
        }
    }

    /// Keep a live connection. A session that was connected and went stale
    /// is reconnected once; one that never connected, or was disconnected,
    /// stays [`MailError::NotConnected`].
    pub fn ensure_connected(&mut self) -> Result<(), MailError> {
        if self.check_alive() {
            return Ok(());
        }
        if !self.established {
            return Err(MailError::not_connected("call connect first"));
        }
        debug!("connection lost, reconnecting");
        self.connect()
    }

    pub fn list_folders(&mut self, include_hidden: bool) -> Result<FolderCatalog, MailError> {
        let conn = self.conn_mut()?;
        let raw = conn.list_raw()?;
        let lines = split_list_response(&raw);
        debug!(lines = lines.len(), "LIST response");

        let mut lost: Option<MailError> = None;
        let catalog = build_catalog(lines, include_hidden, |name| {
            if lost.is_some() {
                return false;
            }
            match conn.examine(name) {
                Ok(_) => true,
                Err(e) if e.is_connection_level() => {
                    lost = Some(e);
                    false
                }
                Err(e) => {
                    debug!(folder = name, "examine failed: {e}");
                    false
                }
            }
        });
        match lost {
            Some(e) => Err(e),
            None => Ok(catalog),
        }
    }

    /// The `limit` most recent messages of `folder`, newest first. A message
    /// that cannot be fetched or parsed is logged and left out.
    pub fn fetch_messages(&mut self, folder: &str, limit: usize) -> Result<Vec<Email>, MailError> {
        let conn = self.conn_mut()?;
        let exists = conn.examine(folder)?;
        if exists == 0 || limit == 0 {
            return Ok(Vec::new());
        }

        let mut seqs = conn.search_all()?;
        seqs.sort_unstable_by(|a, b| b.cmp(a));
        seqs.truncate(limit);

        let mut emails = Vec::with_capacity(seqs.len());
        let mut skipped = 0usize;
        for seq in seqs {
            let raw = match conn.fetch(seq, SOURCE_ITEM) {
                Ok(Some(raw)) => raw,
                Ok(None) => {
                    debug!(folder, seq, "no body returned");
                    skipped += 1;
                    continue;
                }
                Err(e) => {
                    warn!(folder, seq, "fetch failed: {e}");
                    skipped += 1;
                    continue;
                }
            };
            match parse_message(&seq.to_string(), &raw) {
                Parsed::Value(email) => emails.push(email),
                Parsed::Skipped(reason) => {
                    warn!(folder, seq, %reason, "skipped message");
                    skipped += 1;
                }
            }
        }

        info!(folder, count = emails.len(), skipped, "fetched messages");
        Ok(emails)
    }

    pub fn fetch_raw(&mut self, folder: &str, id: &str) -> Result<Option<String>, MailError> {
        Ok(self
            .fetch_source(folder, id)?
            .map(|raw| String::from_utf8_lossy(&raw).into_owned()))
    }

    pub fn fetch_html(&mut self, folder: &str, id: &str) -> Result<Option<String>, MailError> {
        Ok(self.fetch_source(folder, id)?.and_then(|raw| html_part(&raw)))
    }

    /// Whether `folder` can be opened read-only. Only connection-level
    /// failures are errors.
    pub fn folder_exists(&mut self, folder: &str) -> Result<bool, MailError> {
        match self.conn_mut()?.examine(folder) {
            Ok(_) => Ok(true),
            Err(e) if e.is_connection_level() => Err(e),
            Err(e) => {
                debug!(folder, "examine failed: {e}");
                Ok(false)
            }
        }
    }

    pub fn folder_count(&mut self, folder: &str) -> Result<u32, MailError> {
        self.conn_mut()?.examine(folder)
    }

    /// Move message `id` of `from` into `to`: copy, flag `\Deleted`, expunge.
    pub fn move_email(&mut self, from: &str, id: &str, to: &str) -> Result<(), MailError> {
        let seq = parse_seq(id)?;
        let conn = self.conn_mut()?;
        let exists = conn.select(from)?;
        if seq == 0 || seq > exists {
            return Err(MailError::not_found(format!("message {id} in '{from}'")));
        }
        conn.copy(seq, to)?;
        conn.mark_deleted(seq)?;
        conn.expunge()?;
        info!(from, to, seq, "moved message");
        Ok(())
    }

    /// Log out and drop the connection. Safe to call any number of times.
    pub fn disconnect(&mut self) {
        self.established = false;
        let Some(mut conn) = self.conn.take() else {
            return;
        };
        match conn.logout() {
            Ok(()) => info!(server = %self.config.server, "disconnected"),
            Err(e) => debug!("logout failed, dropping connection: {e}"),
        }
    }

    fn fetch_source(&mut self, folder: &str, id: &str) -> Result<Option<Vec<u8>>, MailError> {
        let seq = parse_seq(id)?;
        let conn = self.conn_mut()?;
        conn.examine(folder)?;
        conn.fetch(seq, SOURCE_ITEM)
    }

    fn conn_mut(&mut self) -> Result<&mut Box<dyn MailConnection>, MailError> {
        self.conn
            .as_mut()
            .ok_or_else(|| MailError::not_connected("no active IMAP connection"))
    }
}

fn parse_seq(id: &str) -> Result<u32, MailError> {
    id.trim()
        .parse()
        .map_err(|_| MailError::invalid_input(format!("message id must be a number: {id}")))
}

impl Drop for MailboxSession {
    fn drop(&mut self) {
        self.disconnect();
    }
}
