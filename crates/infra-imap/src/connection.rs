use std::net::TcpStream;

use nimbus_domain::ImapConfig;
use nimbus_error::MailError;
use tracing::info;

/// The handful of IMAP commands the session issues. One command is in
/// flight at a time, so every method takes `&mut self`.
pub trait MailConnection: Send {
    /// Untagged response lines of `LIST "" "*"`, unparsed.
    fn list_raw(&mut self) -> Result<Vec<u8>, MailError>;

    /// Open `folder` read-only and return its message count.
    fn examine(&mut self, folder: &str) -> Result<u32, MailError>;

    /// Open `folder` read-write and return its message count.
    fn select(&mut self, folder: &str) -> Result<u32, MailError>;

    /// Sequence numbers of every message in the selected folder.
    fn search_all(&mut self) -> Result<Vec<u32>, MailError>;

    /// Body returned for `item` of one message, `None` if the server sent
    /// no body.
    fn fetch(&mut self, seq: u32, item: &str) -> Result<Option<Vec<u8>>, MailError>;

    fn copy(&mut self, seq: u32, to: &str) -> Result<(), MailError>;

    fn mark_deleted(&mut self, seq: u32) -> Result<(), MailError>;

    fn expunge(&mut self) -> Result<(), MailError>;

    fn noop(&mut self) -> Result<(), MailError>;

    fn logout(&mut self) -> Result<(), MailError>;
}

/// Opens authenticated connections. Tests swap in an in-memory connector.
pub trait MailConnector: Send + Sync {
    fn connect(&self, config: &ImapConfig) -> Result<Box<dyn MailConnection>, MailError>;
}

type TlsSession = imap::Session<native_tls::TlsStream<TcpStream>>;

#[derive(Debug, Default, Clone, Copy)]
pub struct TlsImapConnector;

impl MailConnector for TlsImapConnector {
    fn connect(&self, config: &ImapConfig) -> Result<Box<dyn MailConnection>, MailError> {
        let tls = native_tls::TlsConnector::builder()
            .build()
            .map_err(|e| MailError::connection(format!("TLS init: {e}")))?;

        let client = imap::connect((config.server.as_str(), config.port), &config.server, &tls)
            .map_err(|e| {
                MailError::connection(format!("IMAP connect {}:{}: {e}", config.server, config.port))
            })?;

        let session = client
            .login(&config.username, &config.password)
            .map_err(|(e, _)| MailError::connection(format!("IMAP login: {e}")))?;

        info!(server = %config.server, port = config.port, "IMAP session established");
        Ok(Box::new(TlsConnection { session }))
    }
}

struct TlsConnection {
    session: TlsSession,
}

impl MailConnection for TlsConnection {
    fn list_raw(&mut self) -> Result<Vec<u8>, MailError> {
        self.session
            .run_command_and_read_response("LIST \"\" \"*\"")
            .map_err(|e| command_error("LIST", e))
    }

    fn examine(&mut self, folder: &str) -> Result<u32, MailError> {
        self.session
            .examine(folder)
            .map(|mailbox| mailbox.exists)
            .map_err(|e| folder_error(folder, e))
    }

    fn select(&mut self, folder: &str) -> Result<u32, MailError> {
        self.session
            .select(folder)
            .map(|mailbox| mailbox.exists)
            .map_err(|e| folder_error(folder, e))
    }

    fn search_all(&mut self) -> Result<Vec<u32>, MailError> {
        self.session
            .search("ALL")
            .map(|seqs| seqs.into_iter().collect())
            .map_err(|e| command_error("SEARCH", e))
    }

    fn fetch(&mut self, seq: u32, item: &str) -> Result<Option<Vec<u8>>, MailError> {
        let fetches = self
            .session
            .fetch(seq.to_string(), item)
            .map_err(|e| command_error("FETCH", e))?;
        Ok(fetches.iter().find_map(|f| f.body()).map(<[u8]>::to_vec))
    }

    fn copy(&mut self, seq: u32, to: &str) -> Result<(), MailError> {
        self.session
            .copy(seq.to_string(), to)
            .map_err(|e| match e {
                imap::Error::No(_) => MailError::not_found(format!("copy to '{to}': {e}")),
                other => command_error("COPY", other),
            })
    }

    fn mark_deleted(&mut self, seq: u32) -> Result<(), MailError> {
        self.session
            .store(seq.to_string(), "+FLAGS (\\Deleted)")
            .map(|_| ())
            .map_err(|e| command_error("STORE", e))
    }

    fn expunge(&mut self) -> Result<(), MailError> {
        self.session
            .expunge()
            .map(|_| ())
            .map_err(|e| command_error("EXPUNGE", e))
    }

    fn noop(&mut self) -> Result<(), MailError> {
        self.session.noop().map_err(|e| command_error("NOOP", e))
    }

    fn logout(&mut self) -> Result<(), MailError> {
        self.session.logout().map_err(|e| command_error("LOGOUT", e))
    }
}

fn command_error(command: &str, e: imap::Error) -> MailError {
    match e {
        imap::Error::Io(_) | imap::Error::ConnectionLost => {
            MailError::connection(format!("IMAP {command}: {e}"))
        }
        _ => MailError::protocol(format!("IMAP {command}: {e}")),
    }
}

// A NO reply to SELECT/EXAMINE means the folder is not there.
fn folder_error(folder: &str, e: imap::Error) -> MailError {
    match e {
        imap::Error::No(_) => MailError::not_found(format!("folder '{folder}': {e}")),
        other => command_error("SELECT", other),
    }
}
