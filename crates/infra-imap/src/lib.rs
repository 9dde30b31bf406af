pub mod adapter;
pub mod connection;
pub mod session;
pub mod smtp;

pub use adapter::ImapMailbox;
pub use connection::{MailConnection, MailConnector, TlsImapConnector};
pub use session::MailboxSession;
pub use smtp::SmtpSender;
