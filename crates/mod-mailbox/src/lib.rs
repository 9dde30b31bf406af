pub mod catalog;
pub mod classify;
pub mod folder;
pub mod format;
pub mod header;
pub mod message;
pub mod service;

pub use catalog::{build_catalog, FALLBACK_FOLDERS};
pub use classify::{classify, Classification};
pub use folder::{parse_folder_line, split_list_response, ParsedFolder};
pub use header::decode_header;
pub use message::parse_message;
pub use service::MailService;
