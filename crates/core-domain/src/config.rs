use std::env;
use std::fmt;

use nimbus_error::MailError;

pub const DEFAULT_IMAP_PORT: u16 = 993;
pub const DEFAULT_SMTP_PORT: u16 = 587;

#[derive(Clone, PartialEq, Eq)]
pub struct ImapConfig {
    pub server: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

impl fmt::Debug for ImapConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImapConfig")
            .field("server", &self.server)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl ImapConfig {
    pub fn from_env() -> Result<Self, MailError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key/value source. Every missing or malformed field is
    /// collected before failing, so the error names all of them at once.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, MailError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut problems = Vec::new();

        let server = required(&lookup, "IMAP_SERVER", &mut problems);
        let port = port(&lookup, "IMAP_PORT", DEFAULT_IMAP_PORT, &mut problems);
        let username = required(&lookup, "IMAP_USERNAME", &mut problems);
        let password = required(&lookup, "IMAP_PASSWORD", &mut problems);

        if !problems.is_empty() {
            return Err(MailError::config(problems));
        }
        Ok(Self {
            server,
            port,
            username,
            password,
        })
    }

    pub fn validate(&self) -> Result<(), MailError> {
        let mut problems = Vec::new();
        if self.server.trim().is_empty() {
            problems.push("IMAP_SERVER".to_string());
        }
        if self.port == 0 {
            problems.push("IMAP_PORT".to_string());
        }
        if self.username.trim().is_empty() {
            problems.push("IMAP_USERNAME".to_string());
        }
        if self.password.is_empty() {
            problems.push("IMAP_PASSWORD".to_string());
        }
        if problems.is_empty() {
            Ok(())
        } else {
            Err(MailError::config(problems))
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct SmtpConfig {
    pub server: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub sender_email: String,
    pub use_tls: bool,
}

impl fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("server", &self.server)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("sender_email", &self.sender_email)
            .field("use_tls", &self.use_tls)
            .finish()
    }
}

impl SmtpConfig {
    pub fn from_env(imap: &ImapConfig) -> Result<Self, MailError> {
        Self::from_lookup(imap, |key| env::var(key).ok())
    }

    /// SMTP settings default to values derived from the IMAP account:
    /// server guessed from the IMAP host, credentials and sender reused.
    pub fn from_lookup<F>(imap: &ImapConfig, lookup: F) -> Result<Self, MailError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut problems = Vec::new();

        let server = non_empty(&lookup, "SMTP_SERVER").unwrap_or_else(|| smtp_host_for(&imap.server));
        if server.is_empty() {
            problems.push("SMTP_SERVER".to_string());
        }
        let port = port(&lookup, "SMTP_PORT", DEFAULT_SMTP_PORT, &mut problems);
        let username = non_empty(&lookup, "SMTP_USERNAME").unwrap_or_else(|| imap.username.clone());
        let password = non_empty(&lookup, "SMTP_PASSWORD").unwrap_or_else(|| imap.password.clone());
        let sender_email =
            non_empty(&lookup, "SMTP_SENDER_EMAIL").unwrap_or_else(|| imap.username.clone());
        let use_tls = match non_empty(&lookup, "SMTP_USE_TLS") {
            None => true,
            Some(v) => match v.to_lowercase().as_str() {
                "true" | "1" | "yes" => true,
                "false" | "0" | "no" => false,
                _ => {
                    problems.push(format!("SMTP_USE_TLS (not a boolean: {v})"));
                    true
                }
            },
        };

        if !problems.is_empty() {
            return Err(MailError::config(problems));
        }
        Ok(Self {
            server,
            port,
            username,
            password,
            sender_email,
            use_tls,
        })
    }
}

/// Best guess at the submission host for a given IMAP host.
pub fn smtp_host_for(imap_server: &str) -> String {
    let lower = imap_server.to_lowercase();
    if lower.contains("gmail") {
        "smtp.gmail.com".to_string()
    } else if lower.contains("outlook") || lower.contains("hotmail") {
        "smtp-mail.outlook.com".to_string()
    } else if lower.contains("yahoo") {
        "smtp.mail.yahoo.com".to_string()
    } else {
        imap_server.replace("imap", "smtp")
    }
}

fn non_empty<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required<F>(lookup: &F, key: &str, problems: &mut Vec<String>) -> String
where
    F: Fn(&str) -> Option<String>,
{
    match non_empty(lookup, key) {
        Some(v) => v,
        None => {
            problems.push(key.to_string());
            String::new()
        }
    }
}

fn port<F>(lookup: &F, key: &str, default: u16, problems: &mut Vec<String>) -> u16
where
    F: Fn(&str) -> Option<String>,
{
    match non_empty(lookup, key) {
        None => default,
        Some(raw) => match raw.parse::<u16>() {
            Ok(p) if p > 0 => p,
            _ => {
                problems.push(format!("{key} (invalid port: {raw})"));
                default
            }
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn source(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn imap() -> ImapConfig {
        ImapConfig::from_lookup(source(&[
            ("IMAP_SERVER", "imap.gmail.com"),
            ("IMAP_USERNAME", "me@gmail.com"),
            ("IMAP_PASSWORD", "secret"),
        ]))
        .unwrap()
    }

    #[test]
    fn imap_defaults_port() {
        let cfg = imap();
        assert_eq!(cfg.port, DEFAULT_IMAP_PORT);
        assert_eq!(cfg.server, "imap.gmail.com");
    }

    #[test]
    fn imap_reports_all_missing_fields() {
        let err = ImapConfig::from_lookup(source(&[("IMAP_PORT", "abc")])).unwrap_err();
        match err {
            MailError::Config(fields) => assert_eq!(
                fields,
                [
                    "IMAP_SERVER",
                    "IMAP_PORT (invalid port: abc)",
                    "IMAP_USERNAME",
                    "IMAP_PASSWORD"
                ]
            ),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn debug_hides_password() {
        let printed = format!("{:?}", imap());
        assert!(!printed.contains("secret"));
    }

    #[test]
    fn validate_catches_blank_fields() {
        let mut cfg = imap();
        cfg.server = " ".into();
        cfg.password.clear();
        let err = cfg.validate().unwrap_err();
        assert!(matches!(err, MailError::Config(ref f) if f.len() == 2));
    }

    #[test]
    fn smtp_falls_back_to_imap_account() {
        let smtp = SmtpConfig::from_lookup(&imap(), source(&[])).unwrap();
        assert_eq!(smtp.server, "smtp.gmail.com");
        assert_eq!(smtp.port, DEFAULT_SMTP_PORT);
        assert_eq!(smtp.username, "me@gmail.com");
        assert_eq!(smtp.sender_email, "me@gmail.com");
        assert!(smtp.use_tls);
    }

    #[test]
    fn smtp_rejects_bad_tls_flag() {
        let err = SmtpConfig::from_lookup(&imap(), source(&[("SMTP_USE_TLS", "maybe")]));
        assert!(matches!(err, Err(MailError::Config(_))));
    }

    #[test]
    fn smtp_host_guesses() {
        assert_eq!(smtp_host_for("outlook.office365.com"), "smtp-mail.outlook.com");
        assert_eq!(smtp_host_for("imap.mail.yahoo.com"), "smtp.mail.yahoo.com");
        assert_eq!(smtp_host_for("imap.example.org"), "smtp.example.org");
    }
}
