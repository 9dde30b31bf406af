use std::env;
use std::sync::Arc;

use nimbus_domain::{DraftEmail, ImapConfig, SmtpConfig};
use nimbus_error::{ErrorResponse, MailError, Outcome};
use nimbus_imap::{ImapMailbox, SmtpSender};
use nimbus_mailbox::format::{format_catalog, format_emails, to_json, Format};
use nimbus_mailbox::MailService;
use serde::Serialize;
use tracing::{error, info};

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("nimbus=info")),
        )
        .compact()
        .init();
}

#[derive(Debug, Default)]
struct Args {
    positional: Vec<String>,
    all: bool,
    json: bool,
    format: Option<String>,
}

fn parse_args(mut raw: impl Iterator<Item = String>) -> Args {
    let mut args = Args::default();
    while let Some(arg) = raw.next() {
        match arg.as_str() {
            "--all" => args.all = true,
            "--json" => args.json = true,
            "--format" => args.format = raw.next(),
            _ => args.positional.push(arg),
        }
    }
    args
}

fn build_service() -> Result<MailService, MailError> {
    let imap = ImapConfig::from_env()?;
    let smtp = SmtpConfig::from_env(&imap);
    let mut service = MailService::new(Arc::new(ImapMailbox::tls(imap)));
    match smtp {
        Ok(cfg) => {
            service = service.with_sender(Arc::new(SmtpSender::new(cfg)));
            info!("smtp configured");
        }
        Err(e) => info!("smtp not configured: {e}"),
    }
    Ok(service)
}

/// Print a command result. `--json` prints the tagged envelope on stdout;
/// otherwise text goes to stdout and failures to stderr.
fn report<T, F>(result: Result<T, MailError>, context: &str, json: bool, render: F) -> bool
where
    T: Serialize,
    F: FnOnce(&T) -> String,
{
    let ok = result.is_ok();
    if json {
        println!("{}", to_json(&Outcome::from_result(result, context)));
        return ok;
    }
    match result {
        Ok(value) => println!("{}", render(&value)),
        Err(e) => eprintln!("{}", ErrorResponse::from(&e).with_context(context).to_compact()),
    }
    ok
}

fn arg<'a>(args: &'a Args, idx: usize, name: &str) -> Result<&'a str, MailError> {
    args.positional
        .get(idx)
        .map(String::as_str)
        .ok_or_else(|| MailError::invalid_input(format!("missing <{name}>")))
}

async fn run(cmd: &str, args: &Args, service: &MailService) -> bool {
    let fmt = Format::parse(args.format.as_deref());
    match cmd {
        "folders" => {
            let result = service.list_folders(args.all).await;
            report(result, "could not list folders", args.json, |c| {
                format_catalog(c, fmt)
            })
        }
        "emails" => {
            let folder = args.positional.first().cloned().unwrap_or_default();
            let result = async {
                let limit = match args.positional.get(1) {
                    Some(n) => n
                        .parse()
                        .map_err(|_| MailError::invalid_input(format!("limit must be a number: {n}")))?,
                    None => 0,
                };
                service.fetch_messages(&folder, limit).await
            }
            .await;
            report(result, "could not load emails", args.json, |e| {
                format_emails(&folder, e, fmt)
            })
        }
        "raw" => {
            let result = async {
                let folder = arg(args, 0, "folder")?;
                let id = arg(args, 1, "id")?;
                service.fetch_raw(folder, id).await
            }
            .await;
            report(result, "could not load message", args.json, String::clone)
        }
        "move" => {
            let result = async {
                let folder = arg(args, 0, "folder")?;
                let id = arg(args, 1, "id")?;
                let to = arg(args, 2, "to")?;
                service.move_email(folder, id, to).await?;
                Ok(format!("moved message {id} from {folder} to {to}"))
            }
            .await;
            report(result, "could not move message", args.json, String::clone)
        }
        "send" => {
            let result = async {
                let draft = DraftEmail {
                    to: arg(args, 0, "to")?.to_string(),
                    subject: args.positional.get(1).cloned().unwrap_or_default(),
                    body: args.positional.get(2).cloned().unwrap_or_default(),
                    ..Default::default()
                };
                service.send(&draft).await
            }
            .await;
            report(result, "could not send email", args.json, |r| r.message.clone())
        }
        unknown => {
            eprintln!("Unknown command: {unknown}");
            eprintln!("Run `nimbus help` for usage");
            false
        }
    }
}

fn print_help() {
    eprintln!("Nimbus: IMAP mailbox reader");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  nimbus folders [--all]              List mail folders (--all includes hidden)");
    eprintln!("  nimbus emails <folder> [limit]      Most recent emails, newest first (default 50, max 200)");
    eprintln!("  nimbus raw <folder> <id>            Raw source of one message");
    eprintln!("  nimbus move <folder> <id> <to>      Move one message to another folder");
    eprintln!("  nimbus send <to> [subject] [body]   Send a plain-text email");
    eprintln!("  nimbus help                         Show this help");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --json                Print a {{success, data | error}} JSON envelope");
    eprintln!("  --format full         Print results as bare JSON");
    eprintln!();
    eprintln!("Environment variables:");
    eprintln!("  IMAP_SERVER           IMAP host");
    eprintln!("  IMAP_PORT             IMAP port (default: 993)");
    eprintln!("  IMAP_USERNAME         Login name");
    eprintln!("  IMAP_PASSWORD         Password or app password");
    eprintln!("  SMTP_SERVER           SMTP host (default: derived from IMAP_SERVER)");
    eprintln!("  SMTP_PORT             SMTP port (default: 587)");
    eprintln!("  SMTP_USERNAME         SMTP login (default: IMAP_USERNAME)");
    eprintln!("  SMTP_PASSWORD         SMTP password (default: IMAP_PASSWORD)");
    eprintln!("  SMTP_SENDER_EMAIL     From address (default: IMAP_USERNAME)");
    eprintln!("  SMTP_USE_TLS          STARTTLS on/off (default: true)");
    eprintln!("  RUST_LOG              Log level (default: nimbus=info)");
}

#[tokio::main]
async fn main() {
    init_tracing();

    let mut argv = env::args().skip(1);
    let cmd = argv.next().unwrap_or_else(|| "help".to_string());
    if matches!(cmd.as_str(), "help" | "--help" | "-h") {
        print_help();
        return;
    }
    let args = parse_args(argv);

    let service = match build_service() {
        Ok(s) => s,
        Err(e) => {
            error!(%e, "startup failed");
            eprintln!("{}", ErrorResponse::from(&e).to_compact());
            std::process::exit(1);
        }
    };

    if cmd != "send" {
        if let Err(e) = service.connect().await {
            error!(%e, "connect failed");
            report::<(), _>(Err(e), "could not connect", args.json, |_| String::new());
            std::process::exit(1);
        }
    }

    let ok = run(&cmd, &args, &service).await;
    service.disconnect().await;
    if !ok {
        std::process::exit(1);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Args {
        parse_args(list.iter().map(|s| s.to_string()))
    }

    #[test]
    fn flags_and_positionals() {
        let a = args(&["INBOX", "--json", "20", "--format", "full", "--all"]);
        assert_eq!(a.positional, ["INBOX", "20"]);
        assert!(a.json);
        assert!(a.all);
        assert_eq!(a.format.as_deref(), Some("full"));
    }

    #[test]
    fn move_takes_three_positionals() {
        let a = args(&["INBOX", "4", "Archive"]);
        assert_eq!(arg(&a, 2, "to").unwrap(), "Archive");
        assert!(matches!(arg(&a, 3, "to"), Err(MailError::InvalidInput(_))));
    }

    #[test]
    fn missing_positional_is_invalid_input() {
        let a = args(&[]);
        assert!(matches!(arg(&a, 0, "folder"), Err(MailError::InvalidInput(_))));
    }
}
