use mailparse::{MailHeaderMap, ParsedMail};
use nimbus_domain::{Email, EmailParts, Parsed};
use tracing::debug;

use crate::header::{decode_header, unfold};

/// Build the canonical [`Email`] for one raw RFC 822 message.
///
/// In a multipart message the first `text/plain` part becomes the body and
/// the first `text/html` part the HTML body, independently. A single-part
/// message is decoded with its declared charset, or as UTF-8 when none is
/// declared; undecodable bytes are replaced rather than rejected.
pub fn parse_message(id: &str, raw: &[u8]) -> Parsed<Email> {
    let parsed = match mailparse::parse_mail(raw) {
        Ok(p) => p,
        Err(e) => return Parsed::skipped(format!("message {id}: {e}")),
    };

    let (text_body, html_body) = extract_bodies(&parsed);

    Parsed::Value(Email::new(EmailParts {
        id: id.to_string(),
        from: header(&parsed, "From").unwrap_or_default(),
        to: header(&parsed, "To").unwrap_or_default(),
        subject: header(&parsed, "Subject").unwrap_or_default(),
        date: header(&parsed, "Date").unwrap_or_default(),
        content_type: header(&parsed, "Content-Type").unwrap_or_default(),
        text_body,
        html_body,
    }))
}

/// The HTML part of a raw message, if it has one.
pub fn html_part(raw: &[u8]) -> Option<String> {
    let parsed = mailparse::parse_mail(raw).ok()?;
    extract_bodies(&parsed).1
}

fn header(parsed: &ParsedMail<'_>, key: &str) -> Option<String> {
    let headers = parsed.get_headers();
    let hdr = headers.get_first_header(key)?;
    let raw = String::from_utf8_lossy(hdr.get_value_raw());
    decode_header(Some(unfold(&raw).trim()))
}

fn extract_bodies(parsed: &ParsedMail<'_>) -> (Option<String>, Option<String>) {
    let mut text = None;
    let mut html = None;

    if parsed.ctype.mimetype.starts_with("multipart/") {
        walk_parts(parsed, &mut text, &mut html);
    } else {
        let decoded = decode_part(parsed).filter(|b| !b.is_empty());
        if parsed.ctype.mimetype == "text/html" {
            html = decoded.clone();
        }
        text = decoded;
    }
    (text, html)
}

fn walk_parts(part: &ParsedMail<'_>, text: &mut Option<String>, html: &mut Option<String>) {
    if !part.subparts.is_empty() {
        for sub in &part.subparts {
            walk_parts(sub, text, html);
        }
        return;
    }
    match part.ctype.mimetype.as_str() {
        "text/plain" if text.is_none() => *text = decode_part(part),
        "text/html" if html.is_none() => *html = decode_part(part),
        _ => {}
    }
}

fn decode_part(part: &ParsedMail<'_>) -> Option<String> {
    // Undeclared charset reads as UTF-8, not mailparse's us-ascii default.
    if part.ctype.params.contains_key("charset") {
        match part.get_body() {
            Ok(body) => return Some(body),
            Err(e) => debug!(charset = %part.ctype.charset, "charset decode failed: {e}"),
        }
    }
    match part.get_body_raw() {
        Ok(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
        Err(e) => {
            debug!(mimetype = %part.ctype.mimetype, "transfer decode failed: {e}");
            None
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use nimbus_domain::NO_SUBJECT;

    use super::*;

    fn parse(raw: &[u8]) -> Email {
        parse_message("1", raw).value().unwrap()
    }

    #[test]
    fn plain_message_with_encoded_subject() {
        let email = parse(
            b"From: =?UTF-8?Q?Jos=C3=A9?= <jose@example.com>\r\n\
To: me@example.com\r\n\
Subject: =?UTF-8?B?SGVsbG8gV29ybGQ=?=\r\n\
Date: Mon, 1 Jan 2024 10:00:00 +0000\r\n\
Content-Type: text/plain; charset=utf-8\r\n\
\r\n\
Line one\r\nLine two\r\n",
        );
        assert_eq!(email.id(), "1");
        assert_eq!(email.from(), "José <jose@example.com>");
        assert_eq!(email.to(), "me@example.com");
        assert_eq!(email.subject(), "Hello World");
        assert_eq!(email.date(), "Mon, 1 Jan 2024 10:00:00 +0000");
        assert_eq!(email.content_type(), "text/plain; charset=utf-8");
        assert_eq!(email.body().map(str::trim), Some("Line one\r\nLine two"));
        assert_eq!(email.html_body(), None);
        assert_eq!(email.preview(), "Line one  Line two");
    }

    #[test]
    fn alternative_keeps_both_bodies() {
        let email = parse(
            b"Subject: Both\r\n\
Content-Type: multipart/alternative; boundary=\"b1\"\r\n\
\r\n\
--b1\r\n\
Content-Type: text/plain; charset=utf-8\r\n\
\r\n\
Plain version\r\n\
--b1\r\n\
Content-Type: text/html; charset=utf-8\r\n\
\r\n\
<p>HTML version</p>\r\n\
--b1--\r\n",
        );
        assert_eq!(email.body().map(str::trim), Some("Plain version"));
        assert_eq!(email.html_body().map(str::trim), Some("<p>HTML version</p>"));
        assert_eq!(email.preview(), "Plain version");
    }

    #[test]
    fn html_only_multipart_fills_body() {
        let html = format!("<div>{}</div>", "word ".repeat(60));
        let raw = format!(
            "Subject: Promo\r\n\
Content-Type: multipart/mixed; boundary=\"zz\"\r\n\
\r\n\
--zz\r\n\
Content-Type: text/html; charset=utf-8\r\n\
\r\n\
{html}\r\n\
--zz--\r\n"
        );
        let email = parse(raw.as_bytes());
        assert_eq!(email.body(), email.html_body());
        assert!(email.body().unwrap().contains("<div>word"));
        assert!(email.preview().chars().count() <= 153);
        assert!(email.preview().ends_with("..."));
    }

    #[test]
    fn nested_parts_take_first_of_each_type() {
        let email = parse(
            b"Subject: Nested\r\n\
Content-Type: multipart/mixed; boundary=\"outer\"\r\n\
\r\n\
--outer\r\n\
Content-Type: multipart/alternative; boundary=\"inner\"\r\n\
\r\n\
--inner\r\n\
Content-Type: text/plain; charset=utf-8\r\n\
Content-Transfer-Encoding: quoted-printable\r\n\
\r\n\
Caf=C3=A9 first\r\n\
--inner\r\n\
Content-Type: text/html; charset=utf-8\r\n\
\r\n\
<b>first</b>\r\n\
--inner--\r\n\
--outer\r\n\
Content-Type: text/plain; charset=utf-8\r\n\
\r\n\
second\r\n\
--outer--\r\n",
        );
        assert_eq!(email.body().map(str::trim), Some("Café first"));
        assert_eq!(email.html_body().map(str::trim), Some("<b>first</b>"));
    }

    #[test]
    fn missing_subject_substituted() {
        let email = parse(b"From: a@example.com\r\n\r\nhi\r\n");
        assert_eq!(email.subject(), NO_SUBJECT);
        let email = parse(b"Subject:   \r\n\r\nhi\r\n");
        assert_eq!(email.subject(), NO_SUBJECT);
    }

    #[test]
    fn single_part_html_goes_to_both_fields() {
        let email = parse(b"Content-Type: text/html; charset=utf-8\r\n\r\n<h1>Hi</h1>");
        assert_eq!(email.body(), Some("<h1>Hi</h1>"));
        assert_eq!(email.html_body(), Some("<h1>Hi</h1>"));
    }

    #[test]
    fn declared_latin1_charset() {
        let email = parse(b"Content-Type: text/plain; charset=iso-8859-1\r\n\r\ncaf\xe9");
        assert_eq!(email.body(), Some("café"));
    }

    #[test]
    fn undeclared_charset_reads_utf8() {
        let email = parse("Subject: x\r\n\r\nna\u{ef}ve r\u{e9}sum\u{e9}".as_bytes());
        assert_eq!(email.body(), Some("naïve résumé"));
    }

    #[test]
    fn invalid_bytes_are_replaced() {
        let email = parse(b"Subject: x\r\n\r\nbad \xff\xfe bytes");
        let body = email.body().unwrap();
        assert!(body.starts_with("bad "));
        assert!(body.contains('\u{fffd}'));
    }

    #[test]
    fn unknown_charset_does_not_fail() {
        let email = parse(b"Content-Type: text/plain; charset=x-unheard-of\r\n\r\nplain ascii");
        assert_eq!(email.body(), Some("plain ascii"));
    }

    #[test]
    fn headers_only_message_has_no_body() {
        let email = parse(b"Subject: Empty\r\nFrom: a@example.com\r\n\r\n");
        assert_eq!(email.body(), None);
        assert_eq!(email.html_body(), None);
        assert_eq!(email.preview(), "");
    }

    #[test]
    fn multipart_without_text_parts() {
        let email = parse(
            b"Subject: Attachment only\r\n\
Content-Type: multipart/mixed; boundary=\"q\"\r\n\
\r\n\
--q\r\n\
Content-Type: application/octet-stream\r\n\
Content-Transfer-Encoding: base64\r\n\
\r\n\
AAEC\r\n\
--q--\r\n",
        );
        assert_eq!(email.body(), None);
        assert_eq!(email.html_body(), None);
        assert_eq!(email.preview(), "");
    }

    #[test]
    fn malformed_encoded_subject_kept_raw() {
        let email = parse(b"Subject: =?UTF-8?B?####?=\r\n\r\nbody");
        assert_eq!(email.subject(), "=?UTF-8?B?####?=");
    }

    #[test]
    fn blank_plain_part_falls_back_to_html() {
        let email = parse(
            b"Subject: Promo\r\n\
Content-Type: multipart/alternative; boundary=\"b2\"\r\n\
\r\n\
--b2\r\n\
Content-Type: text/plain; charset=utf-8\r\n\
\r\n\
\r\n\
--b2\r\n\
Content-Type: text/html; charset=utf-8\r\n\
\r\n\
<p>Real content</p>\r\n\
--b2--\r\n",
        );
        assert_eq!(email.body().map(str::trim), Some("<p>Real content</p>"));
        assert_eq!(email.preview(), "<p>Real content</p>");
    }

    #[test]
    fn html_part_extraction() {
        let raw = b"Content-Type: text/html; charset=utf-8\r\n\r\n<p>x</p>";
        assert_eq!(html_part(raw).as_deref(), Some("<p>x</p>"));
        assert_eq!(html_part(b"Subject: y\r\n\r\nplain"), None);
    }
}
