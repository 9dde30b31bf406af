use tracing::debug;

/// Decode RFC 2047 encoded-words in `raw`. All or nothing: if any word
/// cannot be decoded the raw value comes back untouched.
pub fn decode_header(raw: Option<&str>) -> Option<String> {
    let raw = raw?;
    let words = encoded_words(raw);
    if words.is_empty() {
        return Some(raw.to_string());
    }

    let unfolded = unfold(raw);
    let fake = format!("X: {unfolded}");
    let decoded = match mailparse::parse_header(fake.as_bytes()) {
        Ok((hdr, _)) => hdr.get_value(),
        Err(e) => {
            debug!(raw, "header parse failed: {e}");
            return Some(raw.to_string());
        }
    };

    if words.iter().any(|w| decoded.contains(w)) {
        debug!(raw, "undecodable encoded-word, keeping raw header");
        return Some(raw.to_string());
    }
    Some(decoded)
}

/// Join folded header lines (RFC 5322 section 2.2.3).
pub fn unfold(value: &str) -> String {
    value.replace("\r\n", "").replace('\n', "")
}

fn encoded_words(s: &str) -> Vec<&str> {
    let mut found = Vec::new();
    let mut rest = s;
    while let Some(start) = rest.find("=?") {
        let candidate = &rest[start..];
        match encoded_word_len(candidate) {
            Some(len) => {
                found.push(&candidate[..len]);
                rest = &candidate[len..];
            }
            None => rest = &candidate[2..],
        }
    }
    found
}

// =?charset?B|Q?text?=
fn encoded_word_len(s: &str) -> Option<usize> {
    let body = s.strip_prefix("=?")?;
    let (charset, after) = body.split_once('?')?;
    if charset.is_empty() || charset.contains(char::is_whitespace) {
        return None;
    }
    let (encoding, after) = after.split_once('?')?;
    if !matches!(encoding, "B" | "b" | "Q" | "q") {
        return None;
    }
    let end = after.find("?=")?;
    if after[..end].contains(char::is_whitespace) {
        return None;
    }
    Some(2 + charset.len() + 1 + encoding.len() + 1 + end + 2)
}
