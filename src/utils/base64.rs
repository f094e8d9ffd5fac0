use anyhow::{bail, Result};
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;

/// Validate base64 torrent-file data and repair common transport damage
/// (embedded whitespace, stripped padding, URL-safe alphabets) before it is
/// forwarded to the daemon. Returns the cleaned standard-alphabet string,
/// or an error if the input is not base64 at all.
pub fn normalize_base64(data: &str) -> Result<String> {
    let cleaned: String = data.split_whitespace().collect();

    if STANDARD.decode(&cleaned).is_ok() {
        return Ok(cleaned);
    }

    let padded = with_padding(&cleaned);
    if STANDARD.decode(&padded).is_ok() {
        return Ok(padded);
    }

    // URL-safe payloads get converted to the standard alphabet the daemon
    // expects.
    if URL_SAFE_NO_PAD
        .decode(cleaned.trim_end_matches('='))
        .is_ok()
    {
        let converted = with_padding(&cleaned.replace('-', "+").replace('_', "/"));
        if STANDARD.decode(&converted).is_ok() {
            return Ok(converted);
        }
    }

    bail!("invalid base64 torrent data")
}

fn with_padding(data: &str) -> String {
    match data.len() % 4 {
        2 => format!("{}==", data),
        3 => format!("{}=", data),
        _ => data.to_string(),
    }
}
