//! Validators for string-shaped kinds: email, URL, DNS names, strict text

use url::{Host, Url};

use super::schema::{Modifiers, Schema};
use super::ValidationError;

/// Longest DNS name, in bytes
const MAX_DNS_LEN: usize = 253;
/// Longest DNS label, in bytes
const MAX_LABEL_LEN: usize = 63;

/// Check a `local@domain` address
///
/// Shape only: a non-empty local part, one `@`, a domain with at least one
/// dot, and no whitespace. With [`Modifiers::DNS`] the domain must also be a
/// DNS name.
pub fn email(schema: &Schema, input: &str) -> Result<String, ValidationError> {
    let input = input.trim();
    let mismatch = || ValidationError::TypeMismatch {
        expected: "email address",
    };

    if input.chars().any(char::is_whitespace) {
        return Err(mismatch());
    }
    let (local, domain) = input.rsplit_once('@').ok_or_else(mismatch)?;
    if local.is_empty() || local.contains('@') || domain.is_empty() {
        return Err(mismatch());
    }
    if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
        return Err(mismatch());
    }
    if schema.modifiers().contains(Modifiers::DNS) && !is_dns_name(domain) {
        return Err(mismatch());
    }

    Ok(input.to_string())
}

/// Check an absolute URL with a host; returns the normalized form
pub fn url(schema: &Schema, input: &str) -> Result<String, ValidationError> {
    let mismatch = || ValidationError::TypeMismatch { expected: "URL" };

    let parsed = Url::parse(input.trim()).map_err(|e| {
        tracing::debug!("URL rejected: {}", e);
        mismatch()
    })?;

    let host = parsed.host().ok_or_else(mismatch)?;
    if schema.modifiers().contains(Modifiers::DNS) {
        match host {
            Host::Domain(name) if is_dns_name(name) => {},
            _ => return Err(mismatch()),
        }
    }

    Ok(parsed.into())
}

/// Labels of 1..=63 letters, digits or hyphens, no hyphen at either end,
/// at least two labels, 253 bytes overall
pub fn is_dns_name(name: &str) -> bool {
    let name = name.strip_suffix('.').unwrap_or(name);
    if name.is_empty() || name.len() > MAX_DNS_LEN {
        return false;
    }

    let mut labels = 0;
    for label in name.split('.') {
        let valid = !label.is_empty()
            && label.len() <= MAX_LABEL_LEN
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-');
        if !valid {
            return false;
        }
        labels += 1;
    }
    labels >= 2
}

/// Code points refused under [`Modifiers::STRICT_STRING`]
///
/// Control characters plus the invisible formatting characters that can
/// disguise text: zero-width marks, directional overrides and isolates, line
/// and paragraph separators, and the byte order mark.
pub fn is_disallowed(c: char) -> bool {
    c.is_control()
        || matches!(
            c,
            '\u{200B}'..='\u{200F}'
                | '\u{2028}'..='\u{2029}'
                | '\u{202A}'..='\u{202E}'
                | '\u{2066}'..='\u{2069}'
                | '\u{FEFF}'
        )
}
