//! Recipient normalization
//!
//! Rewrites caller supplied numbers into the bare international form the
//! upstream gateway expects (country code followed by subscriber number,
//! digits only).

/// Minimum digits in an international number
pub const MIN_RECIPIENT_DIGITS: usize = 10;

/// Maximum digits in an international number (E.164)
pub const MAX_RECIPIENT_DIGITS: usize = 15;

/// Normalize a recipient
///
/// - local numbers starting with `0` get the `0` replaced by `country_code`
/// - `+`-prefixed numbers lose the `+`
/// - anything else passes through unchanged
pub fn normalize_recipient(raw: &str, country_code: &str) -> String {
    let trimmed = raw.trim();
    if let Some(local) = trimmed.strip_prefix('0') {
        format!("{}{}", country_code, local)
    } else if let Some(international) = trimmed.strip_prefix('+') {
        international.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Check the bare international numeric format
pub fn is_international_format(recipient: &str) -> bool {
    (MIN_RECIPIENT_DIGITS..=MAX_RECIPIENT_DIGITS).contains(&recipient.len())
        && recipient.bytes().all(|b| b.is_ascii_digit())
        && !recipient.starts_with('0')
}
