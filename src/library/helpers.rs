//! Various small helper functions

use std::num::ParseIntError;
use std::time::Duration;

/// Parses a Duration from a string containing seconds.
/// Useful for command line parsing
pub fn parse_seconds(src: &str) -> Result<Duration, ParseIntError> {
    let seconds = src.parse::<u64>()?;
    Ok(Duration::from_secs(seconds))
}

/// Strips an optional `Bearer ` scheme from an authorization value and discards empty tokens
pub fn bare_token(token: Option<&str>) -> Option<String> {
    let token = token?.trim_start();
    let token = token.strip_prefix("Bearer ").unwrap_or(token).trim();

    if token.is_empty() {
        None
    } else {
        Some(token.to_owned())
    }
}
