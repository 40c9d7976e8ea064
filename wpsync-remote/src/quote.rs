//! POSIX shell quoting for remote command lines.

/// Wrap `value` in single quotes, escaping embedded single quotes.
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}
