//! Read-only statement guard
//!
//! The generation prompt asks the model for SELECT-only SQL, but prompt text
//! is not enforcement. Every statement passes through here before it touches
//! the database.

use insightiq_core::StoreError;

/// Verify `sql` is a single read-only statement.
///
/// Accepts one `SELECT ...` or `WITH ... SELECT ...` statement, optionally
/// terminated by a single trailing semicolon. Leading whitespace and SQL
/// comments are skipped before the keyword check. Anything else - mutating
/// keywords, multiple statements - is rejected with `StoreError::NotReadOnly`.
pub fn ensure_read_only(sql: &str) -> Result<(), StoreError> {
    let body = strip_leading_comments(sql.trim());

    let keyword: String = body
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect::<String>()
        .to_ascii_uppercase();

    if keyword != "SELECT" && keyword != "WITH" {
        return Err(StoreError::NotReadOnly);
    }

    if has_interior_semicolon(body) {
        return Err(StoreError::NotReadOnly);
    }

    Ok(())
}

/// Skip leading `--` line comments and `/* */` block comments.
fn strip_leading_comments(mut s: &str) -> &str {
    loop {
        s = s.trim_start();
        if let Some(rest) = s.strip_prefix("--") {
            s = rest.split_once('\n').map(|(_, after)| after).unwrap_or("");
        } else if let Some(rest) = s.strip_prefix("/*") {
            s = rest.split_once("*/").map(|(_, after)| after).unwrap_or("");
        } else {
            return s;
        }
    }
}

/// Detect a semicolon that separates statements.
///
/// Semicolons inside single-quoted literals or comments do not count. A
/// trailing semicolon (followed only by whitespace and comments) is allowed.
fn has_interior_semicolon(sql: &str) -> bool {
    let bytes = sql.as_bytes();
    let mut in_string = false;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\'' => {
                in_string = !in_string;
                i += 1;
            }
            b'-' if !in_string && bytes.get(i + 1) == Some(&b'-') => {
                i += 2;
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            b'/' if !in_string && bytes.get(i + 1) == Some(&b'*') => {
                i += 2;
                while i + 1 < bytes.len() && !(bytes[i] == b'*' && bytes[i + 1] == b'/') {
                    i += 1;
                }
                i = (i + 2).min(bytes.len());
            }
            b';' if !in_string => {
                if !strip_leading_comments(&sql[i + 1..]).trim().is_empty() {
                    return true;
                }
                i += 1;
            }
            _ => i += 1,
        }
    }
    false
}

// =============================================================================
// TESTS
// =============================================================================
