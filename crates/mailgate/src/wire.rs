//! SMTP transparency (RFC 5321 §4.5.2).
//!
//! A line holding a single `.` ends the DATA phase, so every line that starts
//! with `.` is sent with one more. The receiver strips exactly one leading dot
//! from each line, which makes this transform non-idempotent: it must run
//! once, on the final rendered message.

/// Doubles the leading `.` of every line. Dots elsewhere are untouched.
#[must_use]
pub fn escape_body(body: &str) -> String {
    let extra = body.match_indices("\n.").count() + usize::from(body.starts_with('.'));
    let mut escaped = String::with_capacity(body.len() + extra);

    let mut at_line_start = true;
    for c in body.chars() {
        if at_line_start && c == '.' {
            escaped.push('.');
        }
        escaped.push(c);
        at_line_start = c == '\n';
    }

    escaped
}
