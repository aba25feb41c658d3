//! Log-safe rendering of player-supplied names.
//!
//! Player ids and home names end up inside log lines. A name containing a newline
//! could forge a second log entry, so names are rendered through [`escape_log`].

use std::fmt::{self, Write};

/// Longest name prefix (in chars) that is rendered before eliding the rest.
pub const MAX_NAME_CHARS: usize = 64;

/// Borrowed view of a name that formats on a single line.
///
/// Control characters and backslashes use Rust's `escape_default` forms (`\n`,
/// `\u{7}`); everything else, including non-ASCII letters, is written as is.
#[derive(Debug, Clone, Copy)]
pub struct LogName<'a>(&'a str);

/// Wrap a player-supplied name for use in a log format string.
pub fn escape_log(name: &str) -> LogName<'_> {
    LogName(name)
}

impl fmt::Display for LogName<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut chars = self.0.chars();
        for ch in chars.by_ref().take(MAX_NAME_CHARS) {
            if ch == '\\' || ch.is_control() {
                for escaped in ch.escape_default() {
                    f.write_char(escaped)?;
                }
            } else {
                f.write_char(ch)?;
            }
        }
        let rest = chars.count();
        if rest > 0 {
            write!(f, "…(+{})", rest)?;
        }
        Ok(())
    }
}
