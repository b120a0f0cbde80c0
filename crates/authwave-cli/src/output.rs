//! Output formatting helpers.
//!
//! Results go to stdout; progress and status lines go to stderr so that
//! response bodies can be piped.

use anyhow::Result;
use colored::Colorize;
use serde_json::Value;

const LABEL_WIDTH: usize = 12;

/// Print a success message.
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a dimmed progress note to stderr.
pub fn progress(msg: &str) {
    eprintln!("{}", msg.dimmed());
}

/// Print a labeled field, labels right-aligned.
pub fn field(label: &str, value: &str) {
    let label = format!("{:>width$}:", label, width = LABEL_WIDTH);
    println!("{} {}", label.dimmed(), value);
}

/// Print a response status line to stderr, colored by class.
pub fn status(code: u16, reason: Option<&str>) {
    let line = match reason {
        Some(reason) => format!("{} {}", code, reason),
        None => code.to_string(),
    };
    let line = match code {
        200..=299 => line.green(),
        400..=599 => line.red(),
        _ => line.yellow(),
    };
    eprintln!("{}", line);
}

/// Print a JSON body, pretty unless `compact`.
pub fn body(value: &Value, compact: bool) -> Result<()> {
    let json = if compact {
        serde_json::to_string(value)?
    } else {
        serde_json::to_string_pretty(value)?
    };
    println!("{}", json);
    Ok(())
}
