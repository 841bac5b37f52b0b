// Clipboard export for transcript replies and cached payloads
//
// The clipboard handle is opened per call rather than held for the process
// lifetime; on Linux a long-lived handle keeps a display connection open.

use anyhow::{Context, Result};
use arboard::Clipboard;

/// Put `text` on the system clipboard, normalized for pasting.
///
/// Fails on headless systems with no display server.
pub fn copy_to_clipboard(text: &str) -> Result<()> {
    let mut clipboard = Clipboard::new().context("Failed to access clipboard")?;
    clipboard
        .set_text(normalize(text))
        .context("Failed to set clipboard text")?;
    Ok(())
}

/// Trailing blank lines and spaces come from markdown rendering and table
/// padding; pasting them into an email or CRM note field looks broken.
fn normalize(text: &str) -> String {
    let trimmed = text.trim_end();
    if trimmed.is_empty() {
        return String::new();
    }
    let mut out: String = trimmed
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n");
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_trailing_blank_lines() {
        assert_eq!(normalize("reply text\n\n\n"), "reply text\n");
    }

    #[test]
    fn test_normalize_strips_per_line_padding() {
        assert_eq!(normalize("line one   \nline two  "), "line one\nline two\n");
    }

    #[test]
    fn test_normalize_empty_input() {
        assert_eq!(normalize("   \n  \n"), "");
    }
}
