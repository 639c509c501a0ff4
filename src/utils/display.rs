//! Terminal display utilities.

use terminal_size::terminal_size;
use unicode_width::UnicodeWidthStr;

/// Default width when terminal size cannot be determined.
const DEFAULT_WIDTH: usize = 100;

/// Get the current terminal width in characters.
pub fn terminal_width() -> usize {
    terminal_size()
        .map(|(w, _)| w.0 as usize)
        .unwrap_or(DEFAULT_WIDTH)
}

/// Wrap text at word boundaries so that no line exceeds `max_width` columns.
///
/// Width is measured with `unicode-width`, so wide characters count double.
/// Words longer than `max_width` are placed on a line of their own rather than
/// split. Existing whitespace, including newlines, is collapsed.
///
/// # Examples
///
/// ```
/// use pdb_gpt::utils::wrap_text;
///
/// let lines = wrap_text("the quick brown fox", 10);
/// assert_eq!(lines, vec!["the quick", "brown fox"]);
/// ```
pub fn wrap_text(text: &str, max_width: usize) -> Vec<String> {
    let max_width = max_width.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_width = 0;

    for word in text.split_whitespace() {
        let word_width = UnicodeWidthStr::width(word);

        if current.is_empty() {
            current.push_str(word);
            current_width = word_width;
        } else if current_width + 1 + word_width <= max_width {
            current.push(' ');
            current.push_str(word);
            current_width += 1 + word_width;
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
            current_width = word_width;
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }

    lines
}
