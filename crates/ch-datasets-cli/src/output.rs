//! Plain-text rendering of repository and dataset listings.

const SEPARATOR: &str = "--------------------------------------------------------";

/// Longest description shown without `--full`.
pub const SHORT_DESCRIPTION: usize = 60;

/// Render records as `column: value` blocks, one block per record, with the
/// column names padded to a common width.
pub fn format_vertical(columns: &[&str], records: &[Vec<String>]) -> String {
    let width = columns.iter().map(|c| c.len()).max().unwrap_or(0);
    let mut out = String::new();
    for record in records {
        out.push_str(SEPARATOR);
        out.push('\n');
        for (column, value) in columns.iter().zip(record) {
            out.push_str(&format!("{:<width$}: {}\n", column, value, width = width));
        }
    }
    out
}

/// Shorten `text` to at most `max` characters, marking the cut with `...`.
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", kept.trim_end())
}
