//! CLI subcommand implementations.

pub mod catalog;
pub mod compose;
pub mod sessions;
pub mod show;

/// Shortens `text` to `width` characters, ending in `...` when cut.
///
/// Counts characters, not bytes, so multi-byte names never split.
pub(crate) fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() > width {
        let kept: String = text.chars().take(width.saturating_sub(3)).collect();
        format!("{kept}...")
    } else {
        text.to_string()
    }
}

/// Joins table rows, dropping the padding after the last column.
pub(crate) fn render_lines(lines: &[String]) -> String {
    let mut output = String::new();
    for line in lines {
        output.push_str(line.trim_end());
        output.push('\n');
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_counts_characters() {
        assert_eq!(truncate("Étude in C", 20), "Étude in C");
        assert_eq!(truncate("Études symphoniques", 10), "Études ...");
    }

    #[test]
    fn render_lines_trims_row_padding() {
        let lines = vec!["a   ".to_string(), String::new(), "b".to_string()];
        assert_eq!(render_lines(&lines), "a\n\nb\n");
    }
}
