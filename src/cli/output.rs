//! Output formatting utilities

use crate::cli::OutputFormat;

/// Determine the effective output format based on context
pub fn effective_format(format: OutputFormat, is_grid: bool) -> OutputFormat {
    match format {
        OutputFormat::Auto => {
            if is_grid {
                OutputFormat::Table
            } else {
                OutputFormat::Text
            }
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_resolves_by_context() {
        assert_eq!(effective_format(OutputFormat::Auto, true), OutputFormat::Table);
        assert_eq!(effective_format(OutputFormat::Auto, false), OutputFormat::Text);
        assert_eq!(effective_format(OutputFormat::Json, true), OutputFormat::Json);
    }
}
