//! Shared helper functions for CLI commands

/// Format a length in nm; NaN (unmeasured) prints as "n/a"
pub fn format_nm(value: f64, decimals: usize) -> String {
    if value.is_nan() {
        "n/a".to_string()
    } else {
        format!("{:.*}", decimals, value)
    }
}

/// Format a signed length in nm with an explicit sign
pub fn format_signed_nm(value: f64, decimals: usize) -> String {
    if value.is_nan() {
        "n/a".to_string()
    } else {
        format!("{:+.*}", decimals, value)
    }
}

/// Truncate a string to max_len, adding "..." if truncated
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Parse `START,END` (or `START:END`) into a pair; used as a clap value parser
pub fn parse_range(s: &str) -> Result<(f64, f64), String> {
    let (start, end) = s
        .split_once(',')
        .or_else(|| s.split_once(':'))
        .ok_or_else(|| format!("expected START,END but got '{}'", s))?;
    let start: f64 = start
        .trim()
        .parse()
        .map_err(|_| format!("invalid range start '{}'", start.trim()))?;
    let end: f64 = end
        .trim()
        .parse()
        .map_err(|_| format!("invalid range end '{}'", end.trim()))?;
    Ok((start, end))
}
