//! Cell formatting shared by the monitor and the report tools.

/// Truncates a string to `max_len` characters, ending with an ellipsis when
/// anything was cut. Safe on multi-byte input.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    if max_len == 0 {
        return String::new();
    }
    let kept: String = s.chars().take(max_len - 1).collect();
    format!("{kept}…")
}

/// Left-justified text cell.
pub fn cell_text(s: &str, width: usize) -> String {
    format!("{:<width$}", truncate(s, width))
}

/// Right-justified integer cell.
pub fn cell_int(v: f64, width: usize) -> String {
    format!("{:>width$}", v.round() as i64)
}

/// Right-justified one-decimal cell.
pub fn cell_float(v: f64, width: usize) -> String {
    format!("{v:>width$.1}")
}

/// Rate formatting for the report tools: one decimal while the value is
/// small, none once it is wide anyway.
pub fn adaptive(v: f64) -> String {
    if v < 100.0 {
        format!("{v:.1}")
    } else {
        format!("{v:.0}")
    }
}
