//! Terminal visualization using braille graphics
//!
//! Latent-image cross-sections are drawn with braille dots; process windows
//! are drawn as a character grid.

use drawille::Canvas;

use crate::core::ProcessWindowResult;

/// Default canvas size for profile plots (dots)
pub const PROFILE_WIDTH: u32 = 120;
pub const PROFILE_HEIGHT: u32 = 32;

/// Plot a 1D profile against a horizontal threshold line
///
/// # Example Output
/// ```text
/// Latent image cross-section (acid/nm²):
/// ⠀⠀⡔⠢⡀⠀⠀⢀⠔⠢⡀⠀⠀⢀⠔⠢
/// ⠒⠚⠒⠒⠚⠒⠒⠚⠒⠒⠚⠒⠒⠚⠒⠒
/// ⠔⠁⠀⠀⠈⠢⠔⠁⠀⠀⠈⠢⠔⠁⠀⠀
///   max=31.2  threshold=20.8
/// ```
pub fn render_profile(title: &str, profile: &[f64], threshold: f64, width: u32, height: u32) -> String {
    if profile.is_empty() {
        return "  (empty profile)".to_string();
    }

    let mut canvas = Canvas::new(width, height);
    let peak = profile
        .iter()
        .copied()
        .fold(threshold, f64::max)
        .max(f64::MIN_POSITIVE);

    let last_x = (width - 1) as f64;
    let last_y = (height - 1) as f64;
    let to_y = |v: f64| (last_y - (v / peak).clamp(0.0, 1.0) * last_y).round() as u32;
    let to_x = |i: usize| {
        if profile.len() == 1 {
            0
        } else {
            (i as f64 / (profile.len() - 1) as f64 * last_x).round() as u32
        }
    };

    // Threshold as a dashed line
    let ty = to_y(threshold);
    for x in (0..width).step_by(4) {
        canvas.set(x, ty);
        canvas.set(x + 1, ty);
    }

    for i in 1..profile.len() {
        canvas.line(to_x(i - 1), to_y(profile[i - 1]), to_x(i), to_y(profile[i]));
    }
    if profile.len() == 1 {
        canvas.set(0, to_y(profile[0]));
    }

    let mut output = String::new();
    output.push_str(title);
    output.push('\n');
    output.push_str(&canvas.frame());
    output.push_str(&format!("\n  max={:.2}  threshold={:.2}", peak, threshold));
    output
}

/// Render a simple 1D range bar against lower/upper limits
pub fn render_range_bar(min: f64, max: f64, lower_limit: f64, upper_limit: f64) -> String {
    let bar_width = 60;

    let full_range = (upper_limit - lower_limit).abs().max(f64::EPSILON);
    let spec_margin = full_range * 0.1;

    // Widen the view when results fall outside the limits
    let view_min = (lower_limit - spec_margin).min(min);
    let view_max = (upper_limit + spec_margin).max(max);
    let view_range = (view_max - view_min).max(f64::EPSILON);

    let pos = |v: f64| {
        (((v - view_min) / view_range * bar_width as f64) as usize).min(bar_width - 1)
    };
    let pos_lower = pos(lower_limit);
    let pos_upper = pos(upper_limit);
    let pos_min = pos(min);
    let pos_max = pos(max);

    let mut bar: Vec<char> = vec!['─'; bar_width];
    bar[pos_lower] = '│';
    bar[pos_upper] = '│';

    for cell in bar.iter_mut().take(pos_max + 1).skip(pos_min) {
        *cell = if *cell == '│' { '╋' } else { '═' };
    }
    bar[pos_min] = if bar[pos_min] == '╋' { '╟' } else { '[' };
    bar[pos_max] = if bar[pos_max] == '╋' { '╢' } else { ']' };

    let bar_str: String = bar.into_iter().collect();

    format!(
        "  LSL={:.3}  USL={:.3}\n  {}\n  Min={:.4}  Max={:.4}",
        lower_limit, upper_limit, bar_str, min, max
    )
}

/// Dose × focus map of pass (●), fail (○) and unmeasured (×) points.
/// Focus runs top (largest) to bottom; dose left to right.
pub fn render_window_map(result: &ProcessWindowResult) -> String {
    let n = result.grid_resolution;
    if result.is_empty() || n == 0 {
        return "  (no grid points evaluated)".to_string();
    }

    let mut cells = vec![vec![' '; n]; n];
    let mut focus_values = vec![f64::NAN; n];
    let mut dose_values = vec![f64::NAN; n];
    for k in 0..result.len() {
        let (i, j) = (result.dose_index[k], result.focus_index[k]);
        dose_values[i] = result.dose[k];
        focus_values[j] = result.focus[k];
        cells[j][i] = if result.failure[k].is_some() {
            '×'
        } else if result.passed[k] {
            '●'
        } else {
            '○'
        };
    }

    let mut lines = Vec::new();
    lines.push("Process window (focus nm ↓, dose mJ/cm² →):".to_string());
    lines.push(format!("          ┌{}┐", "─".repeat(2 * n + 1)));
    for j in (0..n).rev() {
        let label = if focus_values[j].is_nan() {
            String::new()
        } else {
            format!("{:+.1}", focus_values[j])
        };
        let row: String = cells[j].iter().map(|c| format!(" {}", c)).collect();
        lines.push(format!("{:>9} │{} │", label, row));
    }
    lines.push(format!("          └{}┘", "─".repeat(2 * n + 1)));

    let first = dose_values.iter().find(|d| !d.is_nan());
    let last = dose_values.iter().rev().find(|d| !d.is_nan());
    if let (Some(first), Some(last)) = (first, last) {
        lines.push(format!("           {:.1} … {:.1}", first, last));
    }
    lines.join("\n")
}
