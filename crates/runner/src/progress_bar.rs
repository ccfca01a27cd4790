//! ASCII progress bar on stderr.

use std::io::Write;
use std::sync::Mutex;

use helio_core::progress::ProgressSink;

/// Default bar width in characters.
pub const BAR_WIDTH: usize = 40;

/// Render `[####----] 45%` for a 0-100 value. Out-of-range values are
/// clamped.
pub fn render_bar(percent: f64, width: usize) -> String {
    let clamped = if percent.is_finite() {
        percent.clamp(0.0, 100.0)
    } else {
        0.0
    };
    let filled = ((width as f64) * clamped / 100.0) as usize;
    format!(
        "[{}{}] {:.0}%",
        "#".repeat(filled),
        "-".repeat(width - filled),
        clamped
    )
}

/// Redraws one bar line in place on every report.
pub struct TerminalProgress {
    label: &'static str,
    width: usize,
    drawn: Mutex<bool>,
}

impl TerminalProgress {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            width: BAR_WIDTH,
            drawn: Mutex::new(false),
        }
    }

    /// End the bar line, if one was drawn.
    pub fn finish(&self) {
        let mut drawn = self.drawn.lock().unwrap_or_else(|e| e.into_inner());
        if *drawn {
            eprintln!();
            *drawn = false;
        }
    }
}

impl ProgressSink for TerminalProgress {
    fn report(&self, percent: f64) {
        let mut drawn = self.drawn.lock().unwrap_or_else(|e| e.into_inner());
        let mut err = std::io::stderr().lock();
        // Progress output is best effort.
        let _ = write!(err, "\r  {} {}", self.label, render_bar(percent, self.width));
        let _ = err.flush();
        *drawn = true;
    }
}

impl Drop for TerminalProgress {
    fn drop(&mut self) {
        self.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bar_fills_proportionally() {
        let bar = render_bar(50.0, 40);
        assert_eq!(bar, format!("[{}{}] 50%", "#".repeat(20), "-".repeat(20)));
    }

    #[test]
    fn bar_bounds() {
        assert_eq!(render_bar(0.0, 4), "[----] 0%");
        assert_eq!(render_bar(100.0, 4), "[####] 100%");
        assert_eq!(render_bar(250.0, 4), "[####] 100%");
        assert_eq!(render_bar(-5.0, 4), "[----] 0%");
        assert_eq!(render_bar(f64::NAN, 4), "[----] 0%");
    }
}
