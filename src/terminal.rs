// Terminal width probe used by the listing layout.
// The probe never blocks: stdout is only queried when it is a terminal,
// otherwise the caller falls back to `FALLBACK_WIDTH`.

use std::io::IsTerminal;

/// Width used when the output device cannot report its size (piped or
/// redirected stdout, failed query, or a zero-column answer).
pub const FALLBACK_WIDTH: usize = 80;

/// Something that can report the column count of the output device.
pub trait WidthProbe {
    /// Returns `None` when the width is unknown.
    fn columns(&self) -> Option<usize>;
}

/// Probe backed by `crossterm`, querying the process's stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutProbe;

impl WidthProbe for StdoutProbe {
    fn columns(&self) -> Option<usize> {
        if !std::io::stdout().is_terminal() {
            return None;
        }
        match crossterm::terminal::size() {
            Ok((cols, _rows)) => Some(cols as usize),
            Err(e) => {
                log::debug!("terminal size query failed: {}", e);
                None
            }
        }
    }
}

/// Probe returning a fixed answer. Useful when the width is already known.
#[derive(Debug, Clone, Copy)]
pub struct FixedWidth(pub Option<usize>);

impl WidthProbe for FixedWidth {
    fn columns(&self) -> Option<usize> {
        self.0
    }
}

/// Read the probe once and substitute the fallback for missing or
/// non-positive answers.
pub fn resolve_width(probe: &dyn WidthProbe) -> usize {
    match probe.columns() {
        Some(cols) if cols > 0 => cols,
        _ => FALLBACK_WIDTH,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_width_uses_fallback() {
        assert_eq!(resolve_width(&FixedWidth(None)), FALLBACK_WIDTH);
    }

    #[test]
    fn zero_width_uses_fallback() {
        assert_eq!(resolve_width(&FixedWidth(Some(0))), FALLBACK_WIDTH);
    }

    #[test]
    fn reported_width_is_used() {
        assert_eq!(resolve_width(&FixedWidth(Some(132))), 132);
    }
}
