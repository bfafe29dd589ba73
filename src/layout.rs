// Grid layout for directory listings.
//
// Names are split column-major into as many columns as fit the terminal,
// then emitted row by row. Widths are measured in terminal cells: the
// Hangul, Katakana, Hiragana and Han scripts take two cells per character,
// everything else takes one.

use std::ops::Range;

use crate::terminal::{self, StdoutProbe, WidthProbe};

/// Spacing appended to every column.
pub const GUTTER: usize = 2;

/// Committed column layout for a list of names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnPlan {
    widths: Vec<usize>,
    rows: usize,
}

impl ColumnPlan {
    fn single(width: usize, name_count: usize) -> Self {
        ColumnPlan {
            widths: vec![width],
            rows: name_count,
        }
    }

    /// Per-column widths, gutters included.
    pub fn widths(&self) -> &[usize] {
        &self.widths
    }

    pub fn columns(&self) -> usize {
        self.widths.len()
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn total_width(&self) -> usize {
        self.widths.iter().sum()
    }

    /// Indices of the names held by column `col`. The last column runs to
    /// the end of the list.
    pub fn column_range(&self, col: usize, name_count: usize) -> Range<usize> {
        let start = (col * self.rows).min(name_count);
        let end = if col + 1 == self.columns() {
            name_count
        } else {
            ((col + 1) * self.rows).min(name_count)
        };
        start..end
    }
}

/// Number of terminal cells `s` occupies.
pub fn display_width(s: &str) -> usize {
    s.chars().map(char_width).sum()
}

fn char_width(c: char) -> usize {
    if is_wide_script(c) {
        2
    } else {
        1
    }
}

fn is_wide_script(c: char) -> bool {
    matches!(c as u32,
        // Hangul
        0x1100..=0x11FF
        | 0x302E..=0x302F
        | 0x3131..=0x318E
        | 0x3200..=0x321E
        | 0x3260..=0x327E
        | 0xA960..=0xA97C
        | 0xAC00..=0xD7A3
        | 0xD7B0..=0xD7C6
        | 0xD7CB..=0xD7FB
        | 0xFFA0..=0xFFBE
        | 0xFFC2..=0xFFC7
        | 0xFFCA..=0xFFCF
        | 0xFFD2..=0xFFD7
        | 0xFFDA..=0xFFDC
        // Hiragana
        | 0x3041..=0x3096
        | 0x309D..=0x309F
        | 0x1B001..=0x1B11F
        | 0x1B132
        | 0x1B150..=0x1B152
        | 0x1F200
        // Katakana
        | 0x30A1..=0x30FA
        | 0x30FD..=0x30FF
        | 0x31F0..=0x31FF
        | 0x32D0..=0x32FE
        | 0x3300..=0x3357
        | 0xFF66..=0xFF6F
        | 0xFF71..=0xFF9D
        | 0x1AFF0..=0x1AFFE
        | 0x1B000
        | 0x1B120..=0x1B122
        | 0x1B155
        | 0x1B164..=0x1B167
        // Han
        | 0x2E80..=0x2E99
        | 0x2E9B..=0x2EF3
        | 0x2F00..=0x2FD5
        | 0x3005
        | 0x3007
        | 0x3021..=0x3029
        | 0x3038..=0x303B
        | 0x3400..=0x4DBF
        | 0x4E00..=0x9FFF
        | 0xF900..=0xFA6D
        | 0xFA70..=0xFAD9
        | 0x16FE2..=0x16FE3
        | 0x16FF0..=0x16FF1
        | 0x20000..=0x2A6DF
        | 0x2A700..=0x2EBE0
        | 0x2F800..=0x2FA1D
        | 0x30000..=0x323AF
    )
}

fn max_width(widths: &[usize]) -> usize {
    widths.iter().copied().max().unwrap_or(0)
}

/// Choose the column layout for `names` within `term_width` cells.
///
/// Column counts are tried from two upwards; the last count whose total
/// width fits is committed. A name wider than the terminal forces a single
/// column exactly as wide as that name.
pub fn plan<S: AsRef<str>>(names: &[S], term_width: usize) -> ColumnPlan {
    let widths: Vec<usize> = names.iter().map(|n| display_width(n.as_ref())).collect();
    plan_widths(&widths, term_width)
}

fn plan_widths(widths: &[usize], term_width: usize) -> ColumnPlan {
    let count = widths.len();
    let widest = max_width(widths);
    if widest > term_width {
        return ColumnPlan::single(widest, count);
    }

    let mut best = ColumnPlan::single((widest + GUTTER).min(term_width), count);
    for columns in 2..=count {
        let rows = count.div_ceil(columns);
        if rows * (columns - 1) > count {
            continue;
        }
        // With equality the last column is empty and costs only its gutter.
        let candidate = ColumnPlan {
            widths: (0..columns)
                .map(|col| {
                    let start = (col * rows).min(count);
                    let end = if col + 1 == columns { count } else { start + rows };
                    GUTTER + max_width(&widths[start..end])
                })
                .collect(),
            rows,
        };
        if candidate.total_width() > term_width {
            break;
        }
        best = candidate;
    }
    best
}

/// Emit `names` according to `plan`, one line per row, lines joined with
/// `\n` and no trailing newline.
///
/// Panics if a name is wider than the column it was assigned to; that can
/// only happen when `plan` was computed for a different list of names.
pub fn render<S: AsRef<str>>(names: &[S], plan: &ColumnPlan) -> String {
    if names.is_empty() {
        return String::new();
    }
    let mut lines = Vec::with_capacity(plan.rows());
    for row in 0..plan.rows() {
        let mut line = String::new();
        for (col, &col_width) in plan.widths().iter().enumerate() {
            let Some(name) = names.get(col * plan.rows() + row) else {
                continue;
            };
            let name = name.as_ref();
            let width = display_width(name);
            assert!(
                width <= col_width,
                "layout invariant violated: {:?} is {} cells wide but its column is {}",
                name,
                width,
                col_width
            );
            line.push_str(name);
            line.extend(std::iter::repeat(' ').take(col_width - width));
        }
        lines.push(line);
    }
    lines.join("\n")
}

/// Lay out `names` for a terminal `term_width` cells wide. A zero width is
/// treated as unknown and replaced with [`terminal::FALLBACK_WIDTH`].
pub fn format_with_width<S: AsRef<str>>(names: &[S], term_width: usize) -> String {
    let term_width = if term_width == 0 {
        terminal::FALLBACK_WIDTH
    } else {
        term_width
    };
    let plan = plan(names, term_width);
    log::debug!(
        "listing {} names in {} columns x {} rows (widths {:?}, terminal {})",
        names.len(),
        plan.columns(),
        plan.rows(),
        plan.widths(),
        term_width
    );
    render(names, &plan)
}

/// Lay out `names` using the width reported by `probe`, read once.
pub fn format_with_probe<S: AsRef<str>>(names: &[S], probe: &dyn WidthProbe) -> String {
    format_with_width(names, terminal::resolve_width(probe))
}

/// Lay out `names` for the terminal attached to stdout.
pub fn format<S: AsRef<str>>(names: &[S]) -> String {
    format_with_probe(names, &StdoutProbe)
}
