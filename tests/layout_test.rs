use dbox_cli::layout::{self, display_width, ColumnPlan, GUTTER};
use dbox_cli::terminal::{FixedWidth, FALLBACK_WIDTH};

/// Deterministic name lists of varying length and script.
fn corpus() -> Vec<Vec<String>> {
    let stems = ["a", "readme.md", "사진", "カメラ", "報告書", "photo_2024_01_01.jpg", "x y z"];
    let mut lists = Vec::new();
    for count in [1usize, 2, 3, 4, 5, 7, 10, 13, 31, 64, 100] {
        for offset in 0..stems.len() {
            lists.push(
                (0..count)
                    .map(|i| {
                        let stem = stems[(i * 3 + offset) % stems.len()];
                        format!("{}{}", stem, "-".repeat((i + offset) % 5))
                    })
                    .collect(),
            );
        }
    }
    lists
}

const WIDTHS: [usize; 6] = [10, 24, 40, 80, 132, 200];

fn check_plan(names: &[String], plan: &ColumnPlan, width: usize) {
    let n = names.len();
    assert_eq!(plan.rows(), n.div_ceil(plan.columns()));
    let mut rejoined = Vec::new();
    for col in 0..plan.columns() {
        let range = plan.column_range(col, n);
        assert!(range.len() <= plan.rows());
        if col + 1 < plan.columns() {
            assert_eq!(range.len(), plan.rows(), "only the last column may be short");
        } else if range.is_empty() {
            // Only when the earlier columns hold every name exactly.
            assert_eq!(plan.rows() * (plan.columns() - 1), n);
            assert_eq!(plan.widths()[col], GUTTER);
        }
        let widest = names[range.clone()].iter().map(|s| display_width(s)).max().unwrap_or(0);
        assert!(widest <= plan.widths()[col]);
        rejoined.extend(names[range].iter().cloned());
    }
    assert_eq!(rejoined, names, "columns must read back in input order");
    assert!(plan.columns() == 1 || plan.rows() * (plan.columns() - 1) <= n);

    let widest = names.iter().map(|s| display_width(s)).max().unwrap();
    if widest <= width {
        assert!(plan.total_width() <= width, "{:?} exceeds {}", plan, width);
    } else {
        assert_eq!(plan.widths(), &[widest]);
    }
}

#[test]
fn committed_plans_hold_their_invariants() {
    for names in corpus() {
        for width in WIDTHS {
            let plan = layout::plan(&names, width);
            check_plan(&names, &plan, width);
        }
    }
}

#[test]
fn every_segment_fills_its_column() {
    for names in corpus() {
        for width in WIDTHS {
            let plan = layout::plan(&names, width);
            let out = layout::render(&names, &plan);
            let lines: Vec<&str> = out.split('\n').collect();
            assert_eq!(lines.len(), plan.rows());
            for (row, line) in lines.iter().enumerate() {
                let mut expected = String::new();
                let mut cells = 0;
                for col in 0..plan.columns() {
                    if let Some(name) = names.get(col * plan.rows() + row) {
                        expected.push_str(name);
                        expected.push_str(&" ".repeat(plan.widths()[col] - display_width(name)));
                        cells += plan.widths()[col];
                    }
                }
                assert_eq!(*line, expected);
                assert_eq!(display_width(line), cells);
            }
        }
    }
}

#[test]
fn multi_column_plans_include_the_gutter() {
    let names: Vec<String> = (0..20).map(|i| format!("n{:02}", i)).collect();
    let plan = layout::plan(&names, 80);
    assert!(plan.columns() > 1);
    assert!(plan.widths().iter().all(|&w| w == 3 + GUTTER));
}

#[test]
fn formatting_is_idempotent() {
    for names in corpus() {
        assert_eq!(
            layout::format_with_width(&names, 80),
            layout::format_with_width(&names, 80)
        );
    }
}

#[test]
fn oversized_name_sits_alone_on_its_line() {
    let long = "L".repeat(200);
    let names = vec!["short".to_string(), long.clone(), "tail".to_string()];
    let out = layout::format_with_width(&names, 80);
    let lines: Vec<&str> = out.split('\n').collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[1], long);
    assert_eq!(lines[0].trim_end(), "short");
    assert_eq!(lines[2].trim_end(), "tail");
}

#[test]
fn wide_oversized_name_uses_display_width() {
    // 50 Han characters are 100 cells.
    let wide = "漢".repeat(50);
    let plan = layout::plan(&[wide.as_str(), "b"], 80);
    assert_eq!(plan.widths(), &[100]);
}

#[test]
fn unavailable_probe_matches_fallback_width() {
    for names in corpus() {
        assert_eq!(
            layout::format_with_probe(&names, &FixedWidth(None)),
            layout::format_with_width(&names, FALLBACK_WIDTH)
        );
        assert_eq!(
            layout::format_with_probe(&names, &FixedWidth(Some(0))),
            layout::format_with_width(&names, FALLBACK_WIDTH)
        );
    }
}

#[test]
fn fallback_width_is_eighty_columns() {
    assert_eq!(FALLBACK_WIDTH, 80);
}
