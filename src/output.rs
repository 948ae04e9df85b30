//! CLI output formatting for the build pipeline.
//!
//! Each stage has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure — no I/O, no side effects.
//!
//! # Output Format
//!
//! ```text
//! Assets
//!     css/main.min.css
//!     js/main.min.js
//!     favicon.svg + favicon.ico
//!     images/ (12 files)
//!
//! Pages
//! 001 Home → index.html
//! 002 About → about.html
//!
//! Built 2 pages, 4 assets
//! ```

use crate::build::BuildReport;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Format the build report into display lines.
pub fn format_build_output(report: &BuildReport) -> Vec<String> {
    let mut lines = Vec::new();

    if !report.assets.is_empty() {
        lines.push("Assets".to_string());
        for asset in &report.assets {
            lines.push(format!("    {asset}"));
        }
        lines.push(String::new());
    }

    lines.push("Pages".to_string());
    for (index, (title, file)) in report.pages.iter().enumerate() {
        lines.push(format!("{} {} → {}", format_index(index + 1), title, file));
    }

    lines.push(String::new());
    lines.push(format!(
        "Built {} page{}, {} asset{}",
        report.pages.len(),
        if report.pages.len() == 1 { "" } else { "s" },
        report.assets.len(),
        if report.assets.len() == 1 { "" } else { "s" },
    ));
    lines
}

/// Print the build report to stdout.
pub fn print_build_output(report: &BuildReport) {
    for line in format_build_output(report) {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> BuildReport {
        BuildReport {
            assets: vec![
                "css/main.min.css".to_string(),
                "js/main.min.js".to_string(),
            ],
            pages: vec![
                ("Home".to_string(), "index.html".to_string()),
                ("About".to_string(), "about.html".to_string()),
            ],
        }
    }

    #[test]
    fn pages_are_numbered_and_arrowed() {
        let lines = format_build_output(&report());
        assert!(lines.contains(&"001 Home → index.html".to_string()));
        assert!(lines.contains(&"002 About → about.html".to_string()));
    }

    #[test]
    fn summary_counts_pages_and_assets() {
        let lines = format_build_output(&report());
        assert_eq!(lines.last().unwrap(), "Built 2 pages, 2 assets");
    }

    #[test]
    fn empty_asset_stage_omits_the_section() {
        let report = BuildReport {
            assets: vec![],
            pages: vec![("Home".to_string(), "index.html".to_string())],
        };
        let lines = format_build_output(&report);
        assert!(!lines.contains(&"Assets".to_string()));
        assert_eq!(lines.last().unwrap(), "Built 1 page, 0 assets");
    }
}
