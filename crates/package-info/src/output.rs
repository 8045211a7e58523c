//! Text and JSON rendering of resolved packages.

use crate::aggregate::{PackageRecord, Resolution};
use std::fmt::Write;

/// Human-readable report, one block per requested name.
pub fn format_human(resolutions: &[Resolution]) -> String {
    let mut out = String::new();
    for (i, resolution) in resolutions.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        match resolution {
            Resolution::Found(record) => write_record(&mut out, record),
            Resolution::Failed(failure) => {
                let _ = writeln!(out, "{}", failure.name);
                let _ = writeln!(out, "  error: {}", failure.error);
            }
        }
    }
    out
}

fn write_record(out: &mut String, record: &PackageRecord) {
    let _ = writeln!(out, "{}", record.name);
    if let Some(description) = &record.description {
        let _ = writeln!(out, "  {}", description);
    }
    if let Some(url) = &record.repository_url {
        let _ = writeln!(out, "  repository: {}", url);
    }
    if let Some(github) = &record.github {
        let _ = writeln!(
            out,
            "  github: {} stars, {} forks, created {} ({})",
            group_digits(github.stargazers_count),
            group_digits(github.forks_count),
            github.created_at,
            github.html_url
        );
    }

    let width = record
        .counts
        .iter()
        .map(|c| group_digits(c.downloads).len())
        .max()
        .unwrap_or(0);
    let _ = writeln!(out, "  downloads:");
    for count in &record.counts {
        let _ = writeln!(
            out,
            "    {}  {:>width$}",
            count.period.label(),
            group_digits(count.downloads),
            width = width
        );
    }
    let _ = writeln!(out, "    total    {}", group_digits(record.total_downloads()));
}

/// JSON array, each element tagged `"status": "ok" | "error"`.
pub fn format_json(resolutions: &[Resolution]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(resolutions)
}

/// `1234567` -> `1,234,567`
fn group_digits(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
