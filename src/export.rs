//! Markdown export of the incremental corpus.
//!
//! Items are written in the corpus's stored order, which is newest *batch* first and
//! not necessarily chronological.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};

use crate::ingest::types::Item;

/// Render `items` as a markdown document.
pub fn render_markdown(items: &[Item], generated_at: DateTime<Local>) -> String {
    let mut out = String::with_capacity(256 + items.len() * 256);
    out.push_str("# AI News Monitor - Twitter Highlights\n\n");
    let _ = writeln!(out, "Generated: {}", generated_at.format("%Y-%m-%d %H:%M:%S"));
    let _ = writeln!(out, "Total posts: {}\n", items.len());
    out.push_str("---\n\n");

    for it in items {
        let name = if it.author.display_name.is_empty() {
            "Unknown"
        } else {
            it.author.display_name.as_str()
        };
        let _ = writeln!(out, "### @{} ({})\n", it.author.handle, name);
        let _ = writeln!(out, "{}\n", it.text);
        let _ = writeln!(out, "- [View original post]({})", it.url);
        let _ = writeln!(out, "- Published: {}", it.created_at);
        out.push_str("\n---\n\n");
    }
    out
}

/// Write the export as `tweets_export_{YYYYMMDD_HHMMSS}.md` under `out_dir`.
pub fn export_markdown(items: &[Item], out_dir: &Path) -> Result<PathBuf> {
    let now = Local::now();
    let path = out_dir.join(format!("tweets_export_{}.md", now.format("%Y%m%d_%H%M%S")));
    export_markdown_to(items, &path, now)
}

pub fn export_markdown_to(
    items: &[Item],
    path: &Path,
    generated_at: DateTime<Local>,
) -> Result<PathBuf> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    fs::write(path, render_markdown(items, generated_at))
        .with_context(|| format!("writing export {}", path.display()))?;
    tracing::info!(path = %path.display(), items = items.len(), "corpus exported");
    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn renders_header_and_entries_in_given_order() {
        let mut nameless = Item::new("2", "b", "second", "2024-01-01T00:00:00Z");
        nameless.author.display_name.clear();
        let items = vec![Item::new("1", "a", "first", "2024-01-05T00:00:00Z"), nameless];
        let at = Local.with_ymd_and_hms(2024, 2, 3, 4, 5, 6).unwrap();

        let md = render_markdown(&items, at);
        assert!(md.starts_with("# AI News Monitor - Twitter Highlights\n\n"));
        assert!(md.contains("Generated: 2024-02-03 04:05:06\n"));
        assert!(md.contains("Total posts: 2\n"));
        assert!(md.contains("### @b (Unknown)"));
        assert!(md.contains("- [View original post](https://x.com/a/status/1)"));
        assert!(md.find("first").unwrap() < md.find("second").unwrap());
    }
}
