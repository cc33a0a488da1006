//! One-off developer utility: rewrite import paths in generated UI components.
//!
//! The UI component generator emits files importing `"@/lib/utils"` (an
//! alias only the generator's own build resolves). This rewrites that alias
//! to the relative path the marketplace frontend build expects, in place.

use anyhow::{Context as _, Result};
use std::path::Path;
use tracing::{info, warn};

/// Directory scanned when no override is given, relative to the working dir.
pub const DEFAULT_COMPONENTS_DIR: &str = "web/components/ui";

/// Only generated component files are touched.
const COMPONENT_SUFFIX: &str = ".tsx";

const ALIAS_IMPORT: &str = "\"@/lib/utils\"";
const RELATIVE_IMPORT: &str = "\"../../lib/utils\"";

/// Counts reported after a scan.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RewriteSummary {
    /// Files rewritten in place.
    pub updated: usize,
    /// Matching files that contained no alias import.
    pub unchanged: usize,
    /// Files that could not be read or written. Logged and skipped — a bad
    /// file never stops the scan.
    pub failed: usize,
}

/// Scan `dir` (non-recursive) and rewrite the alias import in every
/// component file. Errors on individual files are logged and skipped.
pub fn run(dir: &Path) -> Result<RewriteSummary> {
    let mut summary = RewriteSummary::default();

    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("cannot read components directory {}", dir.display()))?;

    for entry in entries {
        let path = match entry {
            Ok(entry) => entry.path(),
            Err(e) => {
                warn!(error = %e, "unreadable directory entry — skipping");
                summary.failed += 1;
                continue;
            }
        };

        let is_component = path.is_file()
            && path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(COMPONENT_SUFFIX));
        if !is_component {
            continue;
        }

        match rewrite_file(&path) {
            Ok(true) => {
                info!("updated {}", path.display());
                summary.updated += 1;
            }
            Ok(false) => summary.unchanged += 1,
            Err(e) => {
                warn!(path = %path.display(), error = %format!("{e:#}"), "rewrite failed — continuing");
                summary.failed += 1;
            }
        }
    }

    info!(
        updated = summary.updated,
        unchanged = summary.unchanged,
        failed = summary.failed,
        "import rewrite finished"
    );
    Ok(summary)
}

/// Rewrite one file. Returns true if the file was changed.
fn rewrite_file(path: &Path) -> Result<bool> {
    let contents = std::fs::read_to_string(path).context("read failed")?;
    if !contents.contains(ALIAS_IMPORT) {
        return Ok(false);
    }
    let rewritten = contents.replace(ALIAS_IMPORT, RELATIVE_IMPORT);
    std::fs::write(path, rewritten).context("write failed")?;
    Ok(true)
}
