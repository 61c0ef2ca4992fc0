use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use super::reader::{DependencyListing, ManifestIndex};
use crate::error::ManifestError;

pub const REPORT_FILE_NAME: &str = "readme_puup_file.txt";

const RULE: &str = "==================================================";

/// Render the plain-text dependency report for an archive.
pub fn render_report(index: &ManifestIndex) -> String {
    let mut out = String::new();
    let mut unique = BTreeSet::new();

    let _ = writeln!(out, "--- Downloaded NuGet Packages and Dependencies ---");
    let _ = writeln!(out);
    let _ = writeln!(out, "## Downloaded Packages and Their Dependencies ({} items):", index.len());

    for (package, listing) in index {
        let _ = writeln!(out);
        let _ = writeln!(out, "* {}", package);

        match listing {
            DependencyListing::Unreadable(reason) => {
                let _ = writeln!(out, "  - Error reading metadata: {}", reason);
            }
            DependencyListing::Parsed(deps) if deps.is_empty() => {
                let _ = writeln!(out, "  - No direct dependencies listed in metadata.");
            }
            DependencyListing::Parsed(deps) => {
                let mut group: Option<&str> = None;
                for dep in deps {
                    let framework = dep.target_framework.as_deref();
                    if framework.is_some() && framework != group {
                        let _ = writeln!(out, "  --- Group: {} ---", framework.unwrap_or_default());
                    }
                    group = framework;
                    let _ = writeln!(out, "  - {}", dep);
                    unique.insert(dep.id.clone());
                }
            }
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "{}", RULE);
    let _ = writeln!(out);
    let _ = writeln!(out, "## All Unique Dependencies Referenced ({} items):", unique.len());
    if unique.is_empty() {
        let _ = writeln!(out, "  (none)");
    }
    for id in &unique {
        let _ = writeln!(out, "* {}", id);
    }

    out
}

/// Write the report into `folder` and return its path.
pub fn write_report(index: &ManifestIndex, folder: &Path) -> Result<PathBuf, ManifestError> {
    let path = folder.join(REPORT_FILE_NAME);
    std::fs::write(&path, render_report(index))
        .map_err(|source| ManifestError::Write { path: path.clone(), source })?;
    log::info!("Wrote dependency report to {}", path.display());
    Ok(path)
}
