//! Local copies of finished reports

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Append `text` to `<dir>/<community>_results.txt`, returning the path
pub fn append_results(dir: &Path, community: &str, text: &str) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Could not create results directory: {}", dir.display()))?;
    let path = dir.join(format!("{community}_results.txt"));

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Could not open {}", path.display()))?;
    writeln!(file, "{text}")?;

    Ok(path)
}
