use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use rd_capture::test_pattern;
use tracing::info;

use super::Outcome;

/// Execute the `pattern` command: write `size` bytes of the test payload.
pub fn execute(size: usize, output: &Path) -> Result<Outcome> {
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(output, test_pattern(size))
        .with_context(|| format!("Failed to write {}", output.display()))?;
    info!(path = %output.display(), size, "test pattern written");
    Ok(Outcome::Pass)
}
