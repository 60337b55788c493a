//! Input discovery.

use std::path::{Path, PathBuf};

use crate::media::MediaKind;

/// Files directly under `dir` whose extension matches `kind`, sorted by path.
pub async fn collect_inputs(dir: &Path, kind: MediaKind) -> std::io::Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut inputs = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        let name = entry.file_name();
        if name.to_str().is_some_and(|n| kind.allows(n)) {
            inputs.push(entry.path());
        }
    }

    inputs.sort();
    Ok(inputs)
}
