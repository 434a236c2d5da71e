use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

/// Recursive directory copy that tolerates unreadable files.
///
/// Directories whose name is in `skip` are left out entirely. Files that fail
/// with permission denied are skipped; any other error aborts the copy.
pub async fn copy_dir_best_effort(src: &Path, dst: &Path, skip: &[&str], purpose: &str) -> Result<()> {
    // Async recursion needs boxing; use an explicit stack.
    let mut stack = vec![(src.to_path_buf(), dst.to_path_buf())];

    while let Some((src_dir, dst_dir)) = stack.pop() {
        tokio::fs::create_dir_all(&dst_dir).await.with_context(|| {
            format!(
                "Failed to create destination directory ({purpose}): {}",
                dst_dir.display()
            )
        })?;

        let mut entries = tokio::fs::read_dir(&src_dir)
            .await
            .with_context(|| format!("Failed to read directory ({purpose}): {}", src_dir.display()))?;

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let src_path = entry.path();
            let dst_path = dst_dir.join(&name);
            let file_type = entry.file_type().await?;

            if file_type.is_dir() {
                if name.to_str().is_some_and(|n| skip.contains(&n)) {
                    debug!(path = %src_path.display(), "Skipping directory");
                } else {
                    stack.push((src_path, dst_path));
                }
                continue;
            }

            if !file_type.is_file() {
                continue;
            }
            match tokio::fs::copy(&src_path, &dst_path).await {
                Ok(_) => {}
                Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                    debug!(
                        path = %src_path.display(),
                        purpose = %purpose,
                        "Skipping unreadable file"
                    );
                }
                Err(e) => {
                    return Err(anyhow::Error::new(e))
                        .with_context(|| format!("Failed to copy file ({purpose}): {}", src_path.display()));
                }
            }
        }
    }

    Ok(())
}
