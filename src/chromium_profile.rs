//! Logged-in browser profile handling.
//!
//! Chromium locks a user-data-dir while it runs, so the session is launched
//! from a private copy of the user's profile.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::fs_utils::copy_dir_best_effort;

/// Cache directories that carry no session state.
const SKIPPED_DIRS: &[&str] = &[
    "Cache",
    "Code Cache",
    "GPUCache",
    "Service Worker",
    "ShaderCache",
    "GrShaderCache",
    "Crashpad",
];

const LOCK_FILES: &[&str] = &["SingletonLock", "SingletonCookie", "SingletonSocket"];

/// A Chromium `--user-data-dir` and optional `--profile-directory` name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileLocation {
    pub user_data_dir: PathBuf,
    pub profile_directory: Option<String>,
}

fn has_cookie_db(dir: &Path) -> bool {
    dir.join("Cookies").is_file() || dir.join("Network").join("Cookies").is_file()
}

impl ProfileLocation {
    /// Interpret `path` as either a profile directory (e.g. `.../Default`) or
    /// a user-data-dir.
    #[must_use]
    pub fn resolve(path: &Path) -> Self {
        // Pointing at the profile itself: its parent is the user-data-dir.
        if has_cookie_db(path) {
            if let Some(parent) = path.parent() {
                return Self {
                    user_data_dir: parent.to_path_buf(),
                    profile_directory: path
                        .file_name()
                        .and_then(|s| s.to_str())
                        .map(ToString::to_string),
                };
            }
        }

        if has_cookie_db(&path.join("Default")) {
            return Self {
                user_data_dir: path.to_path_buf(),
                profile_directory: Some("Default".to_string()),
            };
        }

        Self {
            user_data_dir: path.to_path_buf(),
            profile_directory: None,
        }
    }
}

/// Copy `source` into `work_dir` so the browser can run against it while the
/// user's own browser keeps the original open.
///
/// # Errors
///
/// Returns an error if the copy fails or the clone has no cookie database.
pub async fn clone_profile(work_dir: &Path, source: &ProfileLocation) -> Result<ProfileLocation> {
    let dest = work_dir.join("chromium-user-data");

    let _ = tokio::fs::remove_dir_all(&dest).await;
    info!(
        source = %source.user_data_dir.display(),
        dest = %dest.display(),
        "Cloning browser profile"
    );
    copy_dir_best_effort(&source.user_data_dir, &dest, SKIPPED_DIRS, "browser profile clone")
        .await
        .context("Failed to clone browser profile")?;

    for name in LOCK_FILES {
        let _ = tokio::fs::remove_file(dest.join(name)).await;
    }

    if !dest.join("Local State").is_file() {
        warn!("Cloned profile has no 'Local State'; cookies may not decrypt");
    }

    let profile_name = source.profile_directory.as_deref().unwrap_or("Default");
    if !has_cookie_db(&dest.join(profile_name)) {
        anyhow::bail!(
            "Cloned profile '{profile_name}' has no Cookies database; is the source a logged-in profile?"
        );
    }

    Ok(ProfileLocation {
        user_data_dir: dest,
        profile_directory: source.profile_directory.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_profile(root: &Path) {
        std::fs::create_dir_all(root.join("Default/Network")).unwrap();
        std::fs::create_dir_all(root.join("Default/Cache")).unwrap();
        std::fs::write(root.join("Default/Network/Cookies"), b"db").unwrap();
        std::fs::write(root.join("Default/Cache/blob"), b"x").unwrap();
        std::fs::write(root.join("Local State"), b"{}").unwrap();
        std::fs::write(root.join("SingletonLock"), b"").unwrap();
    }

    #[test]
    fn test_resolve_user_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        fake_profile(dir.path());

        let location = ProfileLocation::resolve(dir.path());
        assert_eq!(location.user_data_dir, dir.path());
        assert_eq!(location.profile_directory.as_deref(), Some("Default"));
    }

    #[test]
    fn test_resolve_profile_dir() {
        let dir = tempfile::tempdir().unwrap();
        fake_profile(dir.path());

        let location = ProfileLocation::resolve(&dir.path().join("Default"));
        assert_eq!(location.user_data_dir, dir.path());
        assert_eq!(location.profile_directory.as_deref(), Some("Default"));
    }

    #[test]
    fn test_resolve_unknown_layout() {
        let dir = tempfile::tempdir().unwrap();
        let location = ProfileLocation::resolve(dir.path());
        assert_eq!(location.profile_directory, None);
    }

    #[tokio::test]
    async fn test_clone_profile() {
        let source = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        fake_profile(source.path());

        let cloned = clone_profile(work.path(), &ProfileLocation::resolve(source.path()))
            .await
            .unwrap();

        assert!(cloned.user_data_dir.join("Default/Network/Cookies").is_file());
        assert!(!cloned.user_data_dir.join("Default/Cache").exists());
        assert!(!cloned.user_data_dir.join("SingletonLock").exists());
        assert_eq!(cloned.profile_directory.as_deref(), Some("Default"));
    }

    #[tokio::test]
    async fn test_clone_without_cookies_fails() {
        let source = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        std::fs::write(source.path().join("Local State"), b"{}").unwrap();

        let result = clone_profile(work.path(), &ProfileLocation::resolve(source.path())).await;
        assert!(result.is_err());
    }
}
