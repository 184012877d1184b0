use directories::ProjectDirs;
use std::path::PathBuf;

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    pub fn db_path() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            let state_dir = PathBuf::from(home)
                .join(".local")
                .join("state")
                .join("formlab");
            Some(state_dir.join("stats.db"))
        } else {
            ProjectDirs::from("", "", "formlab")
                .map(|proj_dirs| proj_dirs.data_local_dir().join("stats.db"))
        }
    }

    pub fn log_path() -> Option<PathBuf> {
        Self::db_path().map(|p| p.with_file_name("formlab.log"))
    }
}
