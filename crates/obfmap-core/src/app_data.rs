//! Where obfmap stores its own data (the configs document).
//!
//! Mapping files and PDBs stay wherever the user keeps them. We only store app state here.

use std::path::PathBuf;

/// Names the application for path resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppIdentity {
    /// Directory name under the platform's config location.
    pub application_name: String,
    /// File name of the persisted document inside that directory.
    pub configs_filename: String,
}

impl Default for AppIdentity {
    fn default() -> Self {
        Self {
            application_name: "ObfMap".to_string(),
            configs_filename: "configs.xml".to_string(),
        }
    }
}

/// Returns the directory holding the configs document.
/// On Windows: `%APPDATA%\<application_name>\config\`.
/// Does not create it; returns `None` if we can't determine the path.
pub fn config_dir(identity: &AppIdentity) -> Option<PathBuf> {
    let dirs = directories::ProjectDirs::from("", "", &identity.application_name)?;
    Some(dirs.config_dir().to_path_buf())
}

/// Full path of the configs document.
pub fn config_path(identity: &AppIdentity) -> Option<PathBuf> {
    config_dir(identity).map(|dir| dir.join(&identity.configs_filename))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_path_ends_with_filename() {
        let identity = AppIdentity::default();
        let path = config_path(&identity).expect("config dir should resolve on test hosts");
        assert!(path.ends_with("configs.xml"));
        assert!(path.to_string_lossy().to_lowercase().contains("obfmap"));
    }
}
