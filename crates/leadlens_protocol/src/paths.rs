use std::path::{Path, PathBuf};
use std::sync::Once;

static CREATE_DIR_WARNED: Once = Once::new();

/// Resolve the LeadLens home directory.
///
/// Priority:
/// 1) LEADLENS_HOME
/// 2) HOME/USERPROFILE
/// 3) ./.leadlens
pub fn leadlens_home() -> PathBuf {
    if let Ok(override_path) = std::env::var("LEADLENS_HOME") {
        return PathBuf::from(override_path);
    }
    if let Ok(home) = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE")) {
        return PathBuf::from(home).join(".leadlens");
    }
    PathBuf::from(".").join(".leadlens")
}

/// Create the home directory if missing, warning once on failure.
pub fn ensure_home_dir(home: &Path) {
    if let Err(err) = std::fs::create_dir_all(home) {
        CREATE_DIR_WARNED.call_once(|| {
            eprintln!(
                "Warning: failed to create LeadLens home directory {}: {}. Set LEADLENS_HOME or pass --home.",
                home.display(),
                err
            );
        });
    }
}

/// Config file: <home>/config.toml
pub fn config_path(home: &Path) -> PathBuf {
    home.join("config.toml")
}

/// Durable credential store: <home>/credentials.json
pub fn credential_store_path(home: &Path) -> PathBuf {
    home.join("credentials.json")
}

/// Identity provider session cache: <home>/provider_session.json
pub fn provider_session_path(home: &Path) -> PathBuf {
    home.join("provider_session.json")
}

/// Logs directory: <home>/logs
pub fn logs_dir(home: &Path) -> PathBuf {
    home.join("logs")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_paths_live_under_home() {
        let home = PathBuf::from("/tmp/leadlens-home");
        assert_eq!(config_path(&home), home.join("config.toml"));
        assert_eq!(credential_store_path(&home), home.join("credentials.json"));
        assert_eq!(provider_session_path(&home), home.join("provider_session.json"));
        assert_eq!(logs_dir(&home), home.join("logs"));
    }
}
