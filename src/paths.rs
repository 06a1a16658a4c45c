//! XDG-compliant default locations.

use std::env;
use std::path::PathBuf;

const APP_DIR: &str = "svcmap";

/// Data directory: `$XDG_DATA_HOME/svcmap` or `~/.local/share/svcmap`.
///
/// Falls back to a relative `.local/share/svcmap` when neither variable is set.
pub fn data_dir() -> PathBuf {
    let data_home = env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            env::var("HOME")
                .map(PathBuf::from)
                .unwrap_or_default()
                .join(".local/share")
        });

    data_home.join(APP_DIR)
}

/// Default database file: `<data_dir>/svcmap.db`
pub fn default_db_path() -> PathBuf {
    data_dir().join("svcmap.db")
}

/// Default upload directory for service icons: `<data_dir>/uploads`
pub fn default_upload_dir() -> PathBuf {
    data_dir().join("uploads")
}
