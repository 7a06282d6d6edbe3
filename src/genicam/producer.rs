use std::path::{Path, PathBuf};

use crate::error::{McError, Result};

/// Environment variable pointing at the PhoXi Control installation.
pub const PRODUCER_ENV: &str = "PHOXI_CONTROL_PATH";

/// Extension of GenTL producer libraries.
pub const PRODUCER_EXTENSION: &str = "cti";

/// Location of the vendor producer inside an installation root.
pub fn producer_path_from(root: &Path) -> PathBuf {
    if cfg!(windows) {
        root.join("API").join("bin").join("photoneo.cti")
    } else {
        root.join("API").join("lib").join("photoneo.cti")
    }
}

/// Resolves the vendor producer from [`PRODUCER_ENV`].
pub fn default_producer_path() -> Result<PathBuf> {
    match std::env::var_os(PRODUCER_ENV) {
        Some(root) if !root.is_empty() => Ok(producer_path_from(Path::new(&root))),
        _ => Err(McError::Producer {
            path: PathBuf::new(),
            reason: format!("{PRODUCER_ENV} is not set and no producer path was given"),
        }),
    }
}

/// Checks a producer file before it is handed to the transport backend.
///
/// # Arguments
///
/// * `path` - Path to the `.cti` file.
/// * `check_existence` - Fail if the path is not an existing regular file.
/// * `check_validity` - Fail if the file does not carry the `.cti` extension.
pub fn validate_producer_file(path: &Path, check_existence: bool, check_validity: bool) -> Result<()> {
    if check_existence && !path.is_file() {
        return Err(McError::Producer {
            path: path.to_path_buf(),
            reason: "file does not exist".to_string(),
        });
    }

    if check_validity {
        let is_cti = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case(PRODUCER_EXTENSION))
            .unwrap_or(false);
        if !is_cti {
            return Err(McError::Producer {
                path: path.to_path_buf(),
                reason: format!("not a GenTL producer, expected a .{PRODUCER_EXTENSION} file"),
            });
        }
    }

    Ok(())
}
