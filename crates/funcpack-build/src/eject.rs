use std::path::{Path, PathBuf};

use crate::launcher::{LAUNCHER_FILE, LAUNCHER_TEMPLATE};

/// Directory holding ejected, user-editable build files.
pub const EJECT_DIR: &str = ".funcpack";

/// Ejects the launcher template into the project directory.
///
/// After ejecting, `funcpack build` renders `.funcpack/launcher.js`
/// instead of the built-in template.
pub fn eject(project_dir: &Path) -> Result<PathBuf, EjectError> {
    let eject_dir = project_dir.join(EJECT_DIR);
    std::fs::create_dir_all(&eject_dir).map_err(|e| EjectError::CreateDir {
        path: eject_dir.clone(),
        source: e,
    })?;

    let launcher_path = eject_dir.join(LAUNCHER_FILE);
    if launcher_path.exists() {
        return Err(EjectError::AlreadyEjected(launcher_path));
    }

    std::fs::write(&launcher_path, LAUNCHER_TEMPLATE).map_err(|e| EjectError::Write {
        path: launcher_path.clone(),
        source: e,
    })?;

    Ok(launcher_path)
}

/// Check if the project has an ejected launcher.
pub fn is_ejected(project_dir: &Path) -> bool {
    project_dir.join(EJECT_DIR).join(LAUNCHER_FILE).exists()
}

/// Load the ejected launcher template.
pub fn load_ejected_launcher(project_dir: &Path) -> Result<String, EjectError> {
    let path = project_dir.join(EJECT_DIR).join(LAUNCHER_FILE);
    std::fs::read_to_string(&path).map_err(|e| EjectError::Read { path, source: e })
}

#[derive(Debug, thiserror::Error)]
pub enum EjectError {
    #[error("failed to create .funcpack directory at {path}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("launcher already ejected at {0}; edit it directly or delete it to re-eject")]
    AlreadyEjected(PathBuf),
    #[error("failed to write {path}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to read ejected launcher at {path}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
}
