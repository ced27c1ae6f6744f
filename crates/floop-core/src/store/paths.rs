//! Explicit path-resolution context, constructed once at startup rather
//! than read ad hoc from process-global environment state. Tests inject
//! alternatives by constructing `Paths` directly instead of mutating the
//! process environment.

use std::path::{Path, PathBuf};

use directories::BaseDirs;

const HIDDEN_DIR: &str = ".floop";
const PROJECT_ROOT_ENV: &str = "FLOOP_PROJECT_ROOT";
const HOME_ENV: &str = "FLOOP_HOME";

#[derive(Debug, Clone)]
pub struct Paths {
    pub global: PathBuf,
    pub local: Option<PathBuf>,
}

impl Paths {
    /// Resolve paths from the environment: `FLOOP_HOME` overrides the
    /// global root, `FLOOP_PROJECT_ROOT` names a local project root when
    /// running outside a project directory.
    pub fn resolve() -> Self {
        let global = match std::env::var(HOME_ENV) {
            Ok(home) => PathBuf::from(home).join(HIDDEN_DIR),
            Err(_) => BaseDirs::new()
                .map(|dirs| dirs.home_dir().join(HIDDEN_DIR))
                .unwrap_or_else(|| PathBuf::from(HIDDEN_DIR)),
        };
        let local = std::env::var(PROJECT_ROOT_ENV)
            .ok()
            .map(|root| PathBuf::from(root).join(HIDDEN_DIR));
        Self { global, local }
    }

    /// Build a `Paths` for tests without touching the environment.
    pub fn for_roots(global_root: impl AsRef<Path>, local_root: Option<impl AsRef<Path>>) -> Self {
        Self {
            global: global_root.as_ref().join(HIDDEN_DIR),
            local: local_root.map(|root| root.as_ref().join(HIDDEN_DIR)),
        }
    }

    pub fn global_db(&self) -> PathBuf {
        self.global.join("floop.db")
    }

    pub fn local_db(&self) -> Option<PathBuf> {
        self.local.as_ref().map(|p| p.join("floop.db"))
    }

    /// Create the hidden directory with user-only (0700) permissions on
    /// Unix if it doesn't already exist.
    pub fn ensure_dir(dir: &Path) -> std::io::Result<()> {
        std::fs::create_dir_all(dir)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o700);
            std::fs::set_permissions(dir, perms)?;
        }
        Ok(())
    }
}
