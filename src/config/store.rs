//! On-disk location of config.kdl and state.kdl.
//!
//! The directory is `$TPLSYNC_CONFIG_DIR` when set, otherwise
//! `<platform config dir>/tplsync` (e.g. `~/.config/tplsync`).

use std::fs;
use std::path::{Path, PathBuf};

use kdl::KdlDocument;

use crate::config::schema::{SyncConfig, SyncState};
use crate::{Error, Result};

/// Environment variable overriding the config directory.
pub const CONFIG_DIR_ENV: &str = "TPLSYNC_CONFIG_DIR";

const CONFIG_FILE: &str = "config.kdl";
const STATE_FILE: &str = "state.kdl";

/// Reads and writes the two KDL files in one directory.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    root: PathBuf,
}

impl ConfigStore {
    /// Store rooted at an explicit directory.
    pub fn at(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Store rooted at `$TPLSYNC_CONFIG_DIR` or the platform config dir.
    pub fn from_env() -> Result<Self> {
        if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
            if !dir.is_empty() {
                return Ok(Self::at(dir));
            }
        }
        dirs::config_dir()
            .map(|d| Self::at(d.join("tplsync")))
            .ok_or_else(|| Error::Other("Could not determine config directory".to_string()))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    pub fn state_path(&self) -> PathBuf {
        self.root.join(STATE_FILE)
    }

    /// Raw config.kdl document; empty when the file does not exist.
    pub fn read_config_kdl(&self) -> Result<KdlDocument> {
        read_kdl(&self.config_path())
    }

    pub fn read_config(&self) -> Result<SyncConfig> {
        Ok(SyncConfig::from_kdl(&self.read_config_kdl()?))
    }

    pub fn write_config(&self, config: &SyncConfig) -> Result<()> {
        config.validate().map_err(Error::InvalidInput)?;
        self.write_config_kdl(&config.to_kdl())
    }

    /// Write a raw config.kdl document (used when stripping a misplaced token).
    pub fn write_config_kdl(&self, doc: &KdlDocument) -> Result<()> {
        let path = self.config_path();
        write_file(&path, &doc.to_string())?;
        #[cfg(unix)]
        set_mode(&path, crate::config::schema::CONFIG_FILE_MODE)?;
        Ok(())
    }

    pub fn read_state(&self) -> Result<SyncState> {
        Ok(SyncState::from_kdl(&read_kdl(&self.state_path())?))
    }

    /// Write state.kdl, always restricted to the owner.
    pub fn write_state(&self, state: &SyncState) -> Result<()> {
        write_private_file(&self.state_path(), &state.to_kdl().to_string())
    }
}

fn read_kdl(path: &Path) -> Result<KdlDocument> {
    if !path.exists() {
        return Ok(KdlDocument::new());
    }
    let content = fs::read_to_string(path)?;
    Ok(content.parse::<KdlDocument>()?)
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    Ok(())
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))?;
    Ok(())
}

/// Write a file that must never be readable by anyone but the owner.
///
/// New files are created 0600; an existing file is narrowed to 0600 before
/// the new content goes in.
fn write_private_file(path: &Path, content: &str) -> Result<()> {
    use std::io::Write;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(crate::config::schema::STATE_FILE_MODE);
        if path.exists() {
            set_mode(path, crate::config::schema::STATE_FILE_MODE)?;
        }
    }
    let mut file = options.open(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}
