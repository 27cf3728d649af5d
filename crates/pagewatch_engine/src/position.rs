use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PositionError {
    #[error("position directory missing or not writable: {0}")]
    Dir(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Durable watermark of one job: the id of the newest item already seen.
///
/// The file holds exactly the id, nothing else. Saves go through
/// `{path}-tmp` followed by a rename, so readers see the old or the new
/// value and never a partial write. `save` takes `&mut self`; the owning job
/// is the only writer.
#[derive(Debug)]
pub struct PositionStore {
    path: PathBuf,
}

impl PositionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current watermark, or an empty string when there is none.
    ///
    /// Read failures are logged and treated as "no watermark" so a damaged
    /// file widens the next scrape instead of blocking it.
    pub fn read(&self) -> String {
        match fs::read_to_string(&self.path) {
            Ok(id) => id,
            Err(err) if err.kind() == io::ErrorKind::NotFound => String::new(),
            Err(err) => {
                log::warn!("Failed to read position file {:?}: {}", self.path, err);
                String::new()
            }
        }
    }

    pub fn save(&mut self, id: &str) -> Result<(), PositionError> {
        ensure_parent_dir(&self.path)?;

        let tmp = self.tmp_path();
        {
            let mut file = File::create(&tmp)?;
            file.write_all(id.as_bytes())?;
            file.flush()?;
            file.sync_all()?;
        }

        if let Err(err) = fs::rename(&tmp, &self.path) {
            let _ = fs::remove_file(&tmp);
            return Err(err.into());
        }
        sync_parent_dir(&self.path)?;
        Ok(())
    }

    pub fn tmp_path(&self) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push("-tmp");
        PathBuf::from(name)
    }
}

fn ensure_parent_dir(path: &Path) -> Result<(), PositionError> {
    let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) else {
        return Ok(());
    };
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| PositionError::Dir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(PositionError::Dir("path is not a directory".into()));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| PositionError::Dir(e.to_string()))?;
    }
    Ok(())
}

/// Persist the rename itself by syncing the directory entry.
#[cfg(unix)]
fn sync_parent_dir(path: &Path) -> io::Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_parent_dir(_path: &Path) -> io::Result<()> {
    Ok(())
}
