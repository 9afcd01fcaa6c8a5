use anyhow::Result;
use std::collections::HashMap;
use std::path::PathBuf;

/// Key-value blob storage with best-effort durability. The session keeps
/// working when a store call fails; failures are logged (and surfaced as a
/// notification when a user action triggered them).
pub trait SnapshotStore {
    fn load(&self, key: &str) -> Result<Option<String>>;
    fn save(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// In-memory store for tests and embeddings that persist elsewhere.
#[derive(Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn save(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// One file per key under a data directory.
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Store rooted at the platform data directory, overridable through
    /// `MARKPAD_DATA_DIR`.
    pub fn open_default() -> Result<Self> {
        Self::new(Self::default_dir()?)
    }

    fn default_dir() -> Result<PathBuf> {
        if let Ok(dir) = std::env::var("MARKPAD_DATA_DIR") {
            return Ok(PathBuf::from(dir));
        }
        let dirs = directories::ProjectDirs::from("com", "markpad", "markpad")
            .ok_or_else(|| anyhow::anyhow!("Could not determine a data directory"))?;
        Ok(dirs.data_dir().to_path_buf())
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.dat", key))
    }
}

impl SnapshotStore for JsonFileStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&mut self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key);
        std::fs::write(&path, value)
            .map_err(|e| anyhow::anyhow!("Failed to write {}: {}", path.display(), e))
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
