use crate::state::{ChatMessage, FileSystemData};
use anyhow::{Context, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Work a visitor produced before signing in.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AnonWork {
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub file_system_data: FileSystemData,
}

impl AnonWork {
    pub fn new(messages: Vec<ChatMessage>, file_system_data: FileSystemData) -> Self {
        Self {
            messages,
            file_system_data,
        }
    }

    /// A record only counts as work once it holds at least one message.
    pub fn is_present(&self) -> bool {
        !self.messages.is_empty()
    }
}

/// Holds the single anonymous work record for this client.
///
/// Both operations are synchronous. After `clear` returns, `read` must report
/// no record.
pub trait AnonWorkStore: Send + Sync {
    fn read(&self) -> Result<Option<AnonWork>>;
    fn clear(&self) -> Result<()>;
}

#[derive(Clone, Default)]
pub struct MemoryAnonWorkStore {
    record: Arc<RwLock<Option<AnonWork>>>,
}

impl MemoryAnonWorkStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_work(work: AnonWork) -> Self {
        Self {
            record: Arc::new(RwLock::new(Some(work))),
        }
    }

    pub fn save(&self, work: AnonWork) {
        *self.record.write() = Some(work);
    }
}

impl AnonWorkStore for MemoryAnonWorkStore {
    fn read(&self) -> Result<Option<AnonWork>> {
        Ok(self.record.read().clone())
    }

    fn clear(&self) -> Result<()> {
        self.record.write().take();
        Ok(())
    }
}

/// Keeps the anonymous record as one JSON document on disk.
#[derive(Clone)]
pub struct FileAnonWorkStore {
    path: PathBuf,
}

impl FileAnonWorkStore {
    pub const FILE_NAME: &'static str = "anon-work.json";

    pub fn new(root: &Path) -> Self {
        Self {
            path: root.join(Self::FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self, work: &AnonWork) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed to create anon work directory at {}", parent.display())
            })?;
        }
        let serialized = serde_json::to_vec_pretty(work)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("failed to write anon work at {}", self.path.display()))?;
        Ok(())
    }
}

impl AnonWorkStore for FileAnonWorkStore {
    fn read(&self) -> Result<Option<AnonWork>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to read anon work at {}", self.path.display()))
            }
        };
        let work = serde_json::from_str(&contents)
            .with_context(|| format!("invalid anon work at {}", self.path.display()))?;
        Ok(Some(work))
    }

    fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err)
                .with_context(|| format!("failed to remove anon work at {}", self.path.display())),
        }
    }
}
