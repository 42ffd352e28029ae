use crate::session::Session;
use crate::state::{ChatMessage, FileSystemData};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;
use walkdir::WalkDir;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Input for [`ProjectStore::create`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewProject {
    pub name: String,
    pub messages: Vec<ChatMessage>,
    pub data: FileSystemData,
}

impl NewProject {
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedProject {
    pub id: String,
}

/// Persistence backend for the signed-in user's projects.
#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// Projects ordered most recent first. May be empty.
    async fn list(&self) -> Result<Vec<Project>>;
    async fn create(&self, project: NewProject) -> Result<CreatedProject>;
}

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(anyhow!("project name cannot be empty"));
    }
    Ok(())
}

#[derive(Clone, Default)]
pub struct MemoryProjectStore {
    inner: Arc<RwLock<Vec<StoredProject>>>,
}

impl MemoryProjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a stored project together with its contents.
    pub fn get(&self, id: &str) -> Option<StoredProject> {
        self.inner
            .read()
            .iter()
            .find(|stored| stored.project.id == id)
            .cloned()
    }
}

#[async_trait]
impl ProjectStore for MemoryProjectStore {
    async fn list(&self) -> Result<Vec<Project>> {
        Ok(self
            .inner
            .read()
            .iter()
            .map(|stored| stored.project.clone())
            .collect())
    }

    async fn create(&self, project: NewProject) -> Result<CreatedProject> {
        validate_name(&project.name)?;
        let id = Uuid::new_v4().to_string();
        let stored = StoredProject {
            project: Project {
                id: id.clone(),
                name: project.name,
                created_at: Utc::now(),
            },
            messages: project.messages,
            data: project.data,
        };
        self.inner.write().insert(0, stored);
        Ok(CreatedProject { id })
    }
}

/// A project with the conversation and files it was created with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredProject {
    pub project: Project,
    pub messages: Vec<ChatMessage>,
    pub data: FileSystemData,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct ProjectManifest {
    version: u32,
    id: String,
    name: String,
    created_utc: DateTime<Utc>,
}

impl From<ProjectManifest> for Project {
    fn from(manifest: ProjectManifest) -> Self {
        Self {
            id: manifest.id,
            name: manifest.name,
            created_at: manifest.created_utc,
        }
    }
}

/// Stores every project in its own directory.
///
/// Unscoped stores keep projects under `<root>/projects`; session-scoped
/// stores keep each account's projects under
/// `<root>/accounts/<account key>/projects`.
///
/// Layout per project:
/// - `project.toml` manifest
/// - `messages.jsonl`, one chat message per line
/// - `data.json`, the file system map
#[derive(Clone)]
pub struct FileProjectStore {
    base: PathBuf,
    session: Option<Session>,
}

impl FileProjectStore {
    const MANIFEST: &'static str = "project.toml";
    const MESSAGES: &'static str = "messages.jsonl";
    const DATA: &'static str = "data.json";

    pub fn new(root: &Path) -> Self {
        Self {
            base: root.to_path_buf(),
            session: None,
        }
    }

    /// Projects belong to whichever account `session` is signed in as.
    pub fn for_session(root: &Path, session: Session) -> Self {
        Self {
            base: root.to_path_buf(),
            session: Some(session),
        }
    }

    pub fn projects_dir(&self) -> Result<PathBuf> {
        match &self.session {
            None => Ok(self.base.join("projects")),
            Some(session) => {
                let key = session
                    .account_key()
                    .ok_or_else(|| anyhow!("no signed-in account for project storage"))?;
                Ok(self.base.join("accounts").join(key).join("projects"))
            }
        }
    }

    fn read_manifest(path: &Path) -> Result<ProjectManifest> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read project manifest at {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("invalid project manifest at {}", path.display()))
    }

    pub fn open(&self, id: &str) -> Result<StoredProject> {
        let dir = self.projects_dir()?.join(id);
        let manifest_path = dir.join(Self::MANIFEST);
        if !manifest_path.exists() {
            return Err(anyhow!("project {id} does not exist"));
        }
        let manifest = Self::read_manifest(&manifest_path)?;

        let mut messages = Vec::new();
        let messages_path = dir.join(Self::MESSAGES);
        if messages_path.exists() {
            let file = File::open(&messages_path).with_context(|| {
                format!("failed to open project messages at {}", messages_path.display())
            })?;
            for line in BufReader::new(file).lines() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                messages.push(serde_json::from_str(&line)?);
            }
        }

        let data_path = dir.join(Self::DATA);
        let data = match fs::read_to_string(&data_path) {
            Ok(contents) => serde_json::from_str(&contents)
                .with_context(|| format!("invalid project data at {}", data_path.display()))?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => FileSystemData::new(),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to read project data at {}", data_path.display()))
            }
        };

        Ok(StoredProject {
            project: manifest.into(),
            messages,
            data,
        })
    }

    fn create_at(&self, id: String, dir: &Path, project: NewProject) -> Result<CreatedProject> {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create project directory at {}", dir.display()))?;
        if let Err(err) = Self::write_project(&id, dir, project) {
            if let Err(cleanup) = fs::remove_dir_all(dir) {
                tracing::warn!(%cleanup, "failed to remove incomplete project directory");
            }
            return Err(err);
        }
        Ok(CreatedProject { id })
    }

    fn write_project(id: &str, dir: &Path, project: NewProject) -> Result<()> {
        let messages_path = dir.join(Self::MESSAGES);
        let mut messages = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&messages_path)
            .with_context(|| {
                format!("failed to open project messages at {}", messages_path.display())
            })?;
        for message in &project.messages {
            messages.write_all(&serde_json::to_vec(message)?)?;
            messages.write_all(b"\n")?;
        }
        let data_path = dir.join(Self::DATA);
        fs::write(&data_path, serde_json::to_vec_pretty(&project.data)?)
            .with_context(|| format!("failed to write project data at {}", data_path.display()))?;

        // The manifest goes last so `list` never sees a half-written project.
        let manifest = ProjectManifest {
            version: 1,
            id: id.to_owned(),
            name: project.name.trim().to_string(),
            created_utc: Utc::now(),
        };
        let manifest_path = dir.join(Self::MANIFEST);
        fs::write(&manifest_path, toml::to_string_pretty(&manifest)?).with_context(|| {
            format!("failed to write manifest at {}", manifest_path.display())
        })?;
        Ok(())
    }
}

#[async_trait]
impl ProjectStore for FileProjectStore {
    async fn list(&self) -> Result<Vec<Project>> {
        let mut projects = Vec::new();
        let root = self.projects_dir()?;
        if !root.exists() {
            return Ok(projects);
        }
        for entry in WalkDir::new(&root)
            .min_depth(2)
            .max_depth(2)
            .into_iter()
            .filter_map(|entry| entry.ok())
        {
            if !entry.file_type().is_file() || entry.file_name() != Self::MANIFEST {
                continue;
            }
            match Self::read_manifest(entry.path()) {
                Ok(manifest) => projects.push(Project::from(manifest)),
                Err(err) => tracing::warn!(%err, "skipping unreadable project"),
            }
        }
        projects.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(projects)
    }

    async fn create(&self, project: NewProject) -> Result<CreatedProject> {
        validate_name(&project.name)?;
        let id = Uuid::new_v4().to_string();
        let dir = self.projects_dir()?.join(&id);
        self.create_at(id, &dir, project)
    }
}
