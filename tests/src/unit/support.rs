//! Spy collaborators that record every call into one shared log.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use atelier_core::{
    AnonWork, AnonWorkStore, AuthController, ChatMessage, CreatedProject, CredentialExchange,
    CredentialMode, CredentialResult, FileSystemData, Navigator, NewProject, Project,
    ProjectStore, Reconciler,
};
use chrono::Utc;
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct CallLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl CallLog {
    fn push(&self, entry: impl Into<String>) {
        self.entries.lock().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.entries
            .lock()
            .iter()
            .filter(|entry| entry.starts_with(prefix))
            .count()
    }
}

pub struct ScriptedExchange {
    outcome: Mutex<Option<Result<CredentialResult>>>,
    pub calls: Mutex<Vec<(CredentialMode, String, String)>>,
}

impl ScriptedExchange {
    fn answer(
        &self,
        mode: CredentialMode,
        email: &str,
        password: &str,
    ) -> Result<CredentialResult> {
        self.calls
            .lock()
            .push((mode, email.to_owned(), password.to_owned()));
        self.outcome
            .lock()
            .take()
            .expect("exchange answers once per test")
    }
}

#[async_trait]
impl CredentialExchange for ScriptedExchange {
    async fn sign_in(&self, email: &str, password: &str) -> Result<CredentialResult> {
        self.answer(CredentialMode::SignIn, email, password)
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<CredentialResult> {
        self.answer(CredentialMode::SignUp, email, password)
    }
}

pub struct SpyAnonStore {
    record: Mutex<Option<AnonWork>>,
    read_error: Mutex<Option<String>>,
    log: CallLog,
}

impl AnonWorkStore for SpyAnonStore {
    fn read(&self) -> Result<Option<AnonWork>> {
        self.log.push("anon.read");
        if let Some(message) = self.read_error.lock().clone() {
            return Err(anyhow!(message));
        }
        Ok(self.record.lock().clone())
    }

    fn clear(&self) -> Result<()> {
        self.log.push("anon.clear");
        self.record.lock().take();
        Ok(())
    }
}

pub struct SpyProjects {
    existing: Vec<Project>,
    created_id: String,
    pub created: Mutex<Vec<NewProject>>,
    create_error: Mutex<Option<String>>,
    log: CallLog,
}

#[async_trait]
impl ProjectStore for SpyProjects {
    async fn list(&self) -> Result<Vec<Project>> {
        self.log.push("projects.list");
        Ok(self.existing.clone())
    }

    async fn create(&self, project: NewProject) -> Result<CreatedProject> {
        self.log.push("projects.create");
        if let Some(message) = self.create_error.lock().clone() {
            return Err(anyhow!(message));
        }
        self.created.lock().push(project);
        Ok(CreatedProject {
            id: self.created_id.clone(),
        })
    }
}

pub struct SpyNavigator {
    log: CallLog,
}

impl Navigator for SpyNavigator {
    fn go_to(&self, path: &str) {
        self.log.push(format!("navigate:{path}"));
    }
}

pub struct Harness {
    pub controller: AuthController,
    pub exchange: Arc<ScriptedExchange>,
    pub anon: Arc<SpyAnonStore>,
    pub projects: Arc<SpyProjects>,
    pub log: CallLog,
}

impl Harness {
    pub fn new(
        outcome: Result<CredentialResult>,
        anon_work: Option<AnonWork>,
        existing: Vec<Project>,
        created_id: &str,
    ) -> Self {
        let log = CallLog::default();
        let exchange = Arc::new(ScriptedExchange {
            outcome: Mutex::new(Some(outcome)),
            calls: Mutex::new(Vec::new()),
        });
        let anon = Arc::new(SpyAnonStore {
            record: Mutex::new(anon_work),
            read_error: Mutex::new(None),
            log: log.clone(),
        });
        let projects = Arc::new(SpyProjects {
            existing,
            created_id: created_id.to_owned(),
            created: Mutex::new(Vec::new()),
            create_error: Mutex::new(None),
            log: log.clone(),
        });
        let navigator = Arc::new(SpyNavigator { log: log.clone() });
        let reconciler = Reconciler::new(anon.clone(), projects.clone(), navigator);
        let controller = AuthController::new(exchange.clone(), reconciler);
        Self {
            controller,
            exchange,
            anon,
            projects,
            log,
        }
    }

    /// Makes every later `AnonWorkStore::read` fail with `message`.
    pub fn fail_anon_reads(&self, message: &str) {
        *self.anon.read_error.lock() = Some(message.to_owned());
    }

    /// Makes every later `ProjectStore::create` fail with `message`.
    pub fn fail_project_creation(&self, message: &str) {
        *self.projects.create_error.lock() = Some(message.to_owned());
    }

    pub fn navigations(&self) -> Vec<String> {
        self.log
            .entries()
            .into_iter()
            .filter_map(|entry| entry.strip_prefix("navigate:").map(str::to_owned))
            .collect()
    }

    pub fn anon_record(&self) -> Option<AnonWork> {
        self.anon.record.lock().clone()
    }

    pub fn created(&self) -> Vec<NewProject> {
        self.projects.created.lock().clone()
    }
}

pub fn anon_work(content: &str, files: &[(&str, &str)]) -> AnonWork {
    let data: FileSystemData = files
        .iter()
        .map(|(path, body)| (path.to_string(), body.to_string()))
        .collect();
    let messages = if content.is_empty() {
        Vec::new()
    } else {
        vec![ChatMessage::user(content)]
    };
    AnonWork::new(messages, data)
}

pub fn project(id: &str) -> Project {
    Project {
        id: id.to_owned(),
        name: id.to_owned(),
        created_at: Utc::now(),
    }
}

pub fn is_new_design_name(name: &str) -> bool {
    name.strip_prefix("New Design #")
        .map(|suffix| !suffix.is_empty() && suffix.chars().all(|ch| ch.is_ascii_digit()))
        .unwrap_or(false)
}
