//! Decides where a freshly authenticated user lands.
//!
//! The decision itself is the pure [`Reconciliation::decide`]; [`Reconciler`]
//! gathers its inputs from the collaborators and carries the choice out.

use crate::navigation::{project_path, Navigator};
use crate::project::{NewProject, Project, ProjectStore};
use crate::store::{AnonWork, AnonWorkStore};
use anyhow::Result;
use chrono::{DateTime, Local, TimeZone, Utc};
use std::fmt::Display;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    /// Turn anonymous work into a new project.
    Migrate(AnonWork),
    /// Send the user to their most recent project.
    RedirectExisting { project_id: String },
    /// Start the user off with an empty project.
    CreateNew,
}

impl Reconciliation {
    /// `projects` must be ordered most recent first; it is ignored when there
    /// is anonymous work to migrate.
    pub fn decide(anon_work: Option<AnonWork>, projects: &[Project]) -> Self {
        if let Some(work) = anon_work.filter(AnonWork::is_present) {
            return Self::Migrate(work);
        }
        match projects.first() {
            Some(project) => Self::RedirectExisting {
                project_id: project.id.clone(),
            },
            None => Self::CreateNew,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Migrate(_) => "migrate",
            Self::RedirectExisting { .. } => "redirect_existing",
            Self::CreateNew => "create_new",
        }
    }
}

/// Produces names for projects created during reconciliation.
#[derive(Debug, Clone)]
pub struct ProjectNamer {
    next: Arc<AtomicU64>,
}

static SHARED_DESIGN_COUNTER: OnceLock<Arc<AtomicU64>> = OnceLock::new();

impl ProjectNamer {
    /// A namer with its own counter, independent of the process-wide one.
    pub fn starting_at(first: u64) -> Self {
        Self {
            next: Arc::new(AtomicU64::new(first)),
        }
    }

    pub fn migration_name<Tz: TimeZone>(&self, at: DateTime<Tz>) -> String
    where
        Tz::Offset: Display,
    {
        format!("Design from {}", at.format("%Y-%m-%d %H:%M:%S"))
    }

    pub fn new_design_name(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("New Design #{n}")
    }
}

impl Default for ProjectNamer {
    /// Every default namer in the process draws from one counter, so
    /// "New Design #n" never repeats within a process.
    fn default() -> Self {
        let shared = SHARED_DESIGN_COUNTER.get_or_init(|| {
            // Seeded from the clock so numbering differs between runs.
            Arc::new(AtomicU64::new(
                Utc::now().timestamp_millis().unsigned_abs() % 100_000,
            ))
        });
        Self {
            next: Arc::clone(shared),
        }
    }
}

/// Runs reconciliation against the configured collaborators.
#[derive(Clone)]
pub struct Reconciler {
    anon_work: Arc<dyn AnonWorkStore>,
    projects: Arc<dyn ProjectStore>,
    navigator: Arc<dyn Navigator>,
    namer: Arc<ProjectNamer>,
}

impl Reconciler {
    pub fn new(
        anon_work: Arc<dyn AnonWorkStore>,
        projects: Arc<dyn ProjectStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self::with_namer(anon_work, projects, navigator, ProjectNamer::default())
    }

    pub fn with_namer(
        anon_work: Arc<dyn AnonWorkStore>,
        projects: Arc<dyn ProjectStore>,
        navigator: Arc<dyn Navigator>,
        namer: ProjectNamer,
    ) -> Self {
        Self {
            anon_work,
            projects,
            navigator,
            namer: Arc::new(namer),
        }
    }

    pub async fn reconcile(&self) -> Result<()> {
        let stored = self.anon_work.read()?;
        if matches!(&stored, Some(work) if !work.is_present()) {
            warn!("ignoring anonymous work without messages");
        }
        let anon_work = stored.filter(AnonWork::is_present);
        let projects = match anon_work {
            Some(_) => Vec::new(),
            None => self.projects.list().await?,
        };
        let plan = Reconciliation::decide(anon_work, &projects);
        self.execute(plan).await
    }

    async fn execute(&self, plan: Reconciliation) -> Result<()> {
        let branch = plan.label();
        let project_id = match plan {
            Reconciliation::Migrate(work) => {
                let created = self
                    .projects
                    .create(NewProject {
                        name: self.namer.migration_name(Local::now()),
                        messages: work.messages,
                        data: work.file_system_data,
                    })
                    .await?;
                self.anon_work.clear()?;
                created.id
            }
            Reconciliation::RedirectExisting { project_id } => project_id,
            Reconciliation::CreateNew => {
                let created = self
                    .projects
                    .create(NewProject::empty(self.namer.new_design_name()))
                    .await?;
                created.id
            }
        };
        info!("branch" = branch, "project" = %project_id, "reconciled workspace");
        self.navigator.go_to(&project_path(&project_id));
        Ok(())
    }
}
