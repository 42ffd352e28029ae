pub mod auth;
pub mod config;
pub mod credentials;
pub mod navigation;
pub mod project;
pub mod reconcile;
pub mod session;
pub mod state;
pub mod store;
pub mod telemetry;

pub use auth::{AuthController, AuthEvent, AuthState};
pub use config::{AtelierConfig, ConfigError};
pub use credentials::{
    CredentialExchange, CredentialMode, CredentialResult, HttpCredentialExchange,
    InMemoryCredentialExchange,
};
pub use navigation::{project_path, LoggingNavigator, Navigator, RecordingNavigator};
pub use project::{
    CreatedProject, FileProjectStore, MemoryProjectStore, NewProject, Project, ProjectStore,
    StoredProject,
};
pub use reconcile::{ProjectNamer, Reconciler, Reconciliation};
pub use session::Session;
pub use state::{ChatMessage, FileSystemData, MessageRole};
pub use store::{AnonWork, AnonWorkStore, FileAnonWorkStore, MemoryAnonWorkStore};
