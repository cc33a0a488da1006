pub mod config;
pub mod forms;
pub mod identity;
pub mod routing;
pub mod storage;
pub mod tools;
pub mod web;

use std::sync::Arc;

use config::AppConfig;
use forms::FormRenderer;
use identity::IdentityProvider;
use storage::Storage;

/// Shared application state passed to every page handler.
///
/// All collaborators are injected here rather than reached through globals so
/// the routing logic stays testable with in-memory doubles.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<AppConfig>,
    pub storage: Arc<Storage>,
    /// Identity Provider collaborator — resolves bearer tokens to sessions.
    pub identity: Arc<dyn IdentityProvider>,
    /// Form Renderer collaborator — owns the profile form markup.
    pub forms: Arc<dyn FormRenderer>,
    pub started_at: std::time::Instant,
}
