//! Profile existence routing.
//!
//! Decides, for a given marketplace role and page intent, whether the visitor
//! is sent to login, bounced between the new/edit pages, or shown the profile
//! form. All branching for the profile pages lives here; the page handlers in
//! [`crate::web`] only translate the decision into an HTTP response.

use anyhow::Result;
use async_trait::async_trait;

use crate::identity::Session;
use crate::storage::ProfileRow;

/// Marketplace side a profile belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Client,
    Provider,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Client => "client",
            Role::Provider => "provider",
        }
    }

    /// Profile table backing this role. The only per-role variation in the
    /// whole routing path — everything else is shared.
    pub fn table(&self) -> &'static str {
        match self {
            Role::Client => "client_profiles",
            Role::Provider => "provider_profiles",
        }
    }

    /// Page path for creating a profile of this role.
    pub fn new_path(&self) -> &'static str {
        match self {
            Role::Client => "/client/profile/new",
            Role::Provider => "/provider/profile/new",
        }
    }

    /// Page path for editing a profile of this role.
    pub fn edit_path(&self) -> &'static str {
        match self {
            Role::Client => "/client/profile/edit",
            Role::Provider => "/provider/profile/edit",
        }
    }

    /// Form submit path for this role.
    pub fn submit_path(&self) -> &'static str {
        match self {
            Role::Client => "/client/profile",
            Role::Provider => "/provider/profile",
        }
    }
}

/// Whether the current page means to create a profile or edit an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    New,
    Edit,
}

/// Outcome of a resolution — the caller redirects or renders accordingly.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteDecision {
    RedirectToLogin,
    RedirectToNew,
    RedirectToEdit,
    /// Show the profile form, prefilled when a record already exists.
    RenderForm(Option<ProfileRow>),
}

/// Read-only view of the profile store, one collection per role.
///
/// `exists` is the minimal probe used by the "new" flow; `fetch` returns the
/// full record for the "edit" flow. Implemented by [`crate::storage::Storage`]
/// and by in-memory doubles in tests.
#[async_trait]
pub trait ProfileLookup: Send + Sync {
    async fn exists(&self, role: Role, user_id: &str) -> Result<bool>;
    async fn fetch(&self, role: Role, user_id: &str) -> Result<Option<ProfileRow>>;
}

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// The profile store read failed. Propagated to the caller as-is — the
    /// resolver never retries.
    #[error("profile store unavailable: {0:#}")]
    StoreUnavailable(anyhow::Error),
}

/// Resolve which page a visitor sees.
///
/// Stateless: the decision depends only on the three inputs and the single
/// store read issued here. No writes occur — profile creation and mutation
/// belong to the form submit path.
pub async fn resolve(
    role: Role,
    intent: Intent,
    session: Option<&Session>,
    store: &dyn ProfileLookup,
) -> Result<RouteDecision, ResolveError> {
    // Unauthenticated short-circuits everything else.
    let Some(session) = session else {
        return Ok(RouteDecision::RedirectToLogin);
    };

    match intent {
        Intent::New => {
            let found = store
                .exists(role, &session.user_id)
                .await
                .map_err(ResolveError::StoreUnavailable)?;
            if found {
                Ok(RouteDecision::RedirectToEdit)
            } else {
                Ok(RouteDecision::RenderForm(None))
            }
        }
        Intent::Edit => {
            let profile = store
                .fetch(role, &session.user_id)
                .await
                .map_err(ResolveError::StoreUnavailable)?;
            match profile {
                Some(record) => Ok(RouteDecision::RenderForm(Some(record))),
                None => Ok(RouteDecision::RedirectToNew),
            }
        }
    }
}
