// web/routes/profiles.rs — profile page handlers.
//
// All four GET pages funnel into `profile_page`; role and intent are the only
// variation between them. The branching itself lives in `crate::routing`.

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::warn;

use crate::identity::{bearer_token, Session};
use crate::routing::{self, Intent, Role, RouteDecision};
use crate::AppContext;

/// Resolve the visitor's session from the Authorization header.
///
/// A missing or non-bearer header is plain "unauthenticated" (`None`); only a
/// failure to reach the identity provider is an error.
async fn current_session(ctx: &AppContext, headers: &HeaderMap) -> anyhow::Result<Option<Session>> {
    let Some(value) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
    else {
        return Ok(None);
    };
    let Some(token) = bearer_token(value) else {
        return Ok(None);
    };
    ctx.identity.current_user(token).await
}

async fn profile_page(
    ctx: Arc<AppContext>,
    headers: HeaderMap,
    role: Role,
    intent: Intent,
) -> Response {
    let session = match current_session(&ctx, &headers).await {
        Ok(session) => session,
        Err(e) => {
            warn!(role = role.as_str(), error = %format!("{e:#}"), "identity lookup failed");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let decision =
        match routing::resolve(role, intent, session.as_ref(), ctx.storage.as_ref()).await {
            Ok(decision) => decision,
            Err(e) => {
                warn!(role = role.as_str(), error = %format!("{e:#}"), "profile routing failed");
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
        };

    match decision {
        RouteDecision::RedirectToLogin => Redirect::to(&ctx.config.login_path).into_response(),
        RouteDecision::RedirectToNew => Redirect::to(role.new_path()).into_response(),
        RouteDecision::RedirectToEdit => Redirect::to(role.edit_path()).into_response(),
        RouteDecision::RenderForm(profile) => {
            Html(ctx.forms.render(role, profile.as_ref())).into_response()
        }
    }
}

pub async fn client_new(State(ctx): State<Arc<AppContext>>, headers: HeaderMap) -> Response {
    profile_page(ctx, headers, Role::Client, Intent::New).await
}

pub async fn client_edit(State(ctx): State<Arc<AppContext>>, headers: HeaderMap) -> Response {
    profile_page(ctx, headers, Role::Client, Intent::Edit).await
}

pub async fn provider_new(State(ctx): State<Arc<AppContext>>, headers: HeaderMap) -> Response {
    profile_page(ctx, headers, Role::Provider, Intent::New).await
}

pub async fn provider_edit(State(ctx): State<Arc<AppContext>>, headers: HeaderMap) -> Response {
    profile_page(ctx, headers, Role::Provider, Intent::Edit).await
}

// ─── Form submit ─────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ProfileForm {
    pub display_name: String,
    #[serde(default)]
    pub bio: String,
}

async fn profile_submit(
    ctx: Arc<AppContext>,
    headers: HeaderMap,
    role: Role,
    form: ProfileForm,
) -> Response {
    let session = match current_session(&ctx, &headers).await {
        Ok(Some(session)) => session,
        Ok(None) => return Redirect::to(&ctx.config.login_path).into_response(),
        Err(e) => {
            warn!(role = role.as_str(), error = %format!("{e:#}"), "identity lookup failed");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    match ctx
        .storage
        .upsert_profile(role, &session.user_id, &form.display_name, &form.bio)
        .await
    {
        Ok(_) => Redirect::to(role.edit_path()).into_response(),
        Err(e) => {
            warn!(role = role.as_str(), error = %format!("{e:#}"), "profile save failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub async fn client_submit(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
    Form(form): Form<ProfileForm>,
) -> Response {
    profile_submit(ctx, headers, Role::Client, form).await
}

pub async fn provider_submit(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
    Form(form): Form<ProfileForm>,
) -> Response {
    profile_submit(ctx, headers, Role::Provider, form).await
}
