// web/mod.rs — HTTP page surface.
//
// Axum server for the profile pages. Each handler resolves the visitor's
// session, runs the routing resolver, and maps the decision to a redirect or
// a rendered form.
//
// Routes:
//   GET  /client/profile/new
//   GET  /client/profile/edit
//   GET  /provider/profile/new
//   GET  /provider/profile/edit
//   POST /client/profile
//   POST /provider/profile
//   GET  /healthz

pub mod routes;

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::AppContext;

pub async fn start_server(ctx: Arc<AppContext>) -> Result<()> {
    let bind = format!("{}:{}", ctx.config.bind_address, ctx.config.port);
    let addr: SocketAddr = bind.parse()?;

    let router = build_router(ctx);

    info!("profile pages listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}

pub fn build_router(ctx: Arc<AppContext>) -> Router {
    Router::new()
        // Health (no auth)
        .route("/healthz", get(routes::health::health))
        // Profile pages
        .route("/client/profile/new", get(routes::profiles::client_new))
        .route("/client/profile/edit", get(routes::profiles::client_edit))
        .route("/provider/profile/new", get(routes::profiles::provider_new))
        .route("/provider/profile/edit", get(routes::profiles::provider_edit))
        // Form submits (persistence seam of the Form Renderer collaborator)
        .route("/client/profile", post(routes::profiles::client_submit))
        .route("/provider/profile", post(routes::profiles::provider_submit))
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}
