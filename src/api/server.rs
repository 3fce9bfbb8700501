use anyhow::Result;
use axum::{
    extract::Request,
    middleware::{self, Next},
    response::Response,
    routing::{delete, get, patch, post},
    Router,
};
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::CorsLayer;

use crate::api::handlers;
use crate::engine::AgencyService;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<AgencyService>,
}

pub fn create_router(state: AppState) -> Router {
    let agents = Router::new()
        .route("/create", post(handlers::create_agent))
        .route("/update/:id", patch(handlers::update_agent))
        .route("/delete/:id", delete(handlers::delete_agent))
        .route("/single/:id", get(handlers::get_agent))
        .route("/list", get(handlers::list_agents));

    let missions = Router::new()
        .route("/create", post(handlers::create_mission))
        .route("/:id/assign_to_cat", post(handlers::assign_agent))
        .route("/:id/add_target", patch(handlers::add_target))
        .route(
            "/:id/delete_target/:target_id",
            delete(handlers::delete_target),
        )
        .route(
            "/:id/target/:target_id/notes",
            patch(handlers::update_target_notes),
        )
        .route(
            "/:id/target/:target_id/complete",
            patch(handlers::complete_target),
        )
        .route("/delete/:id", delete(handlers::delete_mission))
        .route("/list", get(handlers::list_missions))
        .route("/single/:id", get(handlers::get_mission))
        .route("/complete/:id", patch(handlers::complete_mission));

    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/agents", agents)
        .nest("/missions", missions)
        .layer(middleware::from_fn(log_requests))
        .layer(CorsLayer::permissive())
        .with_state(state.service)
}

async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    log::info!("Started {} {}", method, uri);
    let response = next.run(request).await;
    log::info!(
        "Completed {} in {:?} with status {}",
        uri,
        start.elapsed(),
        response.status().as_u16()
    );

    response
}

pub async fn serve(state: AppState, host: &str, port: u16) -> Result<()> {
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(format!("{}:{}", host, port)).await?;

    log::info!("spycat API listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
