use axum::http::HeaderValue;
use axum::{
    routing::{get, post, put},
    Router,
};
use chrono::{DateTime, NaiveDateTime, Utc};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub mod collaborations;
pub mod connections;
pub mod health;
pub mod invitations;

pub fn create_router(state: AppState) -> Router<()> {
    let allow_origin = match state.config.cors_allowed_origin.as_deref() {
        Some(origins) => AllowOrigin::list(parse_origins(origins)),
        None => AllowOrigin::mirror_request(),
    };
    let cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true);

    let invitation_routes = Router::new()
        .route("/", post(invitations::create_invitation))
        .route("/process-expired", post(invitations::process_expired))
        .route("/sent/:sender_id", get(invitations::list_sent))
        .route("/received/:recipient_id", get(invitations::list_received))
        .route("/pending/:recipient_id", get(invitations::list_pending))
        .route(
            "/pending/:recipient_id/all",
            get(invitations::list_all_pending),
        )
        .route(
            "/pending/:recipient_id/count",
            get(invitations::count_pending),
        )
        .route("/type/:recipient_id/:type", get(invitations::list_by_type))
        .route(
            "/:id",
            get(invitations::get_invitation).delete(invitations::delete_invitation),
        )
        .route("/:id/respond", post(invitations::respond_to_invitation))
        .route("/:id/cancel", post(invitations::cancel_invitation));

    let collaboration_routes = Router::new()
        .route("/", post(collaborations::add_collaborator))
        .route("/check", get(collaborations::is_collaborator))
        .route("/permission", get(collaborations::has_permission))
        .route("/admin/:user_id", get(collaborations::list_admin_boards))
        .route(
            "/board/:board_id",
            get(collaborations::list_board_collaborators),
        )
        .route(
            "/board/:board_id/paged",
            get(collaborations::page_board_collaborators),
        )
        .route(
            "/board/:board_id/count",
            get(collaborations::count_collaborators),
        )
        .route(
            "/board/:board_id/user/:user_id",
            get(collaborations::get_collaboration),
        )
        .route(
            "/user/:user_id",
            get(collaborations::list_user_collaborations),
        )
        .route(
            "/user/:user_id/paged",
            get(collaborations::page_user_collaborations),
        )
        .route(
            "/:id",
            get(collaborations::find_collaboration).delete(collaborations::remove_collaborator),
        )
        .route("/:id/status", put(collaborations::update_status))
        .route("/:id/permission", put(collaborations::update_permission));

    let connection_routes = Router::new()
        .route("/", post(connections::create_connection))
        .route("/status", get(connections::is_following))
        .route(
            "/between/:follower_id/:following_id",
            get(connections::get_between),
        )
        .route("/followers/:user_id", get(connections::list_followers))
        .route("/followers/:user_id/paged", get(connections::page_followers))
        .route("/followers/:user_id/count", get(connections::count_followers))
        .route("/following/:user_id", get(connections::list_following))
        .route("/following/:user_id/paged", get(connections::page_following))
        .route("/following/:user_id/count", get(connections::count_following))
        .route("/mutual/:user_id", get(connections::list_mutual))
        .route("/mutual/:user_id/paged", get(connections::page_mutual))
        .route("/block/:user_id/:target_id", post(connections::block_user))
        .route(
            "/unblock/:user_id/:target_id",
            post(connections::unblock_user),
        )
        .route("/blocked/:user_id", get(connections::list_blocked))
        .route(
            "/:id",
            get(connections::get_connection).delete(connections::delete_connection),
        )
        .route("/:id/status", put(connections::update_connection_status));

    Router::new()
        .nest("/api/invitations", invitation_routes)
        .nest("/api/collaborations", collaboration_routes)
        .nest("/api/connections", connection_routes)
        .route("/api/health", get(health::health_check))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

fn parse_origins(origins: &str) -> Vec<HeaderValue> {
    origins
        .split(',')
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .filter_map(|value| match value.parse::<HeaderValue>() {
            Ok(header) => Some(header),
            Err(_) => {
                tracing::warn!(origin = value, "ignoring invalid CORS allowed origin");
                None
            }
        })
        .collect()
}

pub(crate) fn to_iso(dt: NaiveDateTime) -> String {
    DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc).to_rfc3339()
}
