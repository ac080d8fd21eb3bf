use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, patch, post, put},
    Router,
};
use domain::services::moderation::ToxicityClassifier;
use shared::jwt::JwtConfig;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::config::Config;
use crate::middleware::{
    metrics_handler, metrics_middleware, rate_limit_middleware, security_headers_middleware,
    trace_id, RateLimiterState,
};
use crate::routes::{
    auth, challenges, conversations, functions, groups, health, matches, moderation,
    notifications, posts, profiles, streaks, wellness,
};
use crate::services::{MediaStore, PerspectiveClient};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub jwt: Arc<JwtConfig>,
    /// `None` when moderation is disabled; posts are then not screened.
    pub classifier: Option<Arc<dyn ToxicityClassifier>>,
    pub media: MediaStore,
    pub rate_limiter: Option<Arc<RateLimiterState>>,
}

#[derive(Debug, Error)]
pub enum AppInitError {
    #[error("JWT configuration: {0}")]
    Jwt(#[from] shared::jwt::JwtError),

    #[error("Moderation client: {0}")]
    Moderation(#[from] reqwest::Error),
}

impl AppState {
    pub fn new(config: Config, pool: PgPool) -> Result<Self, AppInitError> {
        let jwt = Arc::new(config.jwt.signer()?);

        let classifier: Option<Arc<dyn ToxicityClassifier>> = if config.moderation.is_active() {
            info!(threshold = config.moderation.threshold, "Toxicity screening enabled");
            Some(Arc::new(PerspectiveClient::new(&config.moderation)?))
        } else {
            if config.moderation.enabled {
                warn!(
                    "Moderation enabled without a Perspective API key; posts will not be screened"
                );
            }
            None
        };

        let media = MediaStore::new(
            config.media.storage_root.clone(),
            config.media.max_upload_bytes,
        );
        let rate_limiter =
            RateLimiterState::new(config.security.rate_limit_per_minute).map(Arc::new);

        Ok(Self {
            pool,
            config: Arc::new(config),
            jwt,
            classifier,
            media,
            rate_limiter,
        })
    }
}

pub fn create_app(state: AppState) -> Router {
    let config = state.config.clone();

    let cors = if config.security.cors_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        use tower_http::cors::AllowOrigin;
        let origins: Vec<_> = config
            .security
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    let auth_routes = Router::new()
        .route("/api/v1/auth/register", post(auth::register))
        .route("/api/v1/auth/login", post(auth::login))
        .route("/api/v1/auth/refresh", post(auth::refresh));

    // Handlers authenticate through the UserAuth extractor.
    let protected_routes = Router::new()
        // Profiles and follows
        .route(
            "/api/v1/profiles/me",
            get(profiles::get_my_profile).put(profiles::update_my_profile),
        )
        .route("/api/v1/profiles/me/role", get(profiles::get_my_role))
        .route("/api/v1/profiles/:user_id", get(profiles::get_user_profile))
        .route(
            "/api/v1/profiles/:user_id/follow",
            post(profiles::follow).delete(profiles::unfollow),
        )
        .route("/api/v1/profiles/:user_id/followers", get(profiles::followers))
        .route("/api/v1/profiles/:user_id/following", get(profiles::following))
        .route("/api/v1/premium/activate", post(profiles::activate_premium))
        .route("/api/v1/premium/cancel", post(profiles::cancel_premium))
        .route("/api/v1/premium/status", get(profiles::premium_status))
        // Posts, votes and comments
        .route("/api/v1/posts", post(posts::create_post))
        .route("/api/v1/posts/feed", get(posts::feed))
        .route(
            "/api/v1/posts/:post_id",
            get(posts::get_post).delete(posts::delete_post),
        )
        .route("/api/v1/posts/:post_id/vote", put(posts::vote))
        .route(
            "/api/v1/posts/:post_id/comments",
            get(posts::list_comments).post(posts::add_comment),
        )
        .route(
            "/api/v1/posts/:post_id/comments/:comment_id",
            delete(posts::delete_comment),
        )
        .route("/api/v1/posts/:post_id/report", post(moderation::report_post))
        .route(
            "/api/v1/moderation/flagged-posts",
            get(moderation::list_flagged_posts),
        )
        // Direct messages
        .route(
            "/api/v1/conversations",
            get(conversations::list_conversations).post(conversations::start_conversation),
        )
        .route(
            "/api/v1/conversations/requests",
            get(conversations::pending_requests),
        )
        .route(
            "/api/v1/conversations/:conversation_id/messages",
            get(conversations::list_messages).post(conversations::send_message),
        )
        .route(
            "/api/v1/conversations/:conversation_id/accept",
            post(conversations::accept_request),
        )
        .route(
            "/api/v1/conversations/:conversation_id/decline",
            post(conversations::decline_request),
        )
        // Groups
        .route(
            "/api/v1/groups",
            get(groups::list_groups).post(groups::create_group),
        )
        .route(
            "/api/v1/groups/:group_id",
            get(groups::get_group).delete(groups::delete_group),
        )
        .route("/api/v1/groups/:group_id/join", post(groups::join_group))
        .route("/api/v1/groups/:group_id/leave", post(groups::leave_group))
        .route(
            "/api/v1/groups/:group_id/members",
            get(groups::list_members).post(groups::add_member),
        )
        .route(
            "/api/v1/groups/:group_id/members/:user_id",
            delete(groups::remove_member),
        )
        .route(
            "/api/v1/groups/:group_id/members/:user_id/promote",
            post(groups::promote_member),
        )
        .route(
            "/api/v1/groups/:group_id/members/:user_id/warn",
            post(groups::issue_warning),
        )
        .route(
            "/api/v1/groups/:group_id/settings",
            patch(groups::update_group_settings),
        )
        .route(
            "/api/v1/groups/:group_id/invitations",
            post(groups::invite_user),
        )
        .route(
            "/api/v1/groups/:group_id/messages",
            get(groups::list_group_messages).post(groups::send_group_message),
        )
        // Streaks
        .route(
            "/api/v1/groups/:group_id/streaks",
            get(streaks::available_streaks).post(streaks::create_streak),
        )
        .route(
            "/api/v1/groups/:group_id/streaks/leaderboard",
            get(streaks::leaderboard),
        )
        .route(
            "/api/v1/groups/:group_id/streaks/updates",
            get(streaks::daily_updates),
        )
        .route(
            "/api/v1/groups/:group_id/streaks/:activity_type/accept",
            post(streaks::accept_streak),
        )
        .route(
            "/api/v1/groups/:group_id/streaks/:activity_type/check-in",
            post(streaks::check_in),
        )
        .route("/api/v1/streaks/me", get(streaks::my_streaks))
        // Challenges
        .route("/api/v1/challenges", post(challenges::create_challenge))
        .route(
            "/api/v1/challenges/official",
            get(challenges::official_challenges),
        )
        .route(
            "/api/v1/challenges/:group_id/proofs",
            post(challenges::submit_proof),
        )
        .route(
            "/api/v1/challenges/:group_id/proof-today",
            get(challenges::has_proof_today),
        )
        .route(
            "/api/v1/challenges/:group_id/progress",
            get(challenges::challenge_progress),
        )
        .route(
            "/api/v1/challenges/:group_id/leave",
            post(challenges::leave_challenge),
        )
        // Matching
        .route("/api/v1/matches/available", get(matches::available_users))
        .route(
            "/api/v1/matches/requests",
            get(matches::pending_match_requests).post(matches::send_match_request),
        )
        .route(
            "/api/v1/matches/requests/:request_id/accept",
            post(matches::accept_match_request),
        )
        .route(
            "/api/v1/matches/requests/:request_id/decline",
            post(matches::decline_match_request),
        )
        .route("/api/v1/matches/active", get(matches::active_match))
        .route("/api/v1/matches/:match_id/extend", post(matches::extend_match))
        .route("/api/v1/matches/:match_id/end", post(matches::end_match))
        .route(
            "/api/v1/matches/:match_id/messages",
            get(matches::list_match_messages).post(matches::send_match_message),
        )
        // Wellness
        .route(
            "/api/v1/moods",
            get(wellness::list_moods).post(wellness::log_mood),
        )
        .route("/api/v1/moods/average", get(wellness::average_mood_for))
        .route(
            "/api/v1/gratitude",
            get(wellness::list_gratitude).post(wellness::add_gratitude),
        )
        .route("/api/v1/gratitude/random", get(wellness::random_gratitude))
        .route("/api/v1/gratitude/count", get(wellness::gratitude_count))
        .route(
            "/api/v1/gratitude/:entry_id",
            delete(wellness::delete_gratitude),
        )
        .route(
            "/api/v1/wellness/weekly-summary",
            get(wellness::weekly_summary),
        )
        // Notifications
        .route(
            "/api/v1/notifications",
            get(notifications::list_notifications),
        )
        .route(
            "/api/v1/notifications/unread-count",
            get(notifications::unread_count),
        )
        .route(
            "/api/v1/notifications/:notification_id/read",
            post(notifications::mark_read),
        )
        // Privileged functions
        .route(
            "/api/v1/functions/create-staff-user",
            post(functions::create_staff_user),
        )
        .route(
            "/api/v1/functions/approve-flagged-post",
            post(functions::approve_flagged_post),
        )
        .route("/api/v1/functions/upload-media", post(functions::upload_media))
        .route("/api/v1/functions/login-stats", get(functions::login_stats))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ));

    let public_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/health/ready", get(health::ready))
        .route("/api/health/live", get(health::live))
        .route("/metrics", get(metrics_handler));

    Router::new()
        .merge(public_routes)
        .merge(auth_routes)
        .merge(protected_routes)
        // Global middleware (order matters: bottom layers run first)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            security_headers_middleware,
        ))
        .layer(DefaultBodyLimit::max(config.server.max_body_size))
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id))
        .layer(cors)
        .with_state(state)
}
