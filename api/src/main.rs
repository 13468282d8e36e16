use std::{net::SocketAddr, sync::Arc};

use axum::Router;
use diesel_async::{
    AsyncPgConnection,
    pooled_connection::{AsyncDieselConnectionManager, deadpool::Pool},
};
use dotenv::dotenv;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    cases::{
        comment::{CommentService, anon_name::AnonymousNameGenerator},
        store::pg::PgCommentStore,
    },
    config::{Env, ServerConfig},
    rate_limit::FixedWindowLimiter,
    turnstile::Turnstile,
};

mod cases;
mod config;
mod error;
mod json;
mod rate_limit;
mod real_ip;
mod schema;
mod turnstile;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Clone)]
pub struct App {
    pub comments: Arc<CommentService>,
}

pub fn router(app: App) -> Router {
    Router::new()
        .nest("/api/cases", cases::routes::route())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app)
}

fn init_tracing(env: Env) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match env {
        Env::Production => EnvFilter::new("info"),
        Env::Dev | Env::Staging => EnvFilter::new("info,petboard=debug,tower_http=debug"),
    });

    let registry = tracing_subscriber::registry().with(filter);
    match env {
        Env::Production => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        Env::Dev | Env::Staging => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    dotenv().ok();
    init_tracing(Env::from_env());

    let config = ServerConfig::new_from_env();

    let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(&config.database_url);
    let pool = Pool::builder(manager)
        .max_size(config.database_max_connections)
        .runtime(deadpool_runtime::Runtime::Tokio1)
        .wait_timeout(Some(config.store_timeout))
        .create_timeout(Some(config.store_timeout))
        .build()?;

    let limiter = Arc::new(FixedWindowLimiter::new(config.rate_limit.clone()));
    rate_limit::spawn_sweeper(limiter.clone());

    let turnstile = Turnstile::new(&config.turnstile)?;
    if !turnstile.is_enabled() {
        tracing::warn!("Comments are accepted without captcha verification");
    }

    let comments = CommentService::new(
        Arc::new(PgCommentStore::new(pool)),
        limiter,
        Arc::new(turnstile),
        AnonymousNameGenerator::new(),
        config.store_timeout,
    );

    let app = router(App {
        comments: Arc::new(comments),
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(env = ?config.env, "listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
