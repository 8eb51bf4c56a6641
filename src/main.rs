mod core;
mod features;
mod modules;
mod shared;

use crate::core::config::Config;
use crate::core::openapi::{ApiDoc, SwaggerInfoModifier};
use crate::core::{database, middleware};
use crate::features::auth::{routes as auth_routes, AuthService, JwtValidator, PasswordHasher};
use crate::features::bids::{routes as bids_routes, BidService, PgBidRepository};
use crate::features::notifications::handlers::NotificationWsState;
use crate::features::notifications::{
    routes as notifications_routes, ConnectionRegistry, NotificationRelay, NotificationService,
    PgNotificationRepository,
};
use crate::features::rate_limits::{
    routes as rate_limits_routes, BidRateLimitState, RateLimitSweeper, SlidingWindowLimiter,
};
use crate::features::tenders::{routes as tenders_routes, PgTenderRepository, TenderService};
use crate::features::users::{routes as users_routes, PgUserRepository, UserService};
use crate::modules::cache::{RedisCache, ResponseCache};
use crate::modules::queue::{NotificationQueue, RabbitMqQueue};
use axum::{extract::State, http::StatusCode, middleware::from_fn, routing::get, Router};
use sqlx::PgPool;
use std::sync::Arc;
use tokio::sync::{oneshot, watch};
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::Modify;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

fn main() -> anyhow::Result<()> {
    // Build Tokio runtime with configurable worker threads
    let worker_threads = std::env::var("TOKIO_WORKER_THREADS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|p| p.get())
                .unwrap_or(4)
        });

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(worker_threads)
        .max_blocking_threads(worker_threads * 4)
        .enable_all()
        .build()?;

    runtime.block_on(async_main(worker_threads))
}

async fn async_main(worker_threads: usize) -> anyhow::Result<()> {
    // Load .env file BEFORE initializing logger so RUST_LOG is available
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env().map_err(|e| anyhow::anyhow!(e))?;

    tracing::info!(
        "System info: available_cpus={}, tokio_worker_threads={}, pid={}",
        std::thread::available_parallelism()
            .map(|p| p.get())
            .unwrap_or(1),
        worker_threads,
        std::process::id()
    );
    tracing::info!("Configuration loaded successfully");

    // Create database connection pool
    let pool = database::create_pool(&config.database).await?;
    tracing::info!("Database connection pool created");

    tracing::info!("Running database migrations...");
    database::run_migrations(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("Migration failed: {}", e))?;
    tracing::info!("Database migrations completed successfully");

    // Redis read-through cache
    let redis = RedisCache::connect(&config.redis.url)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to initialize Redis cache: {}", e))?;
    let cache = ResponseCache::new(Arc::new(redis), config.redis.cache_ttl);
    tracing::info!(
        "Response cache initialized (ttl {}s)",
        config.redis.cache_ttl.as_secs()
    );

    // RabbitMQ; losing the broker at startup is fatal
    let queue_name = config.rabbitmq.notification_queue.clone();
    let queue = Arc::new(
        RabbitMqQueue::connect(&config.rabbitmq.url, &[queue_name.as_str()])
            .await
            .map_err(|e| anyhow::anyhow!("Failed to initialize RabbitMQ: {}", e))?,
    );
    let notification_stream = queue
        .consume(&queue_name)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to consume notification queue: {}", e))?;
    tracing::info!("RabbitMQ connected, consuming '{}'", queue_name);

    // Repositories
    let user_repo = Arc::new(PgUserRepository::new(pool.clone()));
    let tender_repo = Arc::new(PgTenderRepository::new(pool.clone()));
    let bid_repo = Arc::new(PgBidRepository::new(pool.clone()));
    let notification_repo = Arc::new(PgNotificationRepository::new(pool.clone()));

    // Auth
    let jwt_validator = Arc::new(JwtValidator::new(
        &config.auth.jwt_secret,
        config.auth.token_ttl,
        config.auth.jwt_leeway,
    ));
    let auth_service = Arc::new(AuthService::new(
        user_repo.clone(),
        PasswordHasher::new(),
        Arc::clone(&jwt_validator),
    ));
    let user_service = Arc::new(UserService::new(
        user_repo,
        tender_repo.clone(),
        bid_repo.clone(),
        cache.clone(),
    ));
    tracing::info!("Auth and user services initialized");

    // Notifications
    let notification_service = Arc::new(NotificationService::new(
        notification_repo.clone(),
        queue,
        queue_name,
    ));
    let registry = Arc::new(ConnectionRegistry::new());
    let relay = NotificationRelay::new(
        notification_repo,
        Arc::clone(&registry),
        config.rabbitmq.relay_workers,
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (relay_down_tx, relay_down_rx) = oneshot::channel::<()>();
    let relay_handle = tokio::spawn(async move {
        let result = relay.run(notification_stream, shutdown_rx).await;
        if result.is_err() {
            // Without a consumer every notification would sit in the queue
            let _ = relay_down_tx.send(());
        }
        result
    });
    tracing::info!("Notification relay spawned");

    // Tenders and bids
    let tender_service = Arc::new(TenderService::new(
        tender_repo.clone(),
        bid_repo.clone(),
        Arc::clone(&notification_service),
        cache.clone(),
        config.notifications.award_notify,
    ));
    let bid_service = Arc::new(BidService::new(bid_repo, tender_repo, cache));
    tracing::info!(
        "Tender and bid services initialized (award notifies {:?})",
        config.notifications.award_notify
    );

    // Bid rate limiting
    let limiter = Arc::new(SlidingWindowLimiter::new());
    let bid_rate_limit = BidRateLimitState {
        limiter: Arc::clone(&limiter),
        max_requests: config.rate_limit.bid_max_requests,
        window: config.rate_limit.bid_window,
    };
    let sweeper = RateLimitSweeper::new(
        limiter,
        config.rate_limit.sweep_interval,
        config.rate_limit.idle_ttl,
    );
    tokio::spawn(async move {
        sweeper.run().await;
    });
    tracing::info!(
        "Bid rate limit: {} per {}s",
        config.rate_limit.bid_max_requests,
        config.rate_limit.bid_window.as_secs()
    );

    // Build application router with dynamic swagger config
    let swagger_modifier = SwaggerInfoModifier {
        title: config.swagger.title.clone(),
        version: config.swagger.version.clone(),
        description: config.swagger.description.clone(),
    };

    let mut openapi = ApiDoc::openapi();
    swagger_modifier.modify(&mut openapi);

    // Build swagger router
    let swagger = if let Some(credentials) = config.swagger.credentials() {
        tracing::info!("Swagger UI basic auth enabled");
        Router::new()
            .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi))
            .layer(from_fn(middleware::basic_auth_middleware(Arc::new(
                credentials,
            ))))
    } else {
        tracing::info!("Swagger UI basic auth disabled (no credentials configured)");
        Router::new().merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi))
    };

    // Protected routes (require JWT authentication)
    let protected_routes = Router::new()
        .merge(users_routes::routes(user_service))
        .merge(tenders_routes::routes(tender_service))
        .merge(bids_routes::routes(bid_service, bid_rate_limit.clone()))
        .merge(rate_limits_routes::routes(bid_rate_limit))
        .merge(notifications_routes::routes(Arc::clone(
            &notification_service,
        )))
        .route_layer(axum::middleware::from_fn_with_state(
            Arc::clone(&jwt_validator),
            middleware::auth_middleware,
        ));

    // Public routes (no auth required)
    let public_routes = Router::new()
        .merge(auth_routes::public_routes(auth_service))
        .merge(notifications_routes::ws_routes(NotificationWsState {
            validator: jwt_validator,
            registry,
            service: notification_service,
        }));

    let health_route = Router::new()
        .route("/health", get(health_check))
        .with_state(pool.clone());

    let app = Router::new()
        .merge(swagger)
        .merge(protected_routes)
        .merge(public_routes)
        .merge(health_route)
        .layer(middleware::cors_layer(
            config.app.cors_allowed_origins.clone(),
        ))
        // Propagate X-Request-Id to response headers
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(middleware::MakeSpanWithRequestId)
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Generate X-Request-Id using UUID v7 (or use client-provided one)
        .layer(SetRequestIdLayer::x_request_id(middleware::MakeRequestUuid));

    // Start server
    let addr = config.app.server_address();
    let socket_addr: std::net::SocketAddr = addr
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid address: {}", e))?;

    // Use socket2 for TCP listener configuration
    let socket = socket2::Socket::new(
        socket2::Domain::for_address(socket_addr),
        socket2::Type::STREAM,
        Some(socket2::Protocol::TCP),
    )?;

    socket.set_reuse_address(true)?;
    socket.set_nodelay(true)?;

    #[cfg(target_os = "linux")]
    {
        let keepalive = socket2::TcpKeepalive::new()
            .with_time(std::time::Duration::from_secs(60))
            .with_interval(std::time::Duration::from_secs(10))
            .with_retries(3);
        socket.set_tcp_keepalive(&keepalive)?;
    }
    #[cfg(not(target_os = "linux"))]
    {
        let keepalive = socket2::TcpKeepalive::new().with_time(std::time::Duration::from_secs(60));
        socket.set_tcp_keepalive(&keepalive)?;
    }

    socket.set_nonblocking(true)?;
    socket.bind(&socket_addr.into())?;
    socket.listen(1024)?;

    let listener = tokio::net::TcpListener::from_std(socket.into())?;
    tracing::info!("Server listening on {}", format!("http://{}", addr));
    tracing::info!(
        "Swagger UI available at {}",
        format!("http://{}/swagger-ui/", addr)
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::select! {
                _ = shutdown_signal() => {}
                Ok(()) = relay_down_rx => {
                    tracing::error!("Notification relay is down, shutting down server");
                }
            }
        })
        .await?;

    // Stop taking queue messages and let in-flight deliveries finish
    let _ = shutdown_tx.send(true);
    let relay_result = relay_handle
        .await
        .map_err(|e| anyhow::anyhow!("Notification relay task failed: {}", e))?;
    relay_result.map_err(|e| anyhow::anyhow!("Notification relay failed: {}", e))?;
    tracing::info!("Shutdown complete");

    Ok(())
}

/// Liveness plus a database round trip
async fn health_check(State(pool): State<PgPool>) -> StatusCode {
    match database::ping(&pool).await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    tracing::info!("Shutdown signal received");
}
