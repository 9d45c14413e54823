use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::EnvFilter;
use formgate::{
    background_task::start_purge_task,
    clock::{Clock, SystemClock},
    db::redis::create_pool,
    email::sender::build_email_sender,
    graceful_shutdown::shutdown_signal,
    repositories::{memory_repo::MemoryRecordStore, redis_repo::RedisRecordStore, store::RecordStore},
    routes::configure_routes,
    settings::AppConfig,
    web::cors::build_cors,
    AppState,
};

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let config = match AppConfig::new() {
        Ok(cfg) => {
            init_tracing(cfg.is_production());
            tracing::info!("Loaded configuration: {:?}", cfg);
            cfg
        },
        Err(e) => {
            init_tracing(false);
            tracing::error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let store: RecordStore = match &config.redis_url {
        Some(url) => match create_pool(url).await {
            Ok(pool) => RedisRecordStore::new(pool).into(),
            Err(e) => {
                tracing::error!("Redis unavailable: {}", e);
                std::process::exit(1);
            }
        },
        None => {
            tracing::warn!("APP_REDIS_URL not set, using in-memory record store");
            let memory = MemoryRecordStore::new(clock.clone());
            tokio::spawn(start_purge_task(memory.clone()));
            memory.into()
        }
    };

    let sender = match build_email_sender(&config) {
        Ok(sender) => sender,
        Err(e) => {
            tracing::error!("Email configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let app_state = match AppState::new(&config, store, sender, clock) {
        Ok(state) => web::Data::new(state),
        Err(e) => {
            tracing::error!("Failed to build application state: {}", e);
            std::process::exit(1);
        }
    };

    let server_addr = format!("{}:{}", config.host, config.port);
    let allowed_origins = config.allowed_origins();

    tracing::info!(
        "Starting {} v{} on {} with {} store",
        config.name,
        env!("CARGO_PKG_VERSION"),
        server_addr,
        app_state.store.kind()
    );

    let server = HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .wrap(build_cors(allowed_origins.clone()))
            .wrap(TracingLogger::default())
            .configure(configure_routes)
    })
    .workers(config.worker_count)
    .bind(server_addr)?
    .run();

    tokio::select! {
        res = server => res,
        _ = shutdown_signal() => Ok(()),
    }
}
