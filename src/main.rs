use std::{process, sync::Arc};

use product_cache::{
    application::{
        error::AppError,
        products::ProductService,
        repos::{BackupsRepo, ProductsRepo},
    },
    cache::{CacheAside, CacheRegion, InMemoryRegion},
    config,
    domain::entities::ProductRecord,
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, ApiState, NotFoundPolicy},
        memory::InMemoryRepositories,
        telemetry,
    },
};
use tokio::sync::Notify;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Migrate(_) => run_migrate(settings).await,
    }
}

struct Stores {
    products: Arc<dyn ProductsRepo>,
    backups: Arc<dyn BackupsRepo>,
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let stores = init_stores(&settings).await?;

    let region: Arc<dyn CacheRegion<ProductRecord>> =
        Arc::new(InMemoryRegion::<ProductRecord>::new(
            settings.cache.region.clone(),
        ));
    let cache = Arc::new(CacheAside::new(
        stores.products.clone(),
        region,
        stores.backups,
    ));
    info!(region = cache.region_name(), "Cache region ready");

    let state = ApiState {
        products: Arc::new(ProductService::new(cache)),
        store: stores.products,
        not_found: NotFoundPolicy::from_strict(settings.http.strict_not_found),
    };

    serve(http::build_router(state), &settings).await
}

async fn run_migrate(settings: config::Settings) -> Result<(), AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))
        .map_err(AppError::from)?;

    let pool = PostgresRepositories::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;
    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::migration(err.to_string())))?;

    info!("Migrations applied");
    Ok(())
}

async fn init_stores(settings: &config::Settings) -> Result<Stores, AppError> {
    let Some(database_url) = settings.database.url.as_ref() else {
        warn!("No database url configured; products are kept in memory and lost on restart");
        let memory = InMemoryRepositories::new();
        return Ok(Stores {
            products: Arc::new(memory.clone()),
            backups: Arc::new(memory),
        });
    };

    let pool = PostgresRepositories::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::migration(err.to_string())))?;

    let repositories = Arc::new(PostgresRepositories::new(pool));
    Ok(Stores {
        products: repositories.clone(),
        backups: repositories,
    })
}

async fn serve(router: axum::Router, settings: &config::Settings) -> Result<(), AppError> {
    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(addr = %settings.server.addr, "Listening");

    let shutdown = Arc::new(Notify::new());
    let server_shutdown = shutdown.clone();
    let mut server = tokio::spawn(async move {
        axum::serve(listener, router.into_make_service())
            .with_graceful_shutdown(async move { server_shutdown.notified().await })
            .await
    });

    let joined = tokio::select! {
        joined = &mut server => joined,
        signal = tokio::signal::ctrl_c() => {
            signal.map_err(|err| AppError::from(InfraError::from(err)))?;
            info!(
                grace_secs = settings.server.graceful_shutdown.as_secs(),
                "Shutdown requested; draining connections"
            );
            shutdown.notify_one();
            match tokio::time::timeout(settings.server.graceful_shutdown, &mut server).await {
                Ok(joined) => joined,
                Err(_) => {
                    warn!("Graceful shutdown timed out; aborting open connections");
                    server.abort();
                    return Ok(());
                }
            }
        }
    };

    joined
        .map_err(|err| AppError::unexpected(format!("server task failed: {err}")))?
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))
}
