use std::{process, sync::Arc};

use rotta::{
    application::{
        auto_redirect::AutoRedirector,
        content::ContentService,
        error::AppError,
        repos::{ContentInventory, ContentInventoryWrite, RuleStore},
        resolver::RedirectResolver,
        rules::RuleService,
        sitemap::{SitemapOptions, SitemapService},
    },
    cache::{CacheTrigger, CachedSitemaps, DocumentCacheStore, SitemapCacheConfig},
    config,
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{AdminState, PublicState, build_admin_router, build_public_router},
        telemetry,
    },
};
use tokio::{sync::watch, try_join};
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

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let (public_state, admin_state) = build_application_context(repositories, &settings);
    serve_http(&settings, public_state, admin_state).await
}

async fn run_migrate(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    // init_repositories already applied pending migrations; surface the pool
    // health so a misconfigured URL fails loudly here rather than at serve.
    repositories
        .health_check()
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;
    info!(target = "rotta::migrate", "migrations applied");
    Ok(())
}

async fn init_repositories(
    settings: &config::Settings,
) -> Result<Arc<PostgresRepositories>, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))
        .map_err(AppError::from)?;

    let pool =
        PostgresRepositories::connect(database_url, settings.database.max_connections.get())
            .await
            .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

fn build_application_context(
    repositories: Arc<PostgresRepositories>,
    settings: &config::Settings,
) -> (PublicState, AdminState) {
    let rule_store: Arc<dyn RuleStore> = repositories.clone();
    let inventory: Arc<dyn ContentInventory> = repositories.clone();
    let inventory_write: Arc<dyn ContentInventoryWrite> = repositories.clone();
    let cache_store: Arc<dyn DocumentCacheStore> = repositories.clone();

    let cache_config = SitemapCacheConfig {
        enabled: settings.sitemap.cache_enabled,
        ttl_seconds: settings.sitemap.cache_ttl_seconds,
    };
    let sitemap_options = SitemapOptions {
        public_url: settings.site.public_url.clone(),
        excluded_types: settings.sitemap.excluded_types.clone(),
        freshness_window_months: settings.sitemap.freshness_window_months,
    };

    let sitemap_service = Arc::new(SitemapService::new(inventory, sitemap_options));
    let sitemaps = Arc::new(CachedSitemaps::new(
        cache_config.clone(),
        cache_store.clone(),
        sitemap_service.clone(),
    ));
    let cache_trigger = Arc::new(CacheTrigger::new(cache_config, cache_store));

    let resolver = Arc::new(RedirectResolver::new(rule_store.clone()));
    let auto_redirector = Arc::new(AutoRedirector::new(
        rule_store.clone(),
        settings.redirects.auto_redirect_enabled,
        settings.site.public_url.clone(),
    ));
    let rule_service = Arc::new(RuleService::new(rule_store));
    let content_service = Arc::new(ContentService::new(
        inventory_write,
        auto_redirector,
        cache_trigger,
    ));

    let public_state = PublicState {
        resolver,
        sitemaps,
        sitemap_service,
        sitemap_enabled: settings.sitemap.enabled,
        cache_ttl_seconds: settings.sitemap.cache_ttl_seconds,
        db: Some(repositories.clone()),
    };

    let admin_state = AdminState {
        rules: rule_service,
        content: content_service,
        db: Some(repositories),
    };

    (public_state, admin_state)
}

async fn serve_http(
    settings: &config::Settings,
    public_state: PublicState,
    admin_state: AdminState,
) -> Result<(), AppError> {
    let public_router = build_public_router(public_state);
    let admin_router = build_admin_router(admin_state);

    let public_listener = tokio::net::TcpListener::bind(settings.server.public_addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    let admin_listener = tokio::net::TcpListener::bind(settings.server.admin_addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "rotta::serve",
        public = %settings.server.public_addr,
        admin = %settings.server.admin_addr,
        "listening"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to listen for shutdown signal");
            return;
        }
        info!(target = "rotta::serve", "shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    let public_server = axum::serve(public_listener, public_router.into_make_service())
        .with_graceful_shutdown(wait_for_shutdown(shutdown_rx.clone()));
    let admin_server = axum::serve(admin_listener, admin_router.into_make_service())
        .with_graceful_shutdown(wait_for_shutdown(shutdown_rx.clone()));

    let servers = async {
        try_join!(public_server, admin_server)
            .map_err(|err| AppError::unexpected(format!("server error: {err}")))
    };

    // Once the signal fires, in-flight requests get the configured grace
    // period to drain before the process gives up on them.
    let grace = settings.server.graceful_shutdown;
    let mut deadline_rx = shutdown_rx;
    let drain_deadline = async move {
        if deadline_rx.wait_for(|stopping| *stopping).await.is_ok() {
            tokio::time::sleep(grace).await;
        } else {
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        result = servers => {
            result?;
        }
        () = drain_deadline => {
            warn!(
                target = "rotta::serve",
                grace_seconds = grace.as_secs(),
                "graceful shutdown period elapsed, abandoning in-flight requests"
            );
        }
    }

    Ok(())
}

async fn wait_for_shutdown(mut rx: watch::Receiver<bool>) {
    let _ = rx.wait_for(|stopping| *stopping).await;
}
