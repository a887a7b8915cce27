//! # bobactl: checkout control layer for a bubble tea storefront
//!
//! `bobactl` sits between the storefront and the payment provider. It turns a cart into a
//! charge and turns a paid charge into an order, and it never trusts the client for either.
//!
//! ## Overview
//!
//! A checkout starts with a cart of `(product, quantity, size)` entries. Prices are looked up
//! in the catalog, bundle promotions are applied ("any 2 regular teas for 6.00"), and the
//! resulting total is charged through a hosted payment session. The priced cart is frozen
//! into the session's metadata at that moment, so whatever happens to the catalog afterwards,
//! the order later created for the session matches what the customer paid for.
//!
//! Orders are materialized from paid sessions by two independent triggers: the provider's
//! signed webhook and the storefront polling `/api/verify-session` after the redirect. Either
//! may arrive first, both may arrive at once, and either may be retried. All of them produce
//! the same single order document, keyed by the session id.
//!
//! ## Architecture
//!
//! - [`pricing`]: catalog snapshots, promotion grouping and cart totals
//! - [`checkout`]: freezing a priced cart into a payment session
//! - [`payment_providers`]: the external payment service (Stripe, or an in-process dummy)
//! - [`orders`]: the order document and its idempotent materializer
//! - [`db`]: the document store orders are written to
//! - [`api`]: HTTP handlers and request/response models
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use bobactl::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = bobactl::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     bobactl::telemetry::init_telemetry(config.enable_otel_export)?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     }).await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! See the [`config`] module for configuration options.
pub mod api;
pub mod checkout;
pub mod config;
pub mod db;
pub mod errors;
pub mod metrics;
mod openapi;
pub mod orders;
pub mod payment_providers;
pub mod pricing;
pub mod telemetry;
#[cfg(test)]
mod test_utils;

use std::{sync::Arc, time::Duration};

use axum::{
    Json, Router,
    http::{self, HeaderValue, Method},
    routing::{get, post},
};
use bon::Builder;
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument, warn};
use utoipa::OpenApi;

pub use config::Config;

use crate::{
    checkout::CheckoutSessionFactory,
    config::CorsOrigin,
    db::DocumentStore,
    openapi::ApiDoc,
    orders::OrderMaterializer,
    payment_providers::PaymentProvider,
    pricing::{CatalogSource, FileCatalog},
};

/// Install the process-wide rustls crypto provider.
///
/// Safe to call more than once; only the first call installs anything.
pub fn install_crypto_provider() {
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
}

/// Application state shared across all request handlers.
///
/// ```ignore
/// let state = AppState::builder()
///     .config(config)
///     .store(store)
///     .catalog(catalog)
///     .maybe_payment_provider(provider)
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn DocumentStore>,
    pub catalog: Arc<dyn CatalogSource>,
    pub payment_provider: Option<Arc<dyn PaymentProvider>>,
}

impl AppState {
    fn provider(&self) -> errors::Result<Arc<dyn PaymentProvider>> {
        self.payment_provider.clone().ok_or(errors::Error::PaymentsDisabled)
    }

    /// Session factory for the configured provider
    pub fn checkout_factory(&self) -> errors::Result<CheckoutSessionFactory> {
        Ok(CheckoutSessionFactory::new(self.provider()?, &self.config))
    }

    /// Order materializer over the configured provider and store
    pub fn materializer(&self) -> errors::Result<OrderMaterializer> {
        Ok(OrderMaterializer::new(self.provider()?, self.store.clone()))
    }
}

fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let origins = &config.cors.allowed_origins;

    // A literal "*" in an origin list is rejected by tower-http
    let allow_origin = if origins.iter().any(|origin| matches!(origin, CorsOrigin::Wildcard)) {
        AllowOrigin::any()
    } else {
        let mut values = Vec::with_capacity(origins.len());
        for origin in origins {
            if let CorsOrigin::Url(url) = origin {
                values.push(url.as_str().trim_end_matches('/').parse::<HeaderValue>()?);
            }
        }
        AllowOrigin::list(values)
    };

    let mut cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([http::header::CONTENT_TYPE]);

    if let Some(max_age) = config.cors.max_age {
        cors = cors.max_age(Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the application router with every endpoint and middleware.
///
/// # Errors
///
/// Returns an error if the CORS configuration is invalid.
#[instrument(skip_all)]
pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    let cors = create_cors_layer(&state.config)?;
    let enable_metrics = state.config.enable_metrics;

    let mut router = Router::new()
        .route(
            "/create-checkout-session",
            post(api::handlers::checkout::create_checkout_session),
        )
        .route(
            "/api/create-payment-intent",
            post(api::handlers::checkout::create_payment_intent),
        )
        .route("/api/verify-session", get(api::handlers::orders::verify_session))
        .route("/api/orders/{session_id}", get(api::handlers::orders::get_order))
        // Called by the payment provider, not the storefront
        .route("/webhook", post(api::handlers::webhooks::payment_webhook))
        .route("/api/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .route("/healthz", get(|| async { "OK" }))
        .with_state(state);

    if enable_metrics {
        router = router.route(
            "/internal/metrics",
            get(|| async {
                metrics::render().map_err(|e| errors::Error::from(e.context("render metrics")))
            }),
        );
    }

    let router = router.layer(cors).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    Ok(router)
}

/// Log what the catalog currently holds, without failing startup: pricing re-reads it on
/// every request and reports 503 while it is unreadable.
async fn check_catalog(catalog: &dyn CatalogSource) {
    match catalog.snapshot().await {
        Ok(snapshot) => info!(
            "Catalog loaded: {} products, {} promotions",
            snapshot.products.len(),
            snapshot.promotions.len()
        ),
        Err(e) => warn!("Catalog is not readable yet: {}", e),
    }
}

pub struct Application {
    router: Router,
    config: Config,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting bobactl with configuration: {:#?}", config);

        let store = db::connect(&config.store).await?;

        let catalog: Arc<dyn CatalogSource> = Arc::new(FileCatalog::new(&config.catalog.path));
        check_catalog(catalog.as_ref()).await;

        let payment_provider = match config.payment.clone() {
            Some(payment) => Some(payment_providers::create_provider(payment)?),
            None => {
                warn!("No payment provider configured; checkout and order endpoints will return 501");
                None
            }
        };

        let state = AppState::builder()
            .config(config.clone())
            .store(store)
            .catalog(catalog)
            .maybe_payment_provider(payment_provider)
            .build();

        let router = build_router(state)?;

        Ok(Self { router, config })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "bobactl listening on http://{}, available at http://localhost:{}",
            bind_addr, self.config.port
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}
