//! Server entry point.
//!
//! Loads configuration, connects to Postgres, wires one Stripe adapter
//! per environment, and serves the billing API.

use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, HeaderValue, Method};
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use iq_billing::adapters::http::billing::{billing_router, BillingAppState};
use iq_billing::adapters::postgres::PostgresEntitlementStore;
use iq_billing::adapters::stripe::{StripeAdapterConfig, StripePaymentAdapter};
use iq_billing::application::{PaymentEnvironment, PaymentEnvironments};
use iq_billing::config::{AppConfig, ServerConfig, StripeEnvConfig};
use iq_billing::domain::billing::StripeEnvironment;

fn payment_environment(
    environment: StripeEnvironment,
    config: &StripeEnvConfig,
) -> PaymentEnvironment {
    let adapter = StripePaymentAdapter::new(StripeAdapterConfig::from_env_config(config));
    PaymentEnvironment {
        environment,
        provider: Arc::new(adapter),
        promotion_id: config.promotion_id.clone(),
        coupon_id: config.coupon_id.clone(),
        publishable_key: config.publishable_key.clone(),
    }
}

fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins_list()
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring unparseable CORS origin");
                None
            }
        })
        .collect();

    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    // No configured origins means a development setup; allow anything.
    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(AllowOrigin::list(origins))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.server.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let pool = PgPoolOptions::new()
        .min_connections(config.database.min_connections)
        .max_connections(config.database.max_connections)
        .acquire_timeout(config.database.acquire_timeout())
        .connect(&config.database.url)
        .await?;

    if config.database.run_migrations {
        tracing::info!("running database migrations");
        sqlx::migrate!("./migrations").run(&pool).await?;
    }

    let environments = PaymentEnvironments::new(
        config.stripe.production_host.clone(),
        payment_environment(StripeEnvironment::Production, &config.stripe.production),
        payment_environment(StripeEnvironment::Development, &config.stripe.development),
    );

    let state = BillingAppState {
        environments: Arc::new(environments),
        store: Arc::new(PostgresEntitlementStore::new(pool)),
        auth: Arc::new(config.auth.clone()),
    };

    let app = billing_router()
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config.server))
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .with_state(state);

    let addr = config.server.socket_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "billing server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to install shutdown handler");
        return;
    }
    tracing::info!("shutdown signal received, stopping server");
}
