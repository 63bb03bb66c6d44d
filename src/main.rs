//! Tapcard server binary.

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use tapcard::adapters::auth::{JwtConfig, JwtSessionValidator};
use tapcard::adapters::email::{ResendConfig, ResendMailer};
use tapcard::adapters::http::{app_router, PaymentAppState};
use tapcard::adapters::memory::{
    InMemoryActivityLog, InMemoryCardRepository, InMemoryInvoiceLedger, InMemoryPaymentLedger,
    InMemorySubscriptionRepository, InMemoryUserDirectory,
};
use tapcard::adapters::paystack::{PaystackConfig, PaystackGateway};
use tapcard::adapters::postgres::{
    PostgresActivityLog, PostgresCardRepository, PostgresInvoiceLedger, PostgresPaymentLedger,
    PostgresSubscriptionRepository, PostgresUserDirectory,
};
use tapcard::application::{EntitlementReconciler, NotificationDispatcher};
use tapcard::config::{AppConfig, DatabaseConfig};
use tapcard::ports::{
    ActivityLog, CardRepository, InvoiceLedger, PaymentLedger, SubscriptionRepository,
    UserDirectory,
};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Storage ports, backed by Postgres or memory.
struct Storage {
    payments: Arc<dyn PaymentLedger>,
    cards: Arc<dyn CardRepository>,
    subscriptions: Arc<dyn SubscriptionRepository>,
    invoices: Arc<dyn InvoiceLedger>,
    activity: Arc<dyn ActivityLog>,
    directory: Arc<dyn UserDirectory>,
}

impl Storage {
    async fn connect(config: &DatabaseConfig) -> Result<Self, BoxError> {
        let Some(url) = config.connection_url() else {
            tracing::warn!("No database configured; using in-memory storage");
            return Ok(Self {
                payments: Arc::new(InMemoryPaymentLedger::new()),
                cards: Arc::new(InMemoryCardRepository::new()),
                subscriptions: Arc::new(InMemorySubscriptionRepository::new()),
                invoices: Arc::new(InMemoryInvoiceLedger::new()),
                activity: Arc::new(InMemoryActivityLog::new()),
                directory: Arc::new(InMemoryUserDirectory::new()),
            });
        };

        let pool = config.pool_options().connect(url).await?;
        tracing::info!("Connected to database");

        if config.run_migrations {
            sqlx::migrate!("./migrations").run(&pool).await?;
            tracing::info!("Database migrations applied");
        }

        Ok(Self {
            payments: Arc::new(PostgresPaymentLedger::new(pool.clone())),
            cards: Arc::new(PostgresCardRepository::new(pool.clone())),
            subscriptions: Arc::new(PostgresSubscriptionRepository::new(pool.clone())),
            invoices: Arc::new(PostgresInvoiceLedger::new(pool.clone())),
            activity: Arc::new(PostgresActivityLog::new(pool.clone())),
            directory: Arc::new(PostgresUserDirectory::new(pool)),
        })
    }
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if config.server.environment.json_logs() {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let config = AppConfig::load()?;
    init_tracing(&config);
    config.validate()?;

    tracing::info!(
        environment = ?config.server.environment,
        test_mode = config.payment.is_test_mode(),
        amount_check = ?config.payment.amount_check,
        "Starting tapcard"
    );

    let storage = Storage::connect(&config.database).await?;

    let gateway = Arc::new(PaystackGateway::new(
        PaystackConfig::new(config.payment.paystack_secret_key.clone())
            .with_base_url(config.payment.paystack_base_url.clone())
            .with_timeout(std::time::Duration::from_secs(
                config.payment.gateway_timeout_secs,
            )),
    ));
    let mailer = Arc::new(ResendMailer::new(ResendConfig::new(
        config.email.resend_api_key.clone(),
        config.email.from_header(),
    )));
    let notifications =
        NotificationDispatcher::new(storage.directory.clone(), mailer, config.email.enabled);

    let reconciler = Arc::new(
        EntitlementReconciler::new(
            storage.payments.clone(),
            storage.cards,
            storage.subscriptions,
            storage.invoices,
            storage.activity,
            storage.directory,
            notifications,
        )
        .with_amount_check(config.payment.amount_check),
    );

    let state = PaymentAppState {
        payment_ledger: storage.payments,
        payment_gateway: gateway,
        reconciler,
        callback_url: config.payment.callback_url.clone(),
    };
    let auth = Arc::new(JwtSessionValidator::new(&JwtConfig::new(
        config.auth.jwt_secret.clone(),
        config.auth.jwt_audience.clone(),
    )));
    let app = app_router(state, auth, &config.server.router_config());

    let addr = config.server.socket_addr();
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
