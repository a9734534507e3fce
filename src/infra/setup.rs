use std::fs::File;
use std::sync::Arc;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    adapters::{http::app_state::AppState, persistence::json_store::JsonFileStore},
    application::ports::store_gateway::{AppleStoreGateway, GooglePlayGateway},
    application::use_cases::reconciliation::SubscriptionStore,
    application::use_cases::verification::VerificationUseCases,
    infra::{
        app_store_client::{AppStoreClient, AppStoreCredentials},
        config::AppConfig,
        google_play_client::{GooglePlayClient, GooglePlayCredentials},
    },
};

pub async fn init_app_state() -> anyhow::Result<AppState> {
    let config = AppConfig::from_env();

    let store =
        Arc::new(JsonFileStore::new(config.db_file.clone())) as Arc<dyn SubscriptionStore>;

    let server_api = AppStoreCredentials {
        issuer_id: config.issuer_id.clone(),
        key_id: config.key_id.clone(),
        private_key: config.private_key.clone(),
    };
    let connect_api = match (
        &config.asc_issuer_id,
        &config.asc_key_id,
        &config.asc_private_key,
    ) {
        (Some(issuer_id), Some(key_id), Some(private_key)) => Some(AppStoreCredentials {
            issuer_id: issuer_id.clone(),
            key_id: key_id.clone(),
            private_key: private_key.clone(),
        }),
        _ => None,
    };
    let apple = Arc::new(AppStoreClient::new(
        config.environment,
        config.bundle_id.clone(),
        server_api,
        connect_api,
        config.shared_secret.clone(),
    )) as Arc<dyn AppleStoreGateway>;

    let google_credentials = match (&config.google_client_email, &config.google_private_key) {
        (Some(client_email), Some(private_key)) => Some(GooglePlayCredentials {
            client_email: client_email.clone(),
            private_key: private_key.clone(),
        }),
        _ => None,
    };
    let google = Arc::new(GooglePlayClient::new(
        config.bundle_id.clone(),
        google_credentials,
    )) as Arc<dyn GooglePlayGateway>;

    let verification_use_cases =
        VerificationUseCases::new(apple, google, store, config.environment);

    Ok(AppState {
        config: Arc::new(config),
        verification_use_cases: Arc::new(verification_use_cases),
    })
}

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "iap_api=debug,tower_http=debug".into());

    // Console (pretty logs)
    let console_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .pretty();

    // File (structured JSON logs)
    let file = File::create("app.log").expect("cannot create log file");
    let json_layer = fmt::layer()
        .json()
        .with_writer(file)
        .with_current_span(true)
        .with_span_list(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(json_layer)
        .try_init()
        .ok();
}
