use std::sync::Arc;

use notifier::api::{ApiServer, AppState, TokenVerifier};
use notifier::collector::default_registry;
use notifier::config::Config;
use notifier::context::RequestContext;
use notifier::delivery::{MandrillSender, WorkerPool, WorkerPoolConfig};
use notifier::gateway::{HttpGateway, RealmKeyClient, ServiceAccountTokenClient};
use notifier::logging;
use notifier::template::EmbeddedTemplates;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    logging::init_logging(&config.log_level, config.log_json())?;
    config.validate()?;

    let gateway = Arc::new(HttpGateway::new(&config.wit_url, &config.auth_url)?);
    let token_client = ServiceAccountTokenClient::new(
        gateway.http_client().clone(),
        &config.auth_url,
        &config.service_account_id,
        &config.service_account_secret,
    )?;
    match token_client.fetch(&RequestContext::new()).await {
        Ok(token) => gateway.set_service_account_token(token),
        Err(e) if config.developer_mode => {
            warn!(error = %e, "no service account token, private emails stay hidden");
        }
        Err(e) => return Err(e.into()),
    }

    let registry = Arc::new(default_registry(gateway.clone(), &config.web_url()));
    let templates = Arc::new(EmbeddedTemplates::load()?);

    let sender = Arc::new(MandrillSender::new(
        config.mandrill_api_key.as_deref().unwrap_or_default(),
    )?);
    let pool = Arc::new(WorkerPool::with_config(
        sender,
        WorkerPoolConfig {
            workers: config.worker_count,
        },
    ));

    let verifier = match config.local_token_verifier()? {
        Some(verifier) => verifier,
        None => {
            let keycloak_url = config.keycloak_url.as_deref().unwrap_or_default();
            let pem = RealmKeyClient::new(
                gateway.http_client().clone(),
                keycloak_url,
                &config.keycloak_realm,
            )?
            .fetch_public_key()
            .await?;
            TokenVerifier::from_rsa_pem(&pem)?
        }
    };
    let verifier = Arc::new(verifier);
    let state =
        AppState::new(registry, templates, pool.clone(), verifier).with_stats(pool.stats());
    let server = ApiServer::new(config.http_address.clone(), state)
        .with_metrics_address(config.metrics_http_address());

    let cancel_token = server.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("received shutdown signal");
            cancel_token.cancel();
        }
    });

    info!(
        address = %config.http_address,
        workers = config.worker_count,
        "notifier initialized successfully"
    );
    server.run().await?;
    pool.shutdown().await;

    Ok(())
}
