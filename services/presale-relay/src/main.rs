use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use anyhow::Context;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use presale_relay::{routes, AppState, InMemoryLedger, RelayConfig, RpcChain};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Missing .env is fine; variables may come from the process environment.
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = RelayConfig::from_env().context("loading relay configuration")?;
    if !config.signer_matches_wallet() {
        tracing::warn!(
            wallet = %config.presale_pubkey,
            "PRESALE_WALLET_PUBKEY differs from the keypair's public key; transfers will fail unless the keypair is a delegate"
        );
    }

    let chain = RpcChain::new(config.rpc_url.clone());
    let bind = (config.bind_address.clone(), config.port);
    tracing::info!(
        rpc = %chain.url(),
        mint = %config.mint,
        presale = %config.presale_pubkey,
        decimals = config.exchange.decimals,
        tokens_per_sol = config.exchange.tokens_per_sol,
        confirm_transfers = config.confirm_transfers,
        "presale relay configured"
    );

    let state = web::Data::new(AppState::new(
        config,
        Arc::new(chain),
        Arc::new(InMemoryLedger::new()),
    ));

    tracing::info!(address = %bind.0, port = bind.1, "backend running");
    HttpServer::new(move || {
        App::new()
            .wrap(Cors::permissive())
            .app_data(state.clone())
            .configure(routes::init_routes)
    })
    .bind(bind)
    .context("binding HTTP listener")?
    .run()
    .await?;

    Ok(())
}
