use actix_web::{middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;
use std::sync::Arc;

mod ai;
mod channels;
mod config;
mod contacts;
mod controllers;
mod intent;
mod wallet;
mod web3;

use ai::AiClient;
use channels::MessageDispatcher;
use config::Config;
use contacts::ContactStore;
use intent::IntentParser;
use wallet::WalletRegistry;
use web3::{ChainExecutor, TokenExecutor};

pub struct AppState {
    pub config: Config,
    pub dispatcher: Arc<MessageDispatcher>,
    pub wallets: Arc<WalletRegistry>,
    pub model_configured: bool,
}

fn startup_error(message: String) -> std::io::Error {
    log::error!("{}", message);
    std::io::Error::new(std::io::ErrorKind::Other, message)
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init();

    let config = Config::from_env().map_err(startup_error)?;
    let port = config.port;

    log::info!("Loading wallets from environment");
    let wallets = Arc::new(WalletRegistry::from_env());
    log::info!("Loaded {} wallet(s)", wallets.len());
    if wallets.is_empty() {
        log::warn!("No wallet keys configured; balance checks and transfers will fail");
    }
    for name in wallets.names() {
        let address = wallets
            .resolve(&name)
            .map_err(|e| e.to_string())
            .and_then(wallet::derive_address);
        match address {
            Ok(address) => log::info!("Wallet '{}': {}", name, address),
            Err(e) => log::error!("Wallet '{}': failed to load key: {}", name, e),
        }
    }

    let contacts = Arc::new(ContactStore::new(config.contacts_file.clone()));
    log::info!("Using contacts file {}", contacts.path().display());

    log::info!("Connecting chain executor to {}", config.chain.rpc_url);
    let executor: Arc<dyn ChainExecutor> =
        Arc::new(TokenExecutor::new(&config.chain).map_err(startup_error)?);

    let client = match &config.ai {
        Some(ai_config) => {
            log::info!("Intent parser using model {}", ai_config.model);
            Some(AiClient::from_config(ai_config).map_err(startup_error)?)
        }
        None => {
            log::warn!("No model API key configured; intent parsing uses pattern rules only");
            None
        }
    };
    let parser = IntentParser::new(client);
    let model_configured = parser.is_model_backed();

    let dispatcher = Arc::new(MessageDispatcher::new(
        parser,
        contacts,
        wallets.clone(),
        executor,
    ));

    let bot_token = config.bot_token.clone();
    let owner_id = config.owner_id;
    let listener_dispatcher = dispatcher.clone();
    tokio::spawn(async move {
        if let Err(e) = channels::start_telegram_listener(bot_token, owner_id, listener_dispatcher).await {
            log::error!("Telegram listener exited: {}", e);
        }
    });

    log::info!("Starting HTTP server on port {}", port);

    let state = web::Data::new(AppState {
        config,
        dispatcher,
        wallets,
        model_configured,
    });

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(Logger::default())
            .configure(controllers::health::config_routes)
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
