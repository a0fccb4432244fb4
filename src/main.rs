use anyhow::Result;
use serenity::{model::gateway::GatewayIntents, Client};
use songbird::{SerenityInit, Songbird};
use std::sync::Arc;
use tracing::{error, info, warn};

mod audio;
mod bot;
mod config;
mod error;
mod sources;
mod storage;
mod ui;

use crate::audio::{registry::SessionRegistry, voice::SongbirdSinkFactory};
use crate::bot::{directory::SerenityDirectory, ClipBot};
use crate::config::Config;
use crate::sources::SourceManager;
use crate::storage::JsonStorage;

#[tokio::main]
async fn main() -> Result<()> {
    // Inicializar logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("clipbot=debug".parse()?)
                .add_directive("serenity=info".parse()?)
                .add_directive("songbird=info".parse()?),
        )
        .init();

    info!("🔊 Iniciando clipbot v{}", env!("CARGO_PKG_VERSION"));

    // Cargar configuración
    let config = Config::load()?;
    info!("{}", config.summary());

    if std::env::args().any(|arg| arg == "--health-check") {
        return health_check(&config);
    }

    // Almacenamiento JSON de configuración
    let storage = Arc::new(tokio::sync::Mutex::new(
        JsonStorage::new(config.data_dir.clone()).await?,
    ));

    // Fuentes de clips
    let sources = Arc::new(SourceManager::new(&config)?);

    // Voz
    let songbird = Songbird::serenity();
    let directory = Arc::new(SerenityDirectory::new(storage.clone()));
    let registry = Arc::new(SessionRegistry::new(
        directory.clone(),
        Arc::new(SongbirdSinkFactory::new(songbird.clone())),
    ));

    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_VOICE_STATES
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    let handler = ClipBot::new(config.clone(), storage, sources, registry);

    let mut client = Client::builder(&config.discord_token, intents)
        .event_handler(handler)
        .register_songbird_with(songbird)
        .await?;

    directory.attach(client.cache.clone(), client.http.clone());

    // Apagado limpio
    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("No se pudo escuchar Ctrl+C: {:?}", e);
            return;
        }
        info!("⚠️ Señal de apagado recibida, cerrando...");
        shard_manager.shutdown_all().await;
    });

    info!("🚀 Bot iniciado");
    if let Err(why) = client.start().await {
        error!("Error del cliente: {:?}", why);
    }

    Ok(())
}

/// Checks that the resource directory has what the bot needs.
fn health_check(config: &Config) -> Result<()> {
    let clips = config.clips_dir();
    if !clips.is_dir() {
        anyhow::bail!("Missing clips directory: {}", clips.display());
    }

    for optional in ["dota_responses.json", "tts_fixes.json", "questions.json"] {
        let path = config.json_resource(optional);
        if !path.is_file() {
            warn!("Falta {}, la función que lo usa queda desactivada", path.display());
        }
    }

    println!("OK");
    Ok(())
}
