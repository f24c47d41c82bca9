use anyhow::Result;
use tracing::info;

use phrasebook::{
    BackendKind, Config, KvFile, Locale, LocalBackend, PhraseFacade, PhraseManager, RecordClient,
    RemoteBackend,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored in production)
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("phrasebook=info".parse()?),
        )
        .init();

    info!("Starting phrasebook");

    // Load configuration from environment
    let config = Config::from_env()?;

    let local = LocalBackend::new(KvFile::new(&config.local_store_path));
    let remote = RemoteBackend::new(RecordClient::from_config(&config));
    let facade = PhraseFacade::new(local, remote);
    let mut manager = PhraseManager::new(facade, BackendKind::Local);

    // Locale pair from the command line, defaulting to en/it
    let mut args = std::env::args().skip(1);
    let primary = Locale::new(args.next().unwrap_or_else(|| "en".to_string()));
    let secondary = Locale::new(args.next().unwrap_or_else(|| "it".to_string()));

    manager
        .fetch_for_locale_pair(primary.clone(), secondary.clone())
        .await?;

    info!(
        "{} phrases stored for {}/{}",
        manager.phrases().len(),
        primary,
        secondary
    );
    for phrase in manager.phrases() {
        info!(
            id = %phrase.id,
            primary = phrase.translations.display_value(&primary).unwrap_or(""),
            secondary = phrase.translations.display_value(&secondary).unwrap_or(""),
            "phrase"
        );
    }

    Ok(())
}
