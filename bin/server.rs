// Statement ledger web server

use std::error::Error;
use std::sync::Arc;

use log::info;
use statement_ledger::http::{router, AppState};
use statement_ledger::llm::GeminiStatementParser;
use statement_ledger::{LocalStorage, Settings};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let settings = Settings::from_env()?;
    info!(
        "Storing statements under {}",
        settings.local_storage_dir_path.display()
    );

    let storage = Arc::new(LocalStorage::new(settings.local_storage_dir_path.clone()));
    let parser = Arc::new(GeminiStatementParser::from_settings(&settings));
    let app = router(AppState::new(storage, parser));

    let listener = tokio::net::TcpListener::bind(&settings.server_addr).await?;
    info!("Listening on {}", settings.server_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
