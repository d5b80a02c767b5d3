use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use livro::assist::Assist;
use livro::config::Config;
use livro::error::{LivroError, Result};
use livro::llm::OpenAiProvider;
use livro::server::{build_router, AppState};
use livro::store::Store;

#[derive(Parser, Debug)]
#[command(name = "livrod")]
#[command(about = "Book-writing progress tracker service")]
struct Cli {
    #[arg(long, env = "LIVRO_CONFIG")]
    config: Option<String>,

    #[arg(long, env = "LIVRO_DB", default_value = "./data/livro.db")]
    db: String,

    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    #[arg(long, default_value_t = 7979)]
    port: u16,

    #[arg(long, env = "LIVRO_OWNER_OPEN_ID")]
    owner_open_id: Option<String>,

    #[arg(long, env = "OPENAI_API_KEY")]
    openai_api_key: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let config = match cli.config.as_deref() {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    let db_path = config.sqlite_path.clone().unwrap_or(cli.db);
    let host = config.host.clone().unwrap_or(cli.host);
    let port = config.port.unwrap_or(cli.port);
    let owner_open_id = config.owner_open_id.clone().or(cli.owner_open_id);

    let openai = config.openai.clone().unwrap_or_else(|| livro::config::OpenAiConfig {
        api_key: None,
        model: None,
        base_url: None,
    });
    let api_key = cli
        .openai_api_key
        .or(openai.api_key)
        .ok_or_else(|| LivroError::Config("missing OpenAI API key".to_string()))?;

    let store = Arc::new(Store::new(&db_path, owner_open_id).await?);
    let provider = Arc::new(OpenAiProvider::new(api_key, openai.model, openai.base_url));
    let assist = Arc::new(Assist::new(provider));

    let app = build_router(AppState { store, assist });
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| LivroError::Runtime(e.to_string()))?;
    tracing::info!(addr = %addr, db = %db_path, "listening");

    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| LivroError::Runtime(e.to_string()))?;

    Ok(())
}
