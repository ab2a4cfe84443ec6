//! Currency converter bot on stdin/stdout
//!
//! # Usage
//!
//! ```bash
//! export API_BASE="https://v6.exchangerate-api.com/v6/<key>/latest"
//! export OPENAI_API_KEY="sk-..."
//! cargo run --bin fx-bot -- --user-id 42
//! ```
//!
//! Type menu payloads shown in brackets (e.g. `base:USD`) or an amount.

use anyhow::Context;
use clap::Parser;
use fxbot::api::ExchangeRateClient;
use fxbot::bot::{Action, Orchestrator, Render, render, render_error};
use fxbot::explain::LlmExplainer;
use fxbot::store::{MemoryStore, Store};
use fxbot::user::UserProfile;
use fxbot::BotConfig;
use fxbot_llm::providers::{OpenAIConfig, OpenAIProvider};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "fx-bot")]
#[command(about = "Currency converter bot on the terminal", long_about = None)]
struct Args {
    /// Chat user id to act as
    #[arg(short, long, default_value_t = 1)]
    user_id: i64,

    /// Username to register
    #[arg(long)]
    username: Option<String>,
}

fn print(render: &Render) {
    println!("{}", render.text);
    for choice in &render.choices {
        println!("  [{}] {}", choice.data, choice.label);
    }
    println!();
}

async fn build_store(config: &BotConfig) -> anyhow::Result<Arc<dyn Store>> {
    match config.database_url.as_deref() {
        #[cfg(feature = "postgres")]
        Some(url) => {
            let store = fxbot::store::PgStore::connect(url)
                .await
                .context("failed to connect to DATABASE_URL")?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "postgres"))]
        Some(_) => {
            warn!("DATABASE_URL is set but postgres support is not compiled in; using memory");
            Ok(Arc::new(MemoryStore::new()))
        }
        None => {
            info!("DATABASE_URL not set; favorites are kept in memory");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fxbot_utils::load_dotenv();
    fxbot_utils::init_tracing("warn,fxbot=info");

    let args = Args::parse();
    let config = BotConfig::from_env().context("invalid configuration")?;

    let rates = ExchangeRateClient::new(&config.api_base, config.request_timeout)?;

    let mut llm_config = OpenAIConfig::new(&config.openai_api_key)
        .with_timeout(config.llm_timeout.as_secs());
    if let Some(base) = &config.openai_api_base {
        llm_config = llm_config.with_api_base(base);
    }
    let provider = Arc::new(OpenAIProvider::with_config(llm_config)?);
    let explainer = LlmExplainer::new(provider, &config.openai_model);

    let store = build_store(&config).await?;
    let bot = Arc::new(Orchestrator::new(
        &config,
        Arc::new(rates),
        store,
        Arc::new(explainer),
    ));

    let max_idle = chrono::Duration::from_std(config.session_max_idle)?;
    let sweeper = Arc::clone(&bot);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(std::time::Duration::from_secs(60));
        loop {
            ticker.tick().await;
            sweeper.cleanup_sessions(max_idle);
        }
    });

    let mut user = UserProfile::new(args.user_id);
    if let Some(username) = args.username {
        user = user.with_username(username);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut next = Some(Action::Start);

    loop {
        if let Some(action) = next.take() {
            match bot.handle(&user, action).await {
                Ok(view) => print(&render(&view)),
                Err(e) => {
                    warn!("Action failed: {}", e);
                    print(&render_error(&e));
                }
            }
        }

        let Some(line) = lines.next_line().await? else {
            println!("Goodbye!");
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if matches!(input, "/exit" | "/quit") {
            println!("Goodbye!");
            break;
        }

        match Action::parse(input) {
            Ok(action) => next = Some(action),
            Err(e) => print(&render_error(&e)),
        }
    }

    bot.shutdown().await;
    Ok(())
}
