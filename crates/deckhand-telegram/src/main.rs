//! Deckhand Telegram bot binary.
//!
//! Start the bot with:
//! ```bash
//! TELEGRAM_BOT_TOKEN=xxx OWNER_ID=123 cargo run -p deckhand-telegram
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use deckhand_core::{config, Config};
use deckhand_telegram::{BotState, Collaborators, DeckhandBot};
use secrecy::ExposeSecret;
use tracing_subscriber::EnvFilter;

/// Deckhand - deploy to Heroku, edit GitHub repos and ask OpenAI from Telegram
#[derive(Parser, Debug)]
#[command(name = "deckhand")]
#[command(about = "Telegram bot that drives GitHub, Heroku and OpenAI for its owner")]
struct Args {
    /// Working directory for clones, deploys and /exec
    #[arg(long)]
    workspace: Option<PathBuf>,

    /// Verbose logging (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from the base directory first
    let env_path = config::env_file();
    if env_path.exists() {
        let _ = dotenvy::from_path(&env_path);
    }
    // Then a local .env.local or .env
    let _ = dotenvy::from_filename(".env.local").or_else(|_| dotenvy::dotenv());

    let args = Args::parse();

    let filter = match args.verbose {
        0 => "deckhand_telegram=info,deckhand_process=info,teloxide=warn",
        1 => "deckhand=debug,deckhand_telegram=debug,deckhand_process=debug,deckhand_github=debug,deckhand_openai=debug,teloxide=info",
        2 => "deckhand=trace,deckhand_telegram=trace,deckhand_process=trace,deckhand_github=trace,deckhand_openai=trace,teloxide=debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(filter))
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            eprintln!("deckhand: {}", e);
            std::process::exit(2);
        }
    };
    if let Some(dir) = args.workspace {
        config = config.with_workspace_dir(dir);
    }

    if let Err(e) = config.ensure_workspace_dir() {
        tracing::warn!(error = %e, path = %config.workspace_dir.display(), "Failed to create workspace");
    }

    let tools = Collaborators::from_config(&config)?;
    let state = Arc::new(BotState::from_config(&config, tools));
    let bot = DeckhandBot::new(config.telegram_token.expose_secret(), state);

    match bot.get_me().await {
        Ok(username) => {
            tracing::info!(username = %username, "Bot initialized successfully");
            println!("\n[robot] Deckhand");
            println!("   Bot: @{}", username);
            println!("   Owner: {}", config.owner_id);
            println!("   Workspace: {}", config.workspace_dir.display());
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to get bot info");
            return Err(e.into());
        }
    }

    println!("\n[phone] Open Telegram and send /start to begin");
    println!("   Press Ctrl+C to stop\n");

    bot.start_polling().await?;

    Ok(())
}
