//! Session utility: interactive user sign-in that produces the *.session
//! file other tools need to act on behalf of the user.

use clap::Parser;
use dotenv::dotenv;
use inquire::{Password, PasswordDisplayMode, Text};
use std::path::PathBuf;
use tg_recall::adapters::telegram::{auth, session};
use tg_recall::domain::DomainError;
use tg_recall::shared::config::{ConfigView, TelegramConfig, expand_user};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Message sent to Saved Messages after a fresh sign-in, as a visible
/// confirmation that the session works.
const SESSION_NOTE: &str = "Hello! Friend. This is a message for getting *.session file";

/// Generates the *.session file for a Telegram user account.
#[derive(Debug, Parser)]
#[command(name = "sessiongen", version, about)]
struct Cli {
    /// Path to the YAML config file.
    #[arg(short, long, env = "CONFIG_FILE", default_value = "config.yml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenv();
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let view = ConfigView::load(&cli.config)?;

    let telegram = TelegramConfig {
        api_id: view.get("telegram.api_id")?,
        api_hash: view.get("telegram.api_hash")?,
    };
    let session_file = expand_user(&view.get::<String>("telegram.session_file")?);
    let phone: String = view.get("telegram.phone_number")?;

    let client = auth::connect(&session_file, &telegram, false).await?;

    let freshly_signed_in = if auth::is_authorized(&client).await? {
        false
    } else {
        auth::sign_in_user(
            &client,
            &phone,
            || prompt_text("Enter the code:"),
            || prompt_password("Enter your 2FA password:"),
        )
        .await?;
        session::persist(&client, &session_file)?;
        true
    };

    let me = client
        .get_me()
        .await
        .map_err(|e| anyhow::anyhow!("get_me: {e}"))?;

    if freshly_signed_in {
        client
            .send_message(me.pack(), SESSION_NOTE)
            .await
            .map_err(|e| anyhow::anyhow!("send session note: {e}"))?;
        println!("Look in the Telegram for a new message...");
    }

    println!(
        "File '{}' is valid for '{}' user",
        session_file.display(),
        me.username().unwrap_or_default()
    );
    Ok(())
}

fn prompt_text(message: &str) -> Result<String, DomainError> {
    Text::new(message)
        .prompt()
        .map_err(|e| DomainError::Auth(e.to_string()))
}

fn prompt_password(message: &str) -> Result<String, DomainError> {
    Password::new(message)
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .prompt()
        .map_err(|e| DomainError::Auth(e.to_string()))
}
