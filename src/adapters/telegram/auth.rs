//! Connection and sign-in flows over grammers.
//!
//! The bot binary signs in with a bot token; the session utility walks the
//! interactive user flow (login code, optional 2FA password).

use crate::adapters::telegram::session;
use crate::domain::DomainError;
use crate::shared::config::TelegramConfig;
use grammers_client::{Client, Config, InitParams, SignInError};
use std::path::Path;
use tracing::info;

/// Connect with the session stored at `session_file`, creating it on first
/// run. `catch_up` asks the server to replay updates missed while offline.
pub async fn connect(
    session_file: &Path,
    telegram: &TelegramConfig,
    catch_up: bool,
) -> Result<Client, DomainError> {
    let session = session::load_or_create(session_file).await?;
    Client::connect(Config {
        session,
        api_id: telegram.api_id,
        api_hash: telegram.api_hash.clone(),
        params: InitParams {
            catch_up,
            ..Default::default()
        },
    })
    .await
    .map_err(|e| DomainError::ChatGateway(format!("connect: {e}")))
}

pub async fn is_authorized(client: &Client) -> Result<bool, DomainError> {
    client
        .is_authorized()
        .await
        .map_err(|e| DomainError::Auth(e.to_string()))
}

/// Sign the bot account in when the stored session is not yet authorized.
/// The session file is rewritten after a fresh sign-in.
pub async fn ensure_bot_signed_in(
    client: &Client,
    token: &str,
    session_file: &Path,
) -> Result<(), DomainError> {
    if is_authorized(client).await? {
        return Ok(());
    }
    info!("session not authorized; signing in with the bot token");
    client
        .bot_sign_in(token)
        .await
        .map_err(|e| DomainError::Auth(format!("bot sign-in: {e}")))?;
    session::persist(client, session_file)?;
    Ok(())
}

/// Interactive user sign-in. Requests a login code for `phone`, reads it via
/// `ask_code`, and reads the 2FA password via `ask_password` when the
/// account has one.
pub async fn sign_in_user<C, P>(
    client: &Client,
    phone: &str,
    ask_code: C,
    ask_password: P,
) -> Result<(), DomainError>
where
    C: FnOnce() -> Result<String, DomainError>,
    P: FnOnce() -> Result<String, DomainError>,
{
    let token = client
        .request_login_code(phone)
        .await
        .map_err(|e| DomainError::Auth(format!("request login code: {e}")))?;
    let code = ask_code()?;
    match client.sign_in(&token, code.trim()).await {
        Ok(_user) => Ok(()),
        Err(SignInError::PasswordRequired(password_token)) => {
            let password = ask_password()?;
            client
                .check_password(password_token, password.trim())
                .await
                .map_err(|e| DomainError::Auth(format!("2FA password: {e}")))?;
            Ok(())
        }
        Err(SignInError::InvalidCode) => Err(DomainError::Auth("invalid login code".to_string())),
        Err(e) => Err(DomainError::Auth(format!("sign in: {e}"))),
    }
}
