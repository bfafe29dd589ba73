// UI layer: interactive prompts with `dialoguer` and progress output with
// `indicatif`. All prompts and bars draw on stderr so stdout stays clean
// for listings.

use crate::api::{self, ApiClient, Token};
use anyhow::{Context, Result};
use dialoguer::{Confirm, Input, Password};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

const CREATE_APP_URL: &str = "https://www.dropbox.com/developers/apps/create";

/// Walk the user through creating an app and authorizing it, then exchange
/// the authorization code for an access token.
pub fn setup_wizard(api: &ApiClient) -> Result<Token> {
    eprintln!("You need to complete this setup in order to use dbox.");
    eprintln!("Open the following URL in your browser and log in: {}", CREATE_APP_URL);
    eprintln!("Choose 'Dropbox API app', then the permissions and access restrictions you want.");
    eprintln!("Once the app is created, open its configuration page and enter its keys below.");

    let (app_key, app_secret) = loop {
        let key: String = Input::new().with_prompt("App key").interact_text()?;
        // `Password` hides the secret while it is typed.
        let secret: String = Password::new().with_prompt("App secret").interact()?;
        let ok = Confirm::new()
            .with_prompt(format!("Use app key {}?", key))
            .default(true)
            .interact()?;
        if ok {
            break (key, secret);
        }
    };

    eprintln!(
        "Now open the following URL in your browser: {}",
        api::authorize_url(&app_key)?
    );
    let code = loop {
        let code: String = Input::new()
            .with_prompt("Authorization code")
            .interact_text()?;
        let ok = Confirm::new()
            .with_prompt(format!("The authorization code is {}. Is it OK?", code))
            .default(true)
            .interact()?;
        if ok {
            break code;
        }
    };

    let pb = spinner("Requesting access token...")?;
    let token = api.exchange_code(&app_key, &app_secret, code.trim());
    pb.finish_and_clear();
    let token = token.context("authorization failed")?;
    eprintln!("Authorization complete.");
    Ok(token)
}

/// Ask before deleting `path`. Defaults to "no".
pub fn confirm_delete(path: &str) -> Result<bool> {
    let answer = Confirm::new()
        .with_prompt(format!("Are you sure you want to delete {}?", path))
        .default(false)
        .interact()?;
    Ok(answer)
}

/// Ticking spinner for calls without a known size.
pub fn spinner(msg: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::with_template("{spinner} {msg}")?);
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

/// Byte progress bar for one file transfer; the length is set once the
/// size is known.
pub fn transfer_bar(name: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::with_template("{msg:30!} [{bar:30}] {bytes}/{total_bytes} {bytes_per_sec}")?
            .progress_chars("=> "),
    );
    pb.set_message(name.to_string());
    Ok(pb)
}
