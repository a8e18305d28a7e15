//! Streams one touchline after an OAuth login.
//!
//! Usage: `noren-ws-oauth [cred.properties]`. The authorization page is opened in a browser and
//! the `code` from the redirect URL is read from stdin.

use std::{io::Write, process::Stdio, sync::Arc, time::Duration};

use nautilus_adapters_noren::{
    websocket::{NorenWsError, NorenWsMessage},
    NorenHttpClient, NorenWebSocketClient, NorenWsCallback, OAuthCredential, OAuthHandler,
};

const SUBSCRIPTION_KEY: &str = "NSE|22";

struct ExampleCallback;

impl NorenWsCallback for ExampleCallback {
    fn handle_open(&self) {
        println!("Feed open");
    }

    fn handle_message(&self, message: NorenWsMessage) {
        println!("{message:?}");
    }

    fn handle_error(&self, error: &NorenWsError) {
        println!("Feed error: {error}");
    }

    fn handle_close(&self) {
        println!("Feed closed");
    }
}

fn open_browser(url: &str) -> std::io::Result<()> {
    let mut command = if cfg!(target_os = "windows") {
        let mut command = std::process::Command::new("rundll32");
        command.arg("url.dll,FileProtocolHandler");
        command
    } else if cfg!(target_os = "macos") {
        std::process::Command::new("open")
    } else {
        std::process::Command::new("xdg-open")
    };
    command
        .arg(url)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map(|_| ())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    println!("Starting Noren WebSocket test...");

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "cred.properties".to_string());
    let credential = OAuthCredential::from_properties_file(&path)?;
    let oauth = OAuthHandler::new(credential, 30)?;

    let url = oauth.authorization_url()?;
    println!("\nOpening browser for OAuth login...");
    println!("If it does not open automatically, visit:\n{url}");
    if let Err(e) = open_browser(&url) {
        eprintln!("Could not open a browser ({e}), please open the URL manually");
    }

    print!("\nEnter the code from the redirect URL: ");
    std::io::stdout().flush()?;
    let code = tokio::task::spawn_blocking(|| {
        let mut line = String::new();
        std::io::stdin().read_line(&mut line).map(|_| line)
    })
    .await??;

    let token = match oauth.get_access_token(&code).await {
        Ok(token) => token,
        Err(e) => {
            println!("Failed to get access token. {e}");
            return Ok(());
        }
    };
    let Some(access_token) = token.access_token.as_deref() else {
        println!("Failed to get access token.");
        return Ok(());
    };

    println!("\nAccess token generated:");
    println!("Access Token: {access_token}");
    println!("UID: {}", token.uid);
    println!("Account ID: {}", token.actid);

    let api = NorenHttpClient::from_oauth(oauth.config(), &token)?;
    let mut ws = NorenWebSocketClient::new(oauth.config().clone(), api.session());
    ws.start(Arc::new(ExampleCallback)).await?;

    ws.subscribe(&[SUBSCRIPTION_KEY])?;
    println!("Subscribed to: {SUBSCRIPTION_KEY}");
    tokio::time::sleep(Duration::from_secs(10)).await;

    ws.unsubscribe(&[SUBSCRIPTION_KEY])?;
    println!("Unsubscribed from: {SUBSCRIPTION_KEY}");

    let mut idle = tokio::time::interval(Duration::from_secs(2));
    loop {
        tokio::select! {
            _ = idle.tick() => {}
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    ws.close().await;
    Ok(())
}
