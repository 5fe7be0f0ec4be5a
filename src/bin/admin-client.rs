use std::path::PathBuf;
use std::sync::Arc;

use admin_api_client::api::auth;
use admin_api_client::config::loader;
use admin_api_client::config::settings::StorageStrategy;
use admin_api_client::helpers::{jwt, time};
use admin_api_client::session::{LoggingBrowsingContext, ResponseBody};
use admin_api_client::utils::logging::{self, LogLevel};
use admin_api_client::{AuthSession, RequestOptions};
use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use reqwest::Method;
use tracing::{info, warn};

#[derive(Parser)]
#[command(
    author,
    version,
    about,
    long_about = None,
    after_help = "With storage.strategy cookie_preferred the refresh cookie lives only as long as one \
invocation, so a later command cannot refresh an expired access credential. Use local_persistent \
to keep sessions across invocations."
)]
struct Args {
    #[arg(short, long, env = "CONFIG", default_value = "admin-client.yaml")]
    config: PathBuf,
    #[arg(long, env = "LOG_LEVEL", value_enum)]
    log_level: Option<LogLevel>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Exchange email and password for credentials
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "ADMIN_CLIENT_PASSWORD")]
        password: String,
    },
    /// Revoke the current session and clear local credentials
    Logout,
    /// Revoke every session of the current user
    LogoutAll,
    /// Show which credentials are held locally
    Status,
    /// Perform an authenticated request and print the response body
    Request {
        /// GET, POST, PATCH, DELETE ...
        method: String,
        path: String,
        /// JSON request body
        #[arg(long)]
        data: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // -------------------------------
    // 1. Load YAML config, init logging
    // -------------------------------

    let args = Args::parse();
    let client_config = loader::file_to_config(&args.config)?;
    logging::run(&client_config, args.log_level)?;

    // -------------------------------
    // 2. Create the session
    // -------------------------------

    let session = AuthSession::from_config(&client_config, Arc::new(LoggingBrowsingContext))?;
    info!(base_url = %session.base_url(), strategy = ?session.tokens().strategy(), "session ready");
    if session.tokens().strategy() == StorageStrategy::CookiePreferred {
        // the cookie jar dies with the process
        warn!("cookie_preferred keeps the refresh credential in this process only; use local_persistent to refresh across invocations");
    }

    // -------------------------------
    // 3. Run the command
    // -------------------------------

    match args.command {
        Command::Login { email, password } => {
            auth::login(&session, &email, &password).await?;
            println!("logged in as {}", email);
        }
        Command::Logout => auth::logout(&session).await,
        Command::LogoutAll => auth::logout_all(&session).await,
        Command::Status => print_status(&session),
        Command::Request { method, path, data } => {
            let method = Method::from_bytes(method.to_uppercase().as_bytes())
                .map_err(|e| anyhow!("invalid method '{}': {}", method, e))?;
            let mut options = RequestOptions::new(method);
            if let Some(data) = data {
                let body = serde_json::from_str(&data).context("--data must be valid JSON")?;
                options = options.json(body);
            }
            match session.request(&path, options).await? {
                ResponseBody::Json(value) => println!("{}", serde_json::to_string_pretty(&value)?),
                ResponseBody::Text(text) => println!("{}", text),
            }
        }
    }

    Ok(())
}

fn print_status(session: &AuthSession) {
    match session.tokens().get_access() {
        Ok(Some(access)) => {
            let expiry = jwt::expires_at(&access)
                .and_then(time::unix_to_rfc3339)
                .unwrap_or_else(|| "unknown".to_owned());
            println!("access credential: {}, expires at {}", access_state(&access), expiry);
        }
        Ok(None) => println!("access credential: none"),
        Err(e) => println!("access credential: {}", anyhow!(e)),
    }
    match session.tokens().get_refresh() {
        Ok(Some(_)) => println!("refresh credential: stored locally"),
        Ok(None) => println!("refresh credential: not stored locally ({:?})", session.tokens().strategy()),
        Err(e) => println!("refresh credential: {}", anyhow!(e)),
    }
}

fn access_state(access: &str) -> &'static str {
    match jwt::is_expired(access) {
        Some(true) => "expired",
        Some(false) => "valid",
        None => "present",
    }
}
