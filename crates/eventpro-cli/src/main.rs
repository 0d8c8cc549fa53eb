//! EventPro CLI - a command-line client for the EventPro portal.
//!
//! Logs in against the portal API, keeps the session on disk between runs and
//! prints portal data as JSON.

mod credentials;

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use serde_json::json;
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use eventpro_core::{
    Credentials, MockTable, NewAccount, PortalConfig, RequestPipeline, Role, SessionStore,
};

use credentials::RememberedPasswords;

/// Directory for log files; logs go to stderr when unset
const LOG_DIR_ENV: &str = "EVENTPRO_LOG_DIR";

const USAGE: &str = "\
Usage: eventpro <command> [args]

Commands:
  login [email] [--remember]   Log in (password from keychain or prompt)
  register <name> <email>      Create a client account and log in
  logout [--forget]            End the session
  whoami                       Show the current session
  verify                       Ask the server whether the session is valid
  events [category_id]         List events
  event <id>                   Show one event
  join <id>                    Register for an event
  leave <id>                   Cancel a registration
  categories                   List categories
  my-events                    List your registrations
  stats                        Dashboard statistics (admin)";

/// Initialize the tracing subscriber for logging.
///
/// The returned guard flushes the file writer and must live until exit.
fn init_tracing() -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    match std::env::var(LOG_DIR_ENV) {
        Ok(dir) if !dir.is_empty() => {
            let appender = tracing_appender::rolling::daily(dir, "eventpro.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(writer).with_ansi(false))
                .with(filter)
                .init();
            Some(guard)
        }
        _ => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(io::stderr))
                .with(filter)
                .init();
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();
    let _guard = init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first().map(String::as_str) else {
        println!("{}", USAGE);
        return Ok(());
    };
    if matches!(command, "-h" | "--help" | "help") {
        println!("{}", USAGE);
        return Ok(());
    }

    let config = PortalConfig::load()?;
    info!(base_url = %config.base_url, mock_mode = config.mock_mode, "EventPro CLI starting");

    let session = Arc::new(SessionStore::open(&config)?);
    let mut pipeline = RequestPipeline::new(&config, session.clone())?;
    if config.mock_mode {
        pipeline = pipeline.with_mock_table(Arc::new(MockTable::demo()));
    }
    let api = Arc::new(pipeline);

    // Keeps the token fresh while a command is in flight; stops on drop
    let _refresh =
        SessionStore::spawn_refresh_task(api.clone(), config.refresh_interval(), config.refresh_threshold());

    let rest = &args[1..];
    match command {
        "login" => login(&api, rest).await,
        "register" => register(&api, rest).await,
        "logout" => logout(&api, rest).await,
        "whoami" => whoami(&session),
        "verify" => {
            let valid = api.session().verify(&api).await;
            print_json(&json!({ "valid": valid }))
        }
        "events" => {
            let category = rest.first().map(|s| parse_id(s)).transpose()?;
            print_json(&api.fetch_events(category).await?)
        }
        "event" => print_json(&api.fetch_event(required_id(rest)?).await?),
        "join" => {
            let id = required_id(rest)?;
            api.register_for_event(id).await?;
            print_json(&json!({ "registered": id }))
        }
        "leave" => {
            let id = required_id(rest)?;
            api.unregister_from_event(id).await?;
            print_json(&json!({ "unregistered": id }))
        }
        "categories" => print_json(&api.fetch_categories().await?),
        "my-events" => print_json(&api.fetch_my_inscriptions().await?),
        "stats" => print_json(&api.fetch_dashboard_stats().await?),
        other => bail!("Unknown command: {}\n\n{}", other, USAGE),
    }
}

async fn login(api: &RequestPipeline, args: &[String]) -> Result<()> {
    let remember = args.iter().any(|a| a == "--remember");
    let email = match args.iter().find(|a| !a.starts_with("--")) {
        Some(email) => email.clone(),
        None => prompt("Email: ")?,
    };

    let password = match RememberedPasswords::recall(&email)? {
        Some(password) => {
            debug!(%email, "Using password from keychain");
            password
        }
        None => rpassword::prompt_password("Password: ").context("Failed to read password")?,
    };

    let credentials = Credentials::new(email.clone(), password.clone());
    let session = api
        .session()
        .login(api, &credentials)
        .await
        .map_err(|e| anyhow!(e.user_message()))?;

    if remember {
        RememberedPasswords::remember(&email, &password)?;
    }
    print_json(&session.user())
}

async fn register(api: &RequestPipeline, args: &[String]) -> Result<()> {
    let (Some(name), Some(email)) = (args.first(), args.get(1)) else {
        bail!("Usage: eventpro register <name> <email>");
    };
    let password = rpassword::prompt_password("Password: ").context("Failed to read password")?;

    let account = NewAccount {
        name: name.clone(),
        email: email.clone(),
        password,
        role: Role::Client,
    };
    let session = api
        .session()
        .register(api, &account)
        .await
        .map_err(|e| anyhow!(e.user_message()))?;
    print_json(&session.user())
}

async fn logout(api: &RequestPipeline, args: &[String]) -> Result<()> {
    let email = api.session().current().map(|s| s.email);
    api.session().logout().await;

    if args.iter().any(|a| a == "--forget") {
        if let Some(email) = email {
            RememberedPasswords::forget(&email)?;
        }
    }
    print_json(&json!({ "logged_out": true }))
}

fn whoami(session: &SessionStore) -> Result<()> {
    let Some(current) = session.current() else {
        bail!("Not logged in");
    };
    print_json(&json!({
        "user": current.user(),
        "expires_at": current.expires_at,
        "minutes_left": current.minutes_until_expiry(session.now()),
    }))
}

fn required_id(args: &[String]) -> Result<i64> {
    let raw = args.first().ok_or_else(|| anyhow!("Missing id argument"))?;
    parse_id(raw)
}

fn parse_id(raw: &str) -> Result<i64> {
    raw.parse().with_context(|| format!("Invalid id: {}", raw))
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
