//! tourledger - command-line access to reservations, quotations and offers.
//!
//! Every command works against the local cache when the record service is
//! unreachable; changes made offline stay in the cache.

mod cli;
mod output;

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::Value;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tourledger_core::auth::{Session, SessionData};
use tourledger_core::models::collection;
use tourledger_core::sync::Source;
use tourledger_core::{
    ActualRatesWorkflow, ApiClient, CacheManager, Config, DeleteOutcome, DerivedState, Fields,
    RecordId, SyncGateway,
};

use cli::{Cli, Command};
use output::{print_record, print_records};

/// Environment variable carrying an issued bearer token
const TOKEN_ENV: &str = "TOURLEDGER_TOKEN";

/// Subdirectory of the cache directory holding collection files
const COLLECTIONS_DIR: &str = "collections";

/// Initialize the tracing subscriber for logging.
/// Logs go to stderr, and to a daily rolling file when `log_dir` is set.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "tourledger.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let mut config = Config::load().context("Failed to load configuration")?;
    let _log_guard = init_tracing(config.log_dir.as_deref());
    info!(base_url = %config.base_url, offline = config.offline_mode, "tourledger starting");

    let cache_dir = config.cache_dir().unwrap_or_else(|_| PathBuf::from("./cache"));
    let mut session = Session::new(cache_dir.clone());
    if let Err(e) = session.load() {
        warn!(error = %e, "Ignoring unreadable session");
    }

    match cli.command {
        Command::Login { token, username } => {
            let remember = username.is_some();
            let username = login_username(username, &config);
            session.update(SessionData::new(token, username.clone()));
            session.save().context("Failed to save session")?;
            if remember {
                config.last_username = username.clone();
                config.save()?;
            }
            match username {
                Some(name) => println!("Token stored for {}.", name),
                None => println!("Token stored."),
            }
        }
        Command::Logout => {
            session.clear().context("Failed to clear session")?;
            println!("Token removed.");
        }
        command => {
            let gateway = build_gateway(&config, &session, &cache_dir)?;
            run(command, cli.local, cli.summary, session.username(), gateway).await?;
        }
    }
    Ok(())
}

fn build_gateway(config: &Config, session: &Session, cache_dir: &Path) -> Result<Arc<SyncGateway>> {
    let token = std::env::var(TOKEN_ENV)
        .ok()
        .filter(|t| !t.trim().is_empty())
        .or_else(|| session.token().map(str::to_string));

    let mut api = ApiClient::new(&config.base_url, config.request_timeout())?;
    match token {
        Some(token) => api.set_token(token),
        None => info!("No token stored, working from cache"),
    }
    let cache = CacheManager::new(cache_dir.join(COLLECTIONS_DIR))?;
    Ok(Arc::new(SyncGateway::new(Arc::new(api), cache, config.sync_options())))
}

/// Username to store with a new token, falling back to the last one used.
fn login_username(given: Option<String>, config: &Config) -> Option<String> {
    given.or_else(|| config.last_username.clone())
}

fn parse_fields(json: &str) -> Result<Fields> {
    let value: Value = serde_json::from_str(json).context("Argument is not valid JSON")?;
    match value {
        Value::Object(fields) => Ok(fields),
        _ => anyhow::bail!("Expected a JSON object, e.g. '{{\"group\": \"Nile Trip\"}}'"),
    }
}

async fn run(
    command: Command,
    local: bool,
    summary: bool,
    user: Option<&str>,
    gateway: Arc<SyncGateway>,
) -> Result<()> {
    match command {
        Command::Status => {
            let status = gateway.status(collection::ALL).await;
            if let Some(user) = user {
                println!("user: {}", user);
            }
            let service = match (status.offline_mode, status.available) {
                (true, _) => "offline (forced)",
                (false, true) => "online",
                (false, false) => "unreachable - working from cache",
            };
            println!("service: {}", service);
            for (name, age) in status.cache_ages {
                println!("  {:<16} {}", name, age);
            }
            if status.stale && status.available {
                println!("cache is stale; run `tourledger refresh`");
            }
        }
        Command::ClearCache { collection: only } => {
            let names: Vec<&str> = match only.as_deref() {
                Some(name) => vec![name],
                None => collection::ALL.to_vec(),
            };
            for name in names {
                gateway.cache().clear(name)?;
                println!("cleared {}", name);
            }
        }
        Command::Refresh => {
            gateway.probe().invalidate();
            for report in gateway.refresh_all(collection::ALL).await {
                let source = match report.source {
                    Source::Remote => "refreshed",
                    Source::Local => "cached",
                };
                println!("{:<16} {:>5} records ({})", report.collection, report.count, source);
            }
        }
        Command::List { collection } => {
            let records = if local {
                gateway.list_all_local(&collection)
            } else {
                gateway.list_all(&collection).await
            };
            print_records(&records, summary)?;
        }
        Command::Get { collection, id } => {
            let id = RecordId::parse(&id);
            let record = if local {
                gateway.get_one_local(&collection, &id)
            } else {
                gateway.get_one(&collection, &id).await
            };
            print_record(record.as_ref(), summary)?;
        }
        Command::Create { collection, json } => {
            let record = gateway.create(&collection, parse_fields(&json)?).await?;
            print_record(Some(&record), summary)?;
        }
        Command::Update { collection, id, json } => {
            let id = RecordId::parse(&id);
            match gateway.update(&collection, &id, parse_fields(&json)?).await {
                Some(record) => print_record(Some(&record), summary)?,
                None => println!("nothing to update: no {} record with id {}", collection, id),
            }
        }
        Command::Delete { collection, id } => {
            match gateway.delete(&collection, &RecordId::parse(&id)).await {
                DeleteOutcome::Remote(body) => {
                    println!("deleted");
                    if !body.is_null() {
                        println!("{}", serde_json::to_string_pretty(&body)?);
                    }
                }
                DeleteOutcome::Local(remaining) => {
                    println!("deleted locally ({} records remain)", remaining.len());
                }
            }
        }
        Command::ActualRates { quotation_id, create } => {
            let workflow = ActualRatesWorkflow::new(gateway);
            let derivation = workflow.load(&RecordId::parse(&quotation_id), create).await;
            if derivation.source.is_none() {
                println!("no quotation with id {}", quotation_id);
                return Ok(());
            }
            if derivation.is_absent() {
                println!("no actual rates yet for quotation {} (use --create)", quotation_id);
                return Ok(());
            }
            if matches!(derivation.state, DerivedState::Derived(_)) {
                info!(%quotation_id, "Actual rates derived from quotation");
            }
            print_record(derivation.derived(), summary)?;
        }
        Command::SaveActualRates { id, json } => {
            let workflow = ActualRatesWorkflow::new(gateway);
            match workflow.save(&RecordId::parse(&id), parse_fields(&json)?).await {
                Some(record) => print_record(Some(&record), summary)?,
                None => println!("nothing to update: no actual rates record with id {}", id),
            }
        }
        Command::Login { .. } | Command::Logout => {
            anyhow::bail!("session commands do not go through the gateway")
        }
    }
    Ok(())
}
