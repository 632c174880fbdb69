//! reposearch - search GitHub repositories from the terminal.
//!
//! Anonymous searches are limited to 60 per hour; `reposearch login` stores
//! a personal access token that raises the limit to 5000.

mod cli;
mod output;
mod rpc;
mod runtime;
mod surface;

use std::io;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use reposearch_core::auth::MessageSender;
use reposearch_core::{
    AuthResponse, Config, RuntimeMessage, RuntimePort, RuntimeResponse, SearchResponse, Session,
};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::{Cli, Command};
use runtime::Runtime;

/// Initialize the tracing subscriber for logging.
///
/// Logs always go to stderr so `serve` can own stdout.
fn init_tracing() -> WorkerGuard {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let (writer, guard) = tracing_appender::non_blocking(io::stderr());

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer))
        .with(filter)
        .init();
    guard
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();
    let _guard = init_tracing();

    let cli = Cli::parse();
    let mut config = Config::load().unwrap_or_else(|e| {
        warn!(error = %e, "Could not load config, using defaults");
        Config::default()
    });

    let runtime = Runtime::start(&config, cli.ephemeral)?;
    let port = &runtime.port;

    match cli.command {
        Command::Search { query, org, json } => {
            let org = match org {
                Some(org) => {
                    config.set_last_org(&org);
                    if let Err(e) = config.save() {
                        warn!(error = %e, "Could not remember organization");
                    }
                    config.last_org.clone()
                }
                None => config.last_org.clone(),
            };
            search(port, &query.join(" "), org, json).await
        }
        Command::Login => {
            let code = login(port).await?;
            if runtime.surface.has_open_prompt() {
                eprintln!("Timed out waiting for a token. Press Enter to dismiss the prompt.");
            }
            Ok(code)
        }
        Command::Logout => {
            let response = auth_request(port, RuntimeMessage::Logout).await?;
            match response.error {
                Some(error) => {
                    eprintln!("Error: {}", error);
                    Ok(ExitCode::FAILURE)
                }
                None => {
                    println!("Logged out");
                    Ok(ExitCode::SUCCESS)
                }
            }
        }
        Command::Status => {
            let session = auth_state(port).await;
            println!("{}", output::format_status(&session));
            Ok(ExitCode::SUCCESS)
        }
        Command::Serve => {
            rpc::serve_stdio(port).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn search(port: &RuntimePort, query: &str, org: Option<String>, json: bool) -> Result<ExitCode> {
    let response = port
        .request(
            MessageSender::external(),
            RuntimeMessage::SearchRepos {
                query: query.to_string(),
                org: org.clone(),
            },
        )
        .await?;
    let response = match response {
        Some(RuntimeResponse::Search(response)) => response,
        other => anyhow::bail!("Unexpected reply to search: {:?}", other),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(if response.error.is_some() {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        });
    }

    match response {
        SearchResponse {
            error: Some(error), ..
        } => {
            eprintln!("Error: {}", error);
            if error.starts_with("Rate limit exceeded") {
                eprintln!("Run `reposearch login` to authenticate with GitHub for higher rate limits.");
            }
            Ok(ExitCode::FAILURE)
        }
        SearchResponse { repos, .. } => {
            let repos = repos.unwrap_or_default();
            if repos.is_empty() {
                match org.as_deref() {
                    Some(org) => {
                        let session = auth_state(port).await;
                        println!("{}", output::empty_org_hint(query, org, &session));
                    }
                    None => println!("No repositories found for \"{}\"", query),
                }
            } else {
                println!("{}", output::format_results(&repos));
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn login(port: &RuntimePort) -> Result<ExitCode> {
    let response = auth_request(port, RuntimeMessage::Authenticate).await?;
    match response {
        AuthResponse {
            success: true,
            auth_state: Some(session),
            ..
        } if session.is_authenticated() => {
            info!("Login complete");
            println!("Authenticated. Searches are now limited to 5000 per hour.");
            Ok(ExitCode::SUCCESS)
        }
        AuthResponse { success: true, .. } => {
            println!("No token received; still not authenticated.");
            Ok(ExitCode::FAILURE)
        }
        AuthResponse { error, .. } => {
            eprintln!(
                "Error: {}",
                error.unwrap_or_else(|| "Authentication failed".to_string())
            );
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn auth_request(port: &RuntimePort, message: RuntimeMessage) -> Result<AuthResponse> {
    let action = message.action();
    let response = port
        .request(MessageSender::external(), message)
        .await
        .with_context(|| format!("Failed to send {}", action))?;
    match response {
        Some(RuntimeResponse::Auth(response)) => Ok(response),
        other => anyhow::bail!("Unexpected reply to {}: {:?}", action, other),
    }
}

/// Current session, falling back to unauthenticated when it can't be read.
async fn auth_state(port: &RuntimePort) -> Session {
    match auth_request(port, RuntimeMessage::GetAuthState).await {
        Ok(AuthResponse {
            auth_state: Some(session),
            ..
        }) => session,
        Ok(AuthResponse { error, .. }) => {
            warn!(error = ?error, "Failed to get auth state");
            Session::unauthenticated()
        }
        Err(e) => {
            warn!(error = %e, "Failed to get auth state");
            Session::unauthenticated()
        }
    }
}
