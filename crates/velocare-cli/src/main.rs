//! VeloCare console - command-line front end for the service shop API.
//!
//! Logs in and out, and sends authenticated calls through the session
//! client, which refreshes expired access tokens on its own.

use std::io::{self, Write};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use velocare_core::api::endpoints;
use velocare_core::{ClientError, Config, Role, SessionClient};

#[derive(Parser)]
#[command(name = "velocare", version, about = "VeloCare service shop console")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in and store the session
    Login {
        /// Sign in as shop owner (admin)
        #[arg(long)]
        owner: bool,
        #[arg(long)]
        email: Option<String>,
    },
    /// Create an account (does not sign in)
    Register {
        #[arg(long)]
        owner: bool,
        #[arg(long)]
        email: Option<String>,
        /// Full name
        #[arg(long)]
        name: Option<String>,
    },
    /// Forget the stored session
    Logout,
    /// Show whether a session is stored
    Status,
    /// Show daily, monthly and yearly revenue
    Dashboard,
    /// Send an authenticated call, e.g. `request GET vehicles/`
    Request {
        method: String,
        path: String,
        /// JSON body
        #[arg(long, short)]
        data: Option<String>,
        /// Extra header as `Name: value`, may be repeated
        #[arg(long = "header", short = 'H')]
        headers: Vec<String>,
    },
}

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();
    let cli = Cli::parse();

    let mut config = Config::load()?;
    let store = config.session_store()?;
    let client = SessionClient::from_config(&config, store)?;
    debug!(api = client.api_base_url(), auth = client.auth_base_url(), "Client ready");

    if let Err(e) = run(cli.command, &client, &mut config).await {
        match e.downcast_ref::<ClientError>() {
            Some(err) if err.requires_login() => {
                eprintln!("Session expired. Run `velocare login` to sign in again.");
            }
            _ => eprintln!("Error: {:#}", e),
        }
        std::process::exit(1);
    }
    Ok(())
}

async fn run(command: Command, client: &SessionClient, config: &mut Config) -> Result<()> {
    match command {
        Command::Login { owner, email } => {
            let role = role_for(owner);
            let email = match email {
                Some(email) => email,
                None => prompt("Email", config.last_email.as_deref())?,
            };
            let password = rpassword::prompt_password("Password: ")?;

            client.login(&email, &password, role).await?;

            config.last_email = Some(email);
            if let Err(e) = config.save() {
                tracing::warn!(error = %e, "Failed to save config");
            }
            println!("Signed in as {}", role.display_name());
        }
        Command::Register { owner, email, name } => {
            let role = role_for(owner);
            let name = match name {
                Some(name) => name,
                None => prompt("Full name", None)?,
            };
            let email = match email {
                Some(email) => email,
                None => prompt("Email", None)?,
            };
            let password = rpassword::prompt_password("Password: ")?;
            let confirm = rpassword::prompt_password("Confirm password: ")?;

            client
                .register(&email, &password, &confirm, &name, role)
                .await?;
            println!(
                "Account created. Run `velocare login{}` to sign in.",
                if owner { " --owner" } else { "" }
            );
        }
        Command::Logout => {
            client.logout()?;
            println!("Signed out");
        }
        Command::Status => {
            if client.is_authenticated() {
                println!("Signed in ({})", client.api_base_url());
            } else {
                println!("Not signed in");
            }
        }
        Command::Dashboard => {
            let revenue: Value = client.get_json(endpoints::REVENUE_DASHBOARD).await?;
            print_revenue(&revenue);
        }
        Command::Request {
            method,
            path,
            data,
            headers,
        } => {
            let method = Method::from_bytes(method.to_uppercase().as_bytes())
                .with_context(|| format!("Invalid HTTP method: {}", method))?;
            let body = data
                .map(|d| serde_json::from_str::<Value>(&d))
                .transpose()
                .context("--data is not valid JSON")?;
            let headers = parse_headers(&headers)?;

            info!(%method, path = %path, "Sending request");
            let response = client.request(method, &path, body, Some(headers)).await?;
            let status = response.status();
            let text = response.text().await?;

            println!("{}", status);
            match serde_json::from_str::<Value>(&text) {
                Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
                Err(_) if !text.is_empty() => println!("{}", text),
                Err(_) => {}
            }
        }
    }
    Ok(())
}

fn role_for(owner: bool) -> Role {
    if owner {
        Role::Owner
    } else {
        Role::User
    }
}

fn prompt(label: &str, default: Option<&str>) -> Result<String> {
    match default {
        Some(default) => print!("{} [{}]: ", label, default),
        None => print!("{}: ", label),
    }
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let input = input.trim();

    match (input.is_empty(), default) {
        (true, Some(default)) => Ok(default.to_string()),
        _ => Ok(input.to_string()),
    }
}

/// Parse `Name: value` pairs
fn parse_headers(raw: &[String]) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    for entry in raw {
        let (name, value) = entry
            .split_once(':')
            .with_context(|| format!("Header must be `Name: value`: {}", entry))?;
        let name = HeaderName::from_bytes(name.trim().as_bytes())
            .with_context(|| format!("Invalid header name: {}", name))?;
        let value = HeaderValue::from_str(value.trim())
            .with_context(|| format!("Invalid header value for {}", name))?;
        headers.append(name, value);
    }
    Ok(headers)
}

fn print_revenue(revenue: &Value) {
    // Non-owners get a 200 with only a detail message
    if let Some(detail) = revenue.get("detail").and_then(Value::as_str) {
        println!("{}", detail);
        return;
    }

    println!("Revenue Dashboard");
    for (label, key) in [
        ("Daily", "daily_revenue"),
        ("Monthly", "monthly_revenue"),
        ("Yearly", "yearly_revenue"),
    ] {
        println!("  {:<8} ${}", label, format_amount(revenue.get(key)));
    }
}

/// Amounts come back as numbers or decimal strings
fn format_amount(value: Option<&Value>) -> String {
    match value {
        Some(Value::Number(n)) => n
            .as_f64()
            .map(|f| format!("{:.2}", f))
            .unwrap_or_else(|| n.to_string()),
        Some(Value::String(s)) => s
            .parse::<f64>()
            .map(|f| format!("{:.2}", f))
            .unwrap_or_else(|_| s.clone()),
        _ => "0.00".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_headers() {
        let headers = parse_headers(&["X-Trace: abc".to_string(), "Accept:application/json".to_string()]).unwrap();
        assert_eq!(headers.get("x-trace").unwrap(), "abc");
        assert_eq!(headers.get("accept").unwrap(), "application/json");

        assert!(parse_headers(&["no-colon".to_string()]).is_err());
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(Some(&serde_json::json!(12))), "12.00");
        assert_eq!(format_amount(Some(&serde_json::json!("99.5"))), "99.50");
        assert_eq!(format_amount(None), "0.00");
    }

    #[test]
    fn test_role_for() {
        assert_eq!(role_for(true), Role::Owner);
        assert_eq!(role_for(false), Role::User);
    }

    #[test]
    fn test_cli_parses_request_command() {
        let cli = Cli::try_parse_from([
            "velocare", "request", "post", "components/", "-d", r#"{"name":"Chain"}"#, "-H", "X-A: 1",
        ])
        .unwrap();
        match cli.command {
            Command::Request { method, path, data, headers } => {
                assert_eq!(method, "post");
                assert_eq!(path, "components/");
                assert!(data.is_some());
                assert_eq!(headers, vec!["X-A: 1".to_string()]);
            }
            _ => panic!("expected request command"),
        }
    }
}
