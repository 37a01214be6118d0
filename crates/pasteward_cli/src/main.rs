//! Command-line client for a pasteward server.

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use pasteward_core::DEFAULT_CLI_SERVER_URL;
use serde_json::{json, Value};
use std::io::{self, Read};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "pwpaste", about = "pasteward CLI", version)]
struct Cli {
    /// Server URL (can also be set via PW_SERVER env var)
    #[arg(short, long, env = "PW_SERVER")]
    server: Option<String>,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    json: bool,

    /// Request timeout in seconds
    #[arg(short = 't', long, default_value = "30")]
    timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
    /// Submit a paste from a file or stdin
    Submit {
        #[arg(short, long)]
        file: Option<String>,
        #[arg(short, long, default_value = "anonymous")]
        name: String,
        #[arg(long, default_value = "text")]
        syntax: String,
        #[arg(short, long)]
        private: bool,
        /// Id of the paste this one forks
        #[arg(long)]
        fork: Option<String>,
        /// Lifetime in minutes (30 to 40320)
        #[arg(long)]
        ttl: Option<u32>,
    },
    /// Print a paste's code
    Get { id: String },
    /// Print a paste's code through the raw endpoint
    Raw { id: String },
    /// Run an administrative command (bl, del, wl, gl or their long names)
    Admin {
        command: String,
        target: Option<String>,
        #[arg(long, env = "PW_ADMIN_TOKEN", hide_env_values = true)]
        token: String,
    },
}

fn error_message_for_response(status: reqwest::StatusCode, body: &str) -> String {
    if body.trim().is_empty() {
        return status
            .canonical_reason()
            .unwrap_or("Request failed")
            .to_string();
    }

    if let Ok(value) = serde_json::from_str::<Value>(body) {
        return value
            .get("error")
            .or_else(|| value.get("message"))
            .and_then(Value::as_str)
            .unwrap_or(body)
            .to_string();
    }

    body.to_string()
}

/// Pass successful responses through; report anything else and exit 1.
async fn require_success(res: reqwest::Response, action: &str) -> reqwest::Response {
    let status = res.status();
    if status.is_success() {
        return res;
    }
    let body = res.text().await.unwrap_or_default();
    let reason = error_message_for_response(status, &body);
    exit_with(action, Err(format!("{} ({})", reason, status)))
}

/// Join escaped path segments onto the server base URL.
fn api_url(server: &str, segments: &[&str]) -> Result<reqwest::Url, String> {
    let mut url = reqwest::Url::parse(server)
        .map_err(|err| format!("Invalid server URL '{}': {}", server, err))?;
    url.path_segments_mut()
        .map_err(|_| format!("Server URL '{}' has no path to extend", server))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

fn api_url_or_exit(server: &str, action: &str, segments: &[&str]) -> reqwest::Url {
    exit_with(action, api_url(server, segments))
}

/// `--server`/`PW_SERVER` when set, the default otherwise, without trailing slashes.
fn resolve_server(server: Option<String>) -> String {
    let server = server
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_CLI_SERVER_URL.to_string());
    server.trim_end_matches('/').to_string()
}

fn submit_body(
    code: String,
    name: &str,
    syntax: &str,
    private: bool,
    fork: Option<&str>,
    ttl: Option<u32>,
) -> Value {
    let mut body = json!({
        "code": code,
        "name": name,
        "syntax": syntax,
        "private": if private { "1" } else { "0" },
    });
    if let Some(parent) = fork {
        body["forked_from"] = parent.into();
    }
    if let Some(minutes) = ttl {
        body["ttl"] = minutes.to_string().into();
    }
    body
}

fn format_created_output(created: &Value, json: bool) -> Result<String, String> {
    if json {
        return serde_json::to_string_pretty(created)
            .map_err(|err| format!("response encoding error: {}", err));
    }
    created
        .get("url")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| "response missing 'url' field".to_string())
}

fn format_get_output(paste: &Value, json: bool) -> Result<String, String> {
    if json {
        return serde_json::to_string_pretty(paste)
            .map_err(|err| format!("response encoding error: {}", err));
    }

    paste
        .get("code")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| "response missing 'code' field".to_string())
}

/// Admin answers are `{message, status}`; anything but success is a failure.
fn admin_outcome(response: &Value) -> Result<String, String> {
    let message = response
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("no message")
        .to_string();
    match response.get("status").and_then(Value::as_str) {
        Some("success") => Ok(message),
        _ => Err(message),
    }
}

fn exit_with<T>(action: &str, result: Result<T, String>) -> T {
    match result {
        Ok(output) => output,
        Err(message) => {
            eprintln!("{} failed: {}", action, message);
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let Cli {
        server,
        json,
        timeout,
        command,
    } = Cli::parse();

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout))
        .build()?;
    let server = resolve_server(server);

    match command {
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut io::stdout());
        }
        Commands::Submit {
            file,
            name,
            syntax,
            private,
            fork,
            ttl,
        } => {
            let endpoint = api_url_or_exit(&server, "Submit", &["api", "paste"]);
            let code = if let Some(path) = file {
                std::fs::read_to_string(path)?
            } else {
                let mut buffer = String::new();
                io::stdin().read_to_string(&mut buffer)?;
                buffer
            };
            let body = submit_body(code, &name, &syntax, private, fork.as_deref(), ttl);

            let res = client.post(endpoint).json(&body).send().await?;
            let res = require_success(res, "Submit").await;
            let created: Value = res.json().await?;
            println!("{}", exit_with("Submit", format_created_output(&created, json)));
        }
        Commands::Get { id } => {
            let endpoint = api_url_or_exit(&server, "Get", &["api", "paste", id.as_str()]);
            let res = client.get(endpoint).send().await?;
            let res = require_success(res, "Get").await;
            let paste: Value = res.json().await?;
            println!("{}", exit_with("Get", format_get_output(&paste, json)));
        }
        Commands::Raw { id } => {
            let endpoint = api_url_or_exit(&server, "Raw", &["r", id.as_str()]);
            let res = client.get(endpoint).send().await?;
            if res.url().path() == "/" {
                eprintln!("Raw failed: paste {} not found", id);
                std::process::exit(1);
            }
            let res = require_success(res, "Raw").await;
            print!("{}", res.text().await?);
        }
        Commands::Admin {
            command,
            target,
            token,
        } => {
            let endpoint = api_url_or_exit(&server, "Admin", &["admin"]);
            let body = json!({ "token": token, "command": command, "target": target });
            let res = client.post(endpoint).json(&body).send().await?;
            let response: Value = res.json().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            }
            let message = exit_with("Admin", admin_outcome(&response));
            if !json {
                println!("{}", message);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests;
