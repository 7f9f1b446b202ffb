//! Command-line front end for the Codeword network layer.
//!
//! ```text
//! codeword-net [--config FILE] fetch <target> [--json BODY]
//! codeword-net [--config FILE] health [--watch]
//! codeword-net [--config FILE] chat [--session ID]
//! ```
//!
//! Without `--config`, defaults plus `CODEWORD_API_BASE` / `CODEWORD_WS_URL`
//! are used.

use std::io::Write;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};

use codeword_net::config::{self, ClientConfig};
use codeword_net::health::{check_health, HealthMonitor};
use codeword_net::http::{HttpResponse, RequestOptions, ResilientClient};
use codeword_net::lifecycle::{shutdown_on_signal, Shutdown};
use codeword_net::observability::{logging, metrics};
use codeword_net::stream::{IncomingMessage, OutgoingMessage, StreamClient};

#[derive(Parser)]
#[command(name = "codeword-net")]
#[command(about = "Resilient HTTP and streaming client for the Codeword backend", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Issue one resilient request and print the response
    Fetch {
        /// Absolute URL or path relative to the API base
        target: String,
        /// POST this JSON body instead of GET
        #[arg(long)]
        json: Option<String>,
    },
    /// Probe the backend health endpoint
    Health {
        /// Keep probing until interrupted
        #[arg(long)]
        watch: bool,
    },
    /// Open the message stream and chat from stdin
    Chat {
        /// Session id attached to every outgoing message
        #[arg(long)]
        session: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => config::loader::from_env()?,
    };

    logging::init_logging(&config.observability)?;
    if config.observability.metrics_enabled {
        if let Some(addr) = &config.observability.metrics_address {
            metrics::init_metrics(addr.parse()?)?;
        }
    }

    tracing::info!(
        base_url = %config.http.base_url,
        stream_url = %config.stream.url,
        max_retries = config.http.max_retries,
        "Configuration loaded"
    );

    let shutdown = Shutdown::new();
    tokio::spawn(shutdown_on_signal(shutdown.clone()));

    match cli.command {
        Commands::Fetch { target, json } => fetch(&config, &target, json).await?,
        Commands::Health { watch } => health(&config, watch, &shutdown).await?,
        Commands::Chat { session } => chat(&config, session, &shutdown).await?,
    }

    Ok(())
}

async fn fetch(config: &ClientConfig, target: &str, json: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let client = ResilientClient::from_config(config)?;
    let options = match json {
        Some(body) => {
            let value: Value = serde_json::from_str(&body)?;
            RequestOptions::post_json(&value)?
        }
        None => RequestOptions::get(),
    };

    let response = match client.execute(target, options).await {
        Ok(response) => response,
        Err(e) => {
            if let Some(wait) = e.retry_in() {
                eprintln!("Retry in {}ms", wait.as_millis());
            }
            return Err(e.into());
        }
    };
    print_response(&response)?;
    Ok(())
}

fn print_response(response: &HttpResponse) -> Result<(), Box<dyn std::error::Error>> {
    if !response.is_success() {
        eprintln!("Error: backend returned status {}", response.status);
        eprintln!("Response: {}", response.text());
        return Ok(());
    }

    match response.json::<Value>() {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", response.text()),
    }
    Ok(())
}

async fn health(config: &ClientConfig, watch: bool, shutdown: &Shutdown) -> Result<(), Box<dyn std::error::Error>> {
    let client = ResilientClient::from_config(config)?;

    if !watch {
        let healthy = check_health(&client).await;
        println!("{}", if healthy { "healthy" } else { "unhealthy" });
        if !healthy {
            std::process::exit(1);
        }
        return Ok(());
    }

    let monitor = HealthMonitor::new(client, config.health_check.clone());
    let mut state = monitor.subscribe();
    let task = tokio::spawn(monitor.run(shutdown.subscribe()));

    while state.changed().await.is_ok() {
        println!("{}", *state.borrow_and_update());
    }
    task.await?;
    Ok(())
}

async fn chat(config: &ClientConfig, session: Option<String>, shutdown: &Shutdown) -> Result<(), Box<dyn std::error::Error>> {
    let stream = StreamClient::new(&config.stream)?;

    stream.set_status_listener(|status| eprintln!("[{}]", status))?;
    stream.set_message_listener(|message| match message {
        IncomingMessage::Token { content } => {
            print!("{}", content);
            let _ = std::io::stdout().flush();
        }
        IncomingMessage::Message { content } => println!("{}", content),
        IncomingMessage::Final { content } => println!("{}", content.unwrap_or_default()),
        IncomingMessage::Error { error } => eprintln!("error: {}", error),
    })?;
    stream.connect()?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut shutdown = shutdown.subscribe();
    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) if line.trim().is_empty() => {}
                Some(line) => {
                    let mut message = OutgoingMessage::chat(line);
                    if let Some(session) = &session {
                        message = message.with_session(session.clone());
                    }
                    stream.send(message)?;
                }
                None => break,
            },
            _ = shutdown.recv() => break,
        }
    }

    stream.shutdown().await;
    tracing::info!("Chat closed");
    Ok(())
}
