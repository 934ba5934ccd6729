use std::io::Read;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use voice_gate::classifier::{CommandClassifier, JsonlAuditLog};
use voice_gate::config::{ClassifierConfig, HookConfig};
use voice_gate::hook::{self, HookKind};
use voice_gate::speech::{CommandSynthesizer, SpeechSynthesizer, validate_rate};
use voice_gate::{ApiServerBuilder, Config};

/// Voice Gate - Spoken conversation and action gating for AI assistants
#[derive(Parser)]
#[command(name = "voice-gate", version, about)]
struct Cli {
    /// Port to listen on
    #[arg(long, env = "VOICE_GATE_PORT")]
    port: Option<u16>,

    /// Address to bind
    #[arg(long, env = "VOICE_GATE_HOST")]
    host: Option<String>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Classify a tool invocation read from stdin
    Classify,
    /// Check the action gate from an assistant hook
    Hook {
        #[arg(value_enum)]
        kind: HookKind,
    },
    /// Speak text through the configured speech command
    Say {
        /// Text to speak
        text: String,
        /// Words per minute
        #[arg(short, long)]
        rate: Option<i64>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity; stdout carries hook output
    let filter = match cli.verbose {
        0 => "info,voice_gate=info",
        1 => "info,voice_gate=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Some(Command::Classify) => {
            cmd_classify();
            return ExitCode::SUCCESS;
        }
        Some(Command::Hook { kind }) => {
            cmd_hook(kind).await;
            return ExitCode::SUCCESS;
        }
        _ => {}
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load()?;
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    tracing::debug!(?config, "loaded configuration");

    match cli.command {
        Some(Command::Say { text, rate }) => cmd_say(&config, &text, rate).await,
        _ => serve(&config).await,
    }
}

async fn serve(config: &Config) -> anyhow::Result<()> {
    tracing::info!(
        host = %config.server.host,
        port = config.server.port,
        speech = %config.speech.command,
        "starting voice gate"
    );

    let server = ApiServerBuilder::from_config(config).build();
    if !server.state().speech.is_available() {
        tracing::warn!(command = %config.speech.command, "speech command not found on PATH");
    }

    let handle = server.spawn();

    tokio::select! {
        result = handle => {
            result??;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("received shutdown signal");
        }
    }

    Ok(())
}

async fn cmd_say(config: &Config, text: &str, rate: Option<i64>) -> anyhow::Result<()> {
    let rate = match rate {
        Some(rate) => validate_rate(rate)?,
        None => config.speech.rate,
    };

    let speech = CommandSynthesizer::new(&config.speech.command, &config.speech.rate_flag)
        .with_timeout(config.speech.timeout);
    speech.speak(text, rate).await?;
    Ok(())
}

fn read_stdin() -> String {
    let mut input = String::new();
    if let Err(e) = std::io::stdin().read_to_string(&mut input) {
        tracing::warn!(error = %e, "failed to read stdin");
    }
    input
}

fn cmd_classify() {
    let input = read_stdin();
    let config = ClassifierConfig::load();

    let audit = Arc::new(JsonlAuditLog::new(&config.audit_log));
    let classifier = CommandClassifier::new(config.allowlist(), audit);
    let classification = classifier.classify_raw(&input);

    println!("{}", classification.to_hook_output());
}

async fn cmd_hook(kind: HookKind) {
    let input = read_stdin();
    let config = HookConfig::load();

    if let Some(block) = hook::run(kind, &input, &config).await {
        match serde_json::to_string(&block) {
            Ok(line) => println!("{line}"),
            Err(e) => tracing::error!(error = %e, "failed to encode block output"),
        }
    }
}
