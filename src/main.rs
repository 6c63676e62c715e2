//! ShivAI - Offline voice and text command agent
//!
//! Main entry point for the ShivAI CLI.

mod cli;
mod cmd_plugins;
mod repl;

use std::io::IsTerminal;
use std::path::PathBuf;

use clap::Parser;
use tracing::{info, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use shivai_config::{Config, ConfigLoader};
use shivai_parser::IntentParser;
use shivai_runtime::Agent;

use crate::cli::{Cli, Commands};
use crate::cmd_plugins::plugins_list;
use crate::repl::{StdinSource, StdoutSink};

fn log_dir(config: &Config) -> PathBuf {
    match &config.logging.dir {
        Some(dir) => ConfigLoader::expand_pathbuf(dir),
        None => ConfigLoader::expand_pathbuf(&config.agent.data_dir).join("logs"),
    }
}

fn init_tracing(config: &Config, debug: bool) -> Result<(), Box<dyn std::error::Error>> {
    let logging = &config.logging;

    let file_writer = if logging.file {
        let log_dir = log_dir(config);
        std::fs::create_dir_all(&log_dir)?;

        let file_appender = RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix("shivai")
            .filename_suffix("log")
            .max_log_files(logging.max_files)
            .build(&log_dir)?;

        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        // Flushes buffered lines on exit.
        static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
            std::sync::OnceLock::new();
        let _ = GUARD.set(guard);
        Some(non_blocking)
    } else {
        None
    };

    let env_filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level))
    };

    let (text_file, json_file) = match file_writer {
        Some(writer) if logging.json => (None, Some(fmt::layer().json().with_writer(writer))),
        Some(writer) => (Some(fmt::layer().with_writer(writer).with_ansi(false)), None),
        None => (None, None),
    };

    // Console goes to stderr so replies on stdout stay clean.
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_ansi(std::io::stderr().is_terminal())
                .with_writer(std::io::stderr),
        )
        .with(text_file)
        .with(json_file)
        .init();

    Ok(())
}

fn load_config(cli: &Cli) -> Result<Config, Box<dyn std::error::Error>> {
    let config = match &cli.config {
        Some(path) => ConfigLoader::load(path)?,
        None => ConfigLoader::load_or_default(&ConfigLoader::default_config_path())?,
    };
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_tracing(&config, cli.debug)?;

    match cli.command {
        None | Some(Commands::Run) => run_session(config).await,
        Some(Commands::Exec { text, format }) => exec(config, &text.join(" "), &format).await,
        Some(Commands::Parse { text, candidates }) => {
            parse(&config, &text.join(" "), candidates)
        }
        Some(Commands::Plugins { format }) => plugins_list(config, &format).await,
    }
}

/// Interactive session on stdin/stdout until exit, EOF or Ctrl-C.
async fn run_session(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    info!("Starting ShivAI v{}", env!("CARGO_PKG_VERSION"));
    let agent = Agent::builder(config).build().await?;

    let interactive = std::io::stdin().is_terminal();
    if interactive {
        println!(
            "{} is listening. Say 'help' for commands, 'exit' to quit.",
            agent.config().agent.name
        );
    }

    let mut source = StdinSource::new(interactive);
    let mut sink = StdoutSink::new();

    tokio::select! {
        result = agent.run_session(&mut source, &mut sink) => {
            let handled = result?;
            info!("Session handled {} utterances", handled);
        }
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, shutting down");
        }
    }

    agent.shutdown().await?;
    Ok(())
}

/// Handle one utterance and print its reply.
async fn exec(config: Config, text: &str, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let agent = Agent::builder(config).build().await?;
    let reply = agent.handle_utterance(text).await?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&reply)?),
        _ => println!("{}", reply.text()),
    }

    agent.shutdown().await?;
    if reply.outcome.is_success() {
        Ok(())
    } else {
        Err(format!("command did not succeed: {}", reply.text()).into())
    }
}

/// Print the classification of an utterance.
fn parse(config: &Config, text: &str, candidates: bool) -> Result<(), Box<dyn std::error::Error>> {
    let parser = IntentParser::from_config(&config.parser);

    match parser.classify(text, None) {
        Ok(intent) => println!("{}", serde_json::to_string_pretty(&intent)?),
        Err(e) => {
            println!("{}", serde_json::to_string_pretty(&parser.parse(text, None))?);
            println!("({})", e);
        }
    }

    if candidates {
        let matches = parser.candidates(text);
        if matches.is_empty() {
            println!("No patterns matched.");
            return Ok(());
        }
        println!();
        println!(
            "{:<20} {:<12} {:<8} {}",
            "CATEGORY", "SPECIFICITY", "SLOTS", "CONFIDENCE"
        );
        println!("{}", "-".repeat(56));
        for candidate in matches {
            println!(
                "{:<20} {:<12} {:<8} {:.2}",
                candidate.category.as_str(),
                candidate.specificity,
                candidate.slots_filled,
                candidate.confidence
            );
        }
    }

    Ok(())
}
