#![allow(non_snake_case)]

use std::env;
use std::sync::Arc;

use chrono::{Local, NaiveDateTime};
use clap::{Parser, Subcommand, ValueEnum};
use inquire::Text;
use tracing_subscriber::EnvFilter;

use agendaBot::config::AppConfig;
use agendaBot::schema::{builtin_registry, Domain};
use agendaBot::service::dispatch::{Dispatcher, InMemoryBackend};
use agendaBot::service::openai_service::OpenAIService;
use agendaBot::service::routing::IntentRouter;
use agendaBot::service::temporal::CANONICAL_FORMAT;

#[derive(Parser)]
#[command(name = "agendaBot")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DomainArg {
    Calendar,
    Tasks,
}

impl From<DomainArg> for Domain {
    fn from(value: DomainArg) -> Self {
        match value {
            DomainArg::Calendar => Domain::Calendar,
            DomainArg::Tasks => Domain::Tasks,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Route a single utterance and dispatch it to the demo backend.
    Route {
        utterance: String,
        #[arg(long, value_enum, default_value = "tasks")]
        domain: DomainArg,
        /// Reference "now" as YYYY-MM-DD HH:mm:ss; defaults to local time.
        #[arg(long)]
        reference: Option<String>,
    },
    /// Ask for the utterance interactively.
    Prompt {
        #[arg(long, value_enum, default_value = "tasks")]
        domain: DomainArg,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = match env::var("CONFIG_FILE") {
        Ok(path) => AppConfig::from_file(&path).unwrap_or_default(),
        Err(_) => AppConfig::default(),
    };
    let get_prop = |key: &str| -> Option<String> { config.get(key).or_else(|| env::var(key).ok()) };

    let api_key = get_prop("OPENAI_API_KEY").expect("OPENAI_API_KEY environment variable not set");

    let cli = Cli::parse();
    let (utterance, domain, reference) = match cli.command {
        Commands::Route {
            utterance,
            domain,
            reference,
        } => {
            let reference = match reference {
                Some(raw) => NaiveDateTime::parse_from_str(&raw, CANONICAL_FORMAT)
                    .expect("reference must be formatted as YYYY-MM-DD HH:mm:ss"),
                None => Local::now().naive_local(),
            };
            (utterance, Domain::from(domain), reference)
        }
        Commands::Prompt { domain } => {
            let utterance = Text::new("What should I do?")
                .prompt()
                .expect("no utterance supplied");
            (utterance, Domain::from(domain), Local::now().naive_local())
        }
    };

    let registry = Arc::new(builtin_registry());
    let model = Arc::new(OpenAIService::new(api_key));
    let router = IntentRouter::new(registry, model);

    let decision = router.route(&utterance, reference, domain, &[]).await;
    match serde_json::to_string_pretty(&decision) {
        Ok(rendered) => println!("{rendered}"),
        Err(e) => println!("Failed to render decision: {e}"),
    }

    if decision.is_dispatchable() {
        let dispatcher = Dispatcher::new(Arc::new(InMemoryBackend::new()));
        match dispatcher.dispatch(&decision).await {
            Ok(result) => match serde_json::to_string_pretty(&result) {
                Ok(rendered) => println!("{rendered}"),
                Err(e) => println!("Failed to render backend result: {e}"),
            },
            Err(e) => println!("Dispatch failed: {e}"),
        }
    }
}
