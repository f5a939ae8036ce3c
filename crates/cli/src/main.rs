mod config;
mod error;

use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde_json::{Value, json};
use toolcall::{Dispatcher, LocalHost, OllamaClient, Provider, SystemPrompt, catalog, scan};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use config::Config;
use error::{Error, Result};

const CONFIG_FILE: &str = "bridget.toml";

#[derive(Parser)]
#[command(name = "bridget")]
#[command(about = "Parse and execute model tool calls against the local machine", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (default: ./bridget.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the tools a model may call
    Tools {
        /// Print JSON schemas instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Extract tool calls from model output
    Parse {
        /// File with model output (default: stdin)
        file: Option<PathBuf>,
    },
    /// Extract tool calls from model output and execute them
    Run {
        /// File with model output (default: stdin)
        file: Option<PathBuf>,
    },
    /// List models installed on the local Ollama server
    Models,
    /// Show provider endpoints and key status
    Providers,
    /// Render the system prompt
    Prompt {
        /// Model name shown to the model
        #[arg(short, long)]
        model: String,
        /// Description of the open project
        #[arg(long)]
        codebase: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Tools { json } => cmd_tools(json),
        Commands::Parse { file } => cmd_parse(file.as_deref()),
        Commands::Run { file } => {
            let config = load_config(cli.config.as_deref())?;
            cmd_run(&config, file.as_deref()).await
        }
        Commands::Models => {
            let config = load_config(cli.config.as_deref())?;
            cmd_models(&config).await
        }
        Commands::Providers => {
            let config = load_config(cli.config.as_deref())?;
            cmd_providers(&config)
        }
        Commands::Prompt { model, codebase } => cmd_prompt(&model, codebase),
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) if !path.exists() => Err(Error::ConfigNotFound {
            path: path.to_path_buf(),
        }),
        Some(path) => {
            info!(path = %path.display(), "loading config");
            Ok(Config::load(path)?)
        }
        None if Path::new(CONFIG_FILE).exists() => {
            info!(path = CONFIG_FILE, "loading config");
            Ok(Config::load(CONFIG_FILE)?)
        }
        None => {
            info!("no config file, using restrictive defaults");
            Ok(Config::default_config())
        }
    }
}

fn read_input(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) => Ok(std::fs::read_to_string(path)?),
        None => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text)?;
            Ok(text)
        }
    }
}

fn cmd_tools(as_json: bool) -> Result<()> {
    if as_json {
        let schemas: Vec<Value> = catalog::tools()
            .iter()
            .map(|tool| {
                json!({
                    "name": tool.name(),
                    "description": tool.description,
                    "parameters": tool.schema(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&schemas)?);
        return Ok(());
    }

    println!("{:<16}  {:<44}  DESCRIPTION", "TOOL", "PARAMETERS");
    println!("{}", "-".repeat(100));
    for tool in catalog::tools() {
        let params: Vec<String> = tool
            .parameters
            .iter()
            .map(|p| {
                if p.required {
                    p.name.to_string()
                } else {
                    format!("[{}]", p.name)
                }
            })
            .collect();
        println!(
            "{:<16}  {:<44}  {}",
            tool.name(),
            params.join(" "),
            tool.description
        );
    }
    Ok(())
}

fn cmd_parse(file: Option<&Path>) -> Result<()> {
    let text = read_input(file)?;
    let outcome = scan(&text);

    let malformed: Vec<Value> = outcome
        .malformed
        .iter()
        .map(|m| {
            json!({
                "offset": m.offset,
                "name": m.tool_name,
                "reason": m.reason.to_string(),
            })
        })
        .collect();
    let report = json!({ "calls": outcome.calls, "malformed": malformed });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn cmd_run(config: &Config, file: Option<&Path>) -> Result<()> {
    let text = read_input(file)?;

    let mut builder = LocalHost::builder(&config.tools.root).policy(config.policy.clone());
    if let Some(timeout) = config.tools.command_timeout() {
        builder = builder.command_timeout(timeout);
    }
    let host = builder.build()?;
    debug!(host = %host, "executing tool calls");

    let dispatcher = Dispatcher::new(host).with_mode(config.tools.argument_mode());
    let dispatched = dispatcher.execute_all(&text).await;
    if dispatched.is_empty() {
        eprintln!("No tool calls found.");
        return Ok(());
    }

    for call in dispatched {
        let line = json!({ "name": call.request.tool_name, "result": call.result });
        println!("{}", serde_json::to_string(&line)?);
    }
    Ok(())
}

async fn cmd_models(config: &Config) -> Result<()> {
    let providers = config.providers();
    let client = OllamaClient::from_config(providers.get(Provider::Ollama));
    let models = client.list_models().await;

    if models.is_empty() {
        println!("No models found at {}", client.api_base());
        return Ok(());
    }
    for model in models {
        println!("{model}");
    }
    Ok(())
}

fn cmd_providers(config: &Config) -> Result<()> {
    let providers = config.providers();

    println!("{:<12}  {:<36}  KEY", "PROVIDER", "API BASE");
    println!("{}", "-".repeat(60));
    for provider in providers.iter() {
        let key = match provider.provider().key_id() {
            None => "n/a",
            Some(_) if provider.has_key() => "set",
            Some(_) => "missing",
        };
        println!(
            "{:<12}  {:<36}  {key}",
            provider.provider().to_string(),
            provider.api_base()
        );
    }
    Ok(())
}

fn cmd_prompt(model: &str, codebase: Option<String>) -> Result<()> {
    let mut prompt = SystemPrompt::new(model);
    if let Some(codebase) = codebase {
        prompt = prompt.codebase(codebase);
    }
    println!("{}", prompt.render());
    Ok(())
}
