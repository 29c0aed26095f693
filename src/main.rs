use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use graphcypher::translator::{self, Operation, TranslateOptions};
use graphcypher::{CompiledSchema, config, server};

/// graphcypher - GraphQL-style API generation and Cypher translation
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the translate-only HTTP API
    Serve {
        /// HTTP server host address [default: 0.0.0.0]
        #[arg(long)]
        http_host: Option<String>,

        /// HTTP server port [default: 8080]
        #[arg(long)]
        http_port: Option<u16>,

        /// Type definitions file [default: schema.graphql]
        #[arg(long)]
        type_defs: Option<String>,

        /// Bound on selection and input nesting
        #[arg(long)]
        max_depth: Option<usize>,

        /// YAML configuration file; GRAPHCYPHER_* environment variables are read otherwise
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print the generated API catalogue as SDL
    PrintSchema {
        /// Type definitions file
        type_defs: PathBuf,
    },
    /// Translate one operation (JSON) and print the statements
    Translate {
        /// Type definitions file
        type_defs: PathBuf,

        /// Operation file; reads stdin when omitted
        operation: Option<PathBuf>,

        #[arg(long, default_value_t = translator::DEFAULT_MAX_DEPTH)]
        max_depth: usize,
    },
}

fn load_schema(path: &PathBuf) -> anyhow::Result<CompiledSchema> {
    let type_defs = std::fs::read_to_string(path)
        .with_context(|| format!("reading type definitions {}", path.display()))?;
    CompiledSchema::from_sdl(&type_defs)
        .with_context(|| format!("compiling type definitions {}", path.display()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logger - defaults to INFO level, can be overridden with RUST_LOG env var
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match Cli::parse().command {
        Command::Serve {
            http_host,
            http_port,
            type_defs,
            max_depth,
            config: config_file,
        } => {
            println!("\ngraphcypher v{}\n", env!("CARGO_PKG_VERSION"));
            dotenvy::dotenv().ok();
            let cli = config::CliConfig {
                http_host,
                http_port,
                type_defs,
                max_depth,
            };
            let config = config::ServerConfig::load(config_file.as_deref(), cli)?;
            server::run_with_config(config).await;
        }
        Command::PrintSchema { type_defs } => {
            let schema = load_schema(&type_defs)?;
            println!("{}", schema.print_sdl());
        }
        Command::Translate {
            type_defs,
            operation,
            max_depth,
        } => {
            let schema = load_schema(&type_defs)?;
            let text = match operation {
                Some(path) => std::fs::read_to_string(&path)
                    .with_context(|| format!("reading operation {}", path.display()))?,
                None => std::io::read_to_string(std::io::stdin()).context("reading operation from stdin")?,
            };
            let operation: Operation = serde_json::from_str(&text).context("parsing operation JSON")?;
            let translated =
                translator::translate_with_options(&schema, &operation, &TranslateOptions { max_depth })?;
            for statement in &translated.statements {
                println!("{}", statement.text);
                println!("{}", serde_json::to_string_pretty(&statement.params)?);
            }
        }
    }
    Ok(())
}
