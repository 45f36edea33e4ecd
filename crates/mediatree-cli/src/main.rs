//! mediatree CLI: inspect variant trees and run media through a context.
//!
//! The configuration file comes from --config or MEDIATREE_CONFIG.

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use mediatree_cli::{context, describe_tree, load_config, parse_content, Runtime};
use mediatree_core::{telemetry::init_tracing, Media};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mediatree", about = "Media variant processing")]
struct Cli {
    /// Path to the JSON configuration
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the variant tree of a context in processing order
    Tree {
        /// Context name
        #[arg(long)]
        context: String,
        /// Print JSON instead of an indented list
        #[arg(long)]
        json: bool,
    },
    /// Build every context's variant tree and report configuration errors
    Check,
    /// Process content through a context and print the resulting media
    Process {
        /// Context name
        #[arg(long)]
        context: String,
        /// Content kind: file, int or string
        #[arg(long, default_value = "file")]
        kind: String,
        /// Media name (defaults to one derived from the content)
        #[arg(long)]
        name: Option<String>,
        /// File path or external id
        content: String,
    },
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize output")?;
    println!("{}", out);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Tree { context: name, json } => {
            let context = context(&config, &name)?;
            let lines = describe_tree(&context)?;
            if json {
                print_json(&lines)?;
            } else {
                for line in &lines {
                    println!("{}", line.render());
                }
            }
        }
        Commands::Check => {
            let mut failures = 0usize;
            for declaration in &config.contexts {
                let result = context(&config, &declaration.name)
                    .and_then(|context| Ok(context.build_variant_tree()?));
                match result {
                    Ok(tree) => println!("{}: ok ({} variants)", declaration.name, tree.len()),
                    Err(e) => {
                        failures += 1;
                        println!("{}: {}", declaration.name, e);
                    }
                }
            }
            if failures > 0 {
                anyhow::bail!("{} context(s) failed to build", failures);
            }
        }
        Commands::Process {
            context: name,
            kind,
            name: media_name,
            content,
        } => {
            let context = context(&config, &name)?;
            let runtime = Runtime::from_config(&config).await;
            let provider = runtime.providers.create_for(&context).await?;

            let mut media = Media::new(context.name(), parse_content(&kind, &content)?);
            if let Some(media_name) = media_name {
                media = media.with_name(media_name);
            }

            let report = runtime
                .pipeline
                .save(&mut media, &context, provider.as_ref())
                .await?;
            tracing::info!(
                context = %context.name(),
                ready = report.ready().count(),
                "Processing finished"
            );
            media.content = None;
            print_json(&media)?;
        }
    }

    Ok(())
}
