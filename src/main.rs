use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use redb_policy_adapter::{section_of, Adapter, AdapterConfig, RedbAdapter};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "policy-adapter", about = "Inspect and edit a redb policy store")]
#[command(version)]
struct Cli {
    /// Adapter configuration file
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Command {
    /// Print every loaded rule
    List,
    /// Store a rule
    Add {
        ptype: String,
        #[arg(allow_hyphen_values = true)]
        fields: Vec<String>,
    },
    /// Remove rules equal to the given one
    Remove {
        ptype: String,
        #[arg(allow_hyphen_values = true)]
        fields: Vec<String>,
    },
    /// Remove rules whose leading fields match
    RemoveFiltered {
        ptype: String,
        field_index: usize,
        #[arg(allow_hyphen_values = true)]
        values: Vec<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();

    let config = AdapterConfig::from_file(&cli.config).with_context(|| {
        format!("failed to load configuration from {}", cli.config.display())
    })?;
    info!("Rule store: {} (table '{}')", config.path.display(), config.table);
    info!("Batch mode: {}", config.batch_mode);

    let adapter = RedbAdapter::from_config(&config)?;

    match cli.command {
        Command::List => {
            let mut model = config.empty_model()?;
            adapter.load_policy(&mut model)?;
            for (sec, ptype) in model.policy_types() {
                for rule in model.get_policy(sec, ptype) {
                    println!("{}, {}", ptype, rule.join(", "));
                }
            }
        }
        Command::Add { ptype, fields } => {
            adapter.add_policy(section(&ptype)?, &ptype, &fields)?;
            info!("Added {}, {}", ptype, fields.join(", "));
        }
        Command::Remove { ptype, fields } => {
            adapter.remove_policy(section(&ptype)?, &ptype, &fields)?;
            info!("Removed {}, {}", ptype, fields.join(", "));
        }
        Command::RemoveFiltered {
            ptype,
            field_index,
            values,
        } => {
            adapter.remove_filtered_policy(section(&ptype)?, &ptype, field_index, &values)?;
        }
    }

    Ok(())
}

fn section(ptype: &str) -> Result<&str> {
    section_of(ptype).context("policy type must not be empty")
}
