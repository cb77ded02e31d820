use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dynafield::{Dynamo, DynamoConfig, InMemoryStorage};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "dynafield-tool")]
#[command(about = "Manage dynamic field definitions stored in a snapshot file")]
struct Cli {
    /// Snapshot file holding field definitions and values
    #[arg(long, default_value = "dynafield.snapshot")]
    store: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    AddField {
        #[arg(long)]
        model: String,
        #[arg(long)]
        name: String,
        /// Text, Number or Decimal
        #[arg(long, default_value = "Text")]
        r#type: String,
    },
    RemoveField {
        #[arg(long)]
        model: String,
        #[arg(long)]
        name: String,
    },
    ListFields {
        #[arg(long)]
        model: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let storage = Arc::new(
        InMemoryStorage::load_snapshot(&cli.store)
            .with_context(|| format!("Failed to load store '{}'", cli.store.display()))?,
    );
    let dynamo = Dynamo::new(storage.clone(), DynamoConfig::new().store_name(&cli.store.display().to_string()));

    match cli.command {
        Command::AddField { model, name, r#type } => {
            let definition = dynamo.add_field_by_tag(&model, &name, &r#type)?;
            println!(
                "Added {}.{} ({}, column {})",
                model,
                name,
                definition.value_type,
                definition.column().column_name()
            );
        }
        Command::RemoveField { model, name } => {
            if dynamo.remove_field(&model, &name)? {
                println!("Removed {}.{}", model, name);
            } else {
                println!("No field {}.{}", model, name);
            }
        }
        Command::ListFields { model } => {
            let fields = dynamo.fields_for(&model)?;
            if fields.is_empty() {
                println!("No dynamic fields for {}", model);
            }
            for definition in fields.iter() {
                println!("{}\t{}", definition.field_name, definition.value_type);
            }
            return Ok(());
        }
    }

    storage
        .save_snapshot(&cli.store)
        .with_context(|| format!("Failed to write store '{}'", cli.store.display()))?;
    Ok(())
}
