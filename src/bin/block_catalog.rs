//! Block catalog generator.
//!
//! Writes the live block registry as a JSON catalog, or checks a committed
//! catalog for drift against the registry (exit code 1 on drift).
//!
//! ```bash
//! cargo run --bin block_catalog --features catalog-cli -- generate --output block-catalog.json
//! cargo run --bin block_catalog --features catalog-cli -- check --path block-catalog.json
//! ```

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use page_experiment_kernel::registry::{check_drift, generate_catalog, BlockCatalog};

const DEFAULT_CATALOG_PATH: &str = "block-catalog.json";

#[derive(Parser)]
#[command(name = "block_catalog", version, about = "Generate or verify the block catalog")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write the catalog for the live registry
    Generate {
        /// Output file ("-" for stdout)
        #[arg(short, long, env = "BLOCK_CATALOG_PATH", default_value = DEFAULT_CATALOG_PATH)]
        output: String,
    },

    /// Compare a stored catalog with the live registry
    Check {
        /// Stored catalog file
        #[arg(short, long, env = "BLOCK_CATALOG_PATH", default_value = DEFAULT_CATALOG_PATH)]
        path: PathBuf,
    },
}

fn generate(output: &str) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = generate_catalog();
    let json = serde_json::to_string_pretty(&catalog)?;
    if output == "-" {
        println!("{}", json);
    } else {
        std::fs::write(output, format!("{}\n", json))?;
        eprintln!("Wrote {} block definitions to {}", catalog.blocks.len(), output);
    }
    Ok(())
}

fn check(path: &PathBuf) -> Result<bool, Box<dyn std::error::Error>> {
    let raw = std::fs::read_to_string(path)?;
    let stored: BlockCatalog = serde_json::from_str(&raw)?;
    match check_drift(&stored) {
        Ok(()) => {
            eprintln!("{} is up to date", path.display());
            Ok(true)
        }
        Err(drift) => {
            eprintln!("{}: {}", path.display(), drift);
            Ok(false)
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let result = match &cli.command {
        Command::Generate { output } => generate(output).map(|()| true),
        Command::Check { path } => check(path),
    };

    match result {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(2);
        }
    }
}
