//! Atelier CLI - Database migrations and secret generation.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations
//! atelier-cli migrate
//!
//! # Print a fresh STOREFRONT_CSRF_SECRET value
//! atelier-cli csrf-secret
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "atelier-cli")]
#[command(author, version, about = "Atelier CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run storefront database migrations
    Migrate,
    /// Print a random secret suitable for `STOREFRONT_CSRF_SECRET`
    CsrfSecret {
        /// Secret length in bytes
        #[arg(short, long, default_value_t = commands::secret::DEFAULT_SECRET_BYTES)]
        bytes: usize,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::storefront().await?,
        Commands::CsrfSecret { bytes } => {
            let secret = commands::secret::generate(bytes)?;
            #[allow(clippy::print_stdout)]
            {
                println!("{secret}");
            }
        }
    }
    Ok(())
}
