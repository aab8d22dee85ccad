//! CLI entry point for spacetraveling-rs

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "spacetraveling")]
#[command(version)]
#[command(about = "A static blog generator for Prismic repositories", long_about = None)]
struct Cli {
    /// Set the base directory (defaults to current directory)
    #[arg(short, long, global = true)]
    cwd: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new site
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        folder: PathBuf,
    },

    /// Generate static files
    #[command(alias = "g")]
    Generate {
        /// Regenerate everything, ignoring the cache
        #[arg(short, long)]
        force: bool,

        /// Watch for local changes and poll Prismic for new releases
        #[arg(short, long)]
        watch: bool,

        /// Seconds between Prismic polls in watch mode
        #[arg(long, default_value = "60")]
        interval: u64,
    },

    /// Start a local server
    #[command(alias = "s")]
    Server {
        /// Port to listen on
        #[arg(short, long, default_value = "4000")]
        port: u16,

        /// IP address to bind to
        #[arg(short, long, default_value = "localhost")]
        ip: String,

        /// Open browser automatically
        #[arg(short, long)]
        open: bool,

        /// Enable static mode (no file watching)
        #[arg(long)]
        r#static: bool,
    },

    /// Clean the public folder and cache
    Clean,

    /// List site information
    List {
        /// Type of content to list (post, ref)
        #[arg(default_value = "post")]
        r#type: String,
    },

    /// Display version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug {
        "spacetraveling_rs=debug,info"
    } else {
        "spacetraveling_rs=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine base directory
    let base_dir = match cli.cwd {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to read the current directory")?,
    };

    match cli.command {
        Commands::Init { folder } => {
            let target_dir = if folder.is_absolute() {
                folder
            } else {
                base_dir.join(folder)
            };
            tracing::info!("Initializing site in {:?}", target_dir);
            spacetraveling_rs::commands::init::init_site(&target_dir)?;
            println!("Initialized site in {:?}", target_dir);
        }

        Commands::Generate {
            force,
            watch,
            interval,
        } => {
            let blog = spacetraveling_rs::Blog::new(&base_dir)?;
            tracing::info!("Generating static files...");

            spacetraveling_rs::commands::generate::run_with_options(&blog, force).await?;
            println!("Generated successfully!");

            if watch {
                let interval = Duration::from_secs(interval.max(1));
                spacetraveling_rs::commands::generate::watch(&blog, interval).await?;
            }
        }

        Commands::Server {
            port,
            ip,
            open,
            r#static,
        } => {
            let blog = spacetraveling_rs::Blog::new(&base_dir)?;

            // Generate first
            tracing::info!("Generating static files...");
            blog.generate().await?;

            tracing::info!("Starting server at http://{}:{}", ip, port);
            spacetraveling_rs::server::start(&blog, &ip, port, !r#static, open).await?;
        }

        Commands::Clean => {
            let blog = spacetraveling_rs::Blog::new(&base_dir)?;
            tracing::info!("Cleaning public folder...");
            blog.clean()?;
            println!("Cleaned successfully!");
        }

        Commands::List { r#type } => {
            let blog = spacetraveling_rs::Blog::new(&base_dir)?;
            spacetraveling_rs::commands::list::run(&blog, &r#type).await?;
        }

        Commands::Version => {
            println!("spacetraveling-rs version {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
