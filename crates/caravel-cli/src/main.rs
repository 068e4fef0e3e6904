//! Caravel CLI - synchronize chart repositories, resolve references, pull charts

use clap::{Parser, Subcommand};

mod commands;
mod error;
mod exit_codes;

use error::CliError;

#[derive(Parser)]
#[command(name = "caravel")]
#[command(author = "Caravel Contributors")]
#[command(version)]
#[command(about = "Client-side chart repository synchronization", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Pull a chart: register its repository, refresh metadata, resolve, download
    Pull {
        /// Source reference (helm://host/chart[?version=...])
        source: String,

        /// Target location (file://path)
        target: String,

        /// Chart version (overrides the reference's ?version= query)
        #[arg(long)]
        version: Option<String>,

        /// Overwrite an existing file at the target
        #[arg(long)]
        force: bool,
    },

    /// Manage registered repositories
    Repo {
        #[command(subcommand)]
        command: RepoCommands,
    },
}

#[derive(Subcommand)]
enum RepoCommands {
    /// Register a repository (its index is fetched once as a probe)
    Add {
        /// Repository name
        name: String,

        /// Repository URL
        url: String,

        /// Username for basic auth
        #[arg(long)]
        username: Option<String>,

        /// Password for basic auth
        #[arg(long)]
        password: Option<String>,

        /// Bearer token
        #[arg(long)]
        token: Option<String>,
    },

    /// List registered repositories
    List,

    /// Refresh cached indexes for one repository, or for all
    Update {
        /// Repository name (all repositories when omitted)
        name: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    miette::set_panic_hook();

    let cli = Cli::parse();
    init_tracing(cli.debug);

    let result = run(cli.command).await;
    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

async fn run(command: Commands) -> Result<(), CliError> {
    match command {
        Commands::Pull {
            source,
            target,
            version,
            force,
        } => commands::pull::run(&source, &target, version.as_deref(), force).await,

        Commands::Repo { command } => match command {
            RepoCommands::Add {
                name,
                url,
                username,
                password,
                token,
            } => {
                commands::repo::add(
                    &name,
                    &url,
                    username.as_deref(),
                    password.as_deref(),
                    token.as_deref(),
                )
                .await
            }
            RepoCommands::List => commands::repo::list().await,
            RepoCommands::Update { name } => commands::repo::update(name.as_deref()).await,
        },
    }
}

fn init_tracing(debug: bool) {
    use tracing_subscriber::EnvFilter;

    let default_level = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
