use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rserve::models::{IssuerConfig, KeyPair, ServerConfig};
use rserve::server;
use rserve::services::{LinkChecker, SignTarget, UrlSigner};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "rserve", version)]
#[command(about = "Serve private files from a storage remote through expiring signed links")]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server that verifies links and serves files
    Serve,
    /// Create shareable signed links
    Sign {
        /// Files to sign, as `path` or `remote:path`
        #[arg(required = true)]
        targets: Vec<String>,

        /// Print a ready-to-run curl command instead of the bare URL
        #[arg(long)]
        curl: bool,

        /// Skip asking the server whether it accepts the new link
        #[arg(long)]
        skip_check: bool,
    },
    /// Generate a public/private key pair
    Generate,
    /// Show the version number
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve => {
            init_tracing(cli.verbose, "rserve=info,tower_http=info");
            let config = ServerConfig::from_env().context("Invalid server configuration")?;
            server::serve(config).await
        }
        Commands::Sign {
            targets,
            curl,
            skip_check,
        } => {
            init_tracing(cli.verbose, "rserve=warn");
            run_sign_command(&targets, curl, skip_check).await
        }
        Commands::Generate => {
            run_generate_command();
            Ok(())
        }
        Commands::Version => {
            println!("rserve v{VERSION}");
            Ok(())
        }
    }
}

fn init_tracing(verbose: bool, default_filter: &str) {
    let default_filter = if verbose {
        "rserve=debug,tower_http=debug"
    } else {
        default_filter
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Sign every target and print one line per link
async fn run_sign_command(targets: &[String], curl: bool, skip_check: bool) -> anyhow::Result<()> {
    let config = IssuerConfig::from_env().context("Invalid signing configuration")?;
    let signer = UrlSigner::from_config(&config);

    // Reject bad targets before signing anything
    let targets = targets
        .iter()
        .map(|t| SignTarget::parse(t, signer.remote()))
        .collect::<Result<Vec<_>, _>>()?;

    let checker = if skip_check {
        None
    } else {
        Some(LinkChecker::new()?)
    };

    let now = chrono::Utc::now();
    for target in &targets {
        let signed = signer.sign(target, now);

        if let Some(checker) = &checker {
            checker
                .check(&signed.url)
                .await
                .with_context(|| format!("Server did not accept link for {}", target.path))?;
        }

        if curl {
            println!("{}", signed.download_command());
        } else {
            println!("{signed}");
        }
    }

    Ok(())
}

/// Print a fresh key pair in environment-variable form
fn run_generate_command() {
    let pair = KeyPair::generate();
    println!("RSERVE_PUBLIC_KEY={}", pair.public_encoded());
    println!("RSERVE_PRIVATE_KEY={}", pair.private_encoded());
}
