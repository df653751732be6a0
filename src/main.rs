use clap::Parser;
use shortlink_operator::config::{self, Config};
use tracing_subscriber::EnvFilter;

/// Declarative short-link service: reconciles ShortLink objects into a
/// servable redirect table.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Address the redirect service binds to (overrides LISTEN).
    #[arg(long)]
    bind_address: Option<String>,

    /// JSON file of shortlink declarations loaded at startup (overrides LINKS_FILE).
    #[arg(long)]
    links_file: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let mut config = config::load_from_env()?;
    if let Some(addr) = args.bind_address {
        config.listen_addr = addr;
    }
    if let Some(path) = args.links_file {
        config.links_file = Some(path);
    }

    init_tracing(&config);
    config.print_summary();

    shortlink_operator::server::run(config).await
}

fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    if config.log_format == "json" {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
