use anyhow::Result;
use clap::Parser;
use payout_export::cli::{init_tracing, Cli};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Local overrides first: dotenvy never replaces a variable already set
    dotenvy::from_filename(".env.local").ok();
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);
    cli.run().await
}
