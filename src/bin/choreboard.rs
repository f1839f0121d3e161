use anyhow::Result;
use tracing::Level;

use choreboard::{bootstrap, BootstrapConfig};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    if let Err(e) = run().await {
        eprintln!("bootstrap failed: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let config = BootstrapConfig::from_env()?;
    let context = bootstrap(&config).await?;
    println!("database '{}' ready", context.db.name());
    Ok(())
}
