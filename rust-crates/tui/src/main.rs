use clap::Parser;
use color_eyre::eyre::Result;
use lottery_entrance::{
    client,
    config::Args,
};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let config = Args::parse().into_config();
    let _guard = client::init_tracing(&config.log_dir)?;
    tracing::info!("starting lottery-entrance client");
    client::run_app(config).await
}
