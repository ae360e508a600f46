mod app;
mod cli;
mod server;

use anyhow::Result;
use clap::Parser;
use docrecon_core::{Config, UploadEvent};

use crate::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docrecon=info,docrecon_core=info,tower_http=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port } => {
            let config = Config::from_env()?;
            let pipeline = app::build_pipeline(&config).await?;
            server::serve(pipeline, port).await
        }
        Commands::Event { data } => run_once(UploadEvent::decode(&data)?).await,
        Commands::Process {
            bucket,
            name,
            content_type,
        } => run_once(UploadEvent::new(bucket, name, content_type)).await,
        Commands::MatchNames {
            candidate,
            extracted,
        } => {
            let config = Config::from_env()?;
            let matched = app::build_reconciler(&config)?
                .names_match(&candidate, &extracted)
                .await?;
            println!("{matched}");
            Ok(())
        }
    }
}

async fn run_once(event: UploadEvent) -> Result<()> {
    let config = Config::from_env()?;
    let pipeline = app::build_pipeline(&config).await?;
    let output = pipeline.run(&event).await?;

    println!("{}", output.summary);
    Ok(())
}
