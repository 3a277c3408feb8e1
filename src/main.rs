use clap::Parser;
use replicated_fs::cli::{Cli, Commands};
use replicated_fs::config::{ControllerConfig, DstoreConfig};
use replicated_fs::controller::server::ControllerServer;
use replicated_fs::dstore::node::DstoreNode;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    match cli.command {
        Commands::Controller(args) => {
            let config = ControllerConfig::try_from(args)?;
            tracing::info!(
                "Starting Controller on port {} (R={})",
                config.port,
                config.replication_factor
            );

            let server = ControllerServer::bind(config).await?;
            server.run().await?;
        }
        Commands::Dstore(args) => {
            let config = DstoreConfig::try_from(args)?;
            tracing::info!(
                "Starting Dstore on port {}, Controller at {}",
                config.port,
                config.controller_addr()
            );

            let node = DstoreNode::start(config).await?;
            node.run().await?;
        }
    }

    Ok(())
}
