use clearnode::{ClearNodeBuilder, ClearNodeConfig, ConnectionStatus, NodeQueries};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    // Reads CLEARNODE_PRIVATE_KEY (and optional overrides) from the environment or .env
    let config = ClearNodeConfig::from_env_file("CLEARNODE")?;

    println!("Connecting to {}...", config.node_url);
    let mut client = ClearNodeBuilder::new(config)
        .on_status(|status: ConnectionStatus, error: Option<&str>| match error {
            Some(error) => println!("status: {} ({})", status, error),
            None => println!("status: {}", status),
        })
        .connect()
        .await?;

    println!("Authenticated as {}", client.address());

    let pong = client.ping().await?;
    println!("ping -> {} {}", pong.method, pong.result);

    match client.get_config().await {
        Ok(node) => println!(
            "broker: {}, networks: {}",
            node.broker_address.as_deref().unwrap_or("unknown"),
            node.networks.len()
        ),
        Err(e) => println!("Error fetching config: {}", e),
    }

    match client.get_assets(None).await {
        Ok(assets) => {
            println!("Found {} assets", assets.len());
            for asset in assets.iter().take(5) {
                println!(
                    "Asset: {} (chain {:?}, decimals {:?})",
                    asset.symbol, asset.chain_id, asset.decimals
                );
            }
        }
        Err(e) => println!("Error fetching assets: {}", e),
    }

    client.close().await;
    Ok(())
}
