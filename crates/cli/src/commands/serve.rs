//! `toolloop serve` - Start the HTTP API server.

use toolloop_config::AppConfig;

pub async fn run(
    mut config: AppConfig,
    host: Option<String>,
    port: Option<u16>,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(host) = host {
        config.gateway.host = host;
    }
    if let Some(port) = port {
        config.gateway.port = port;
    }

    println!("toolloop gateway");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Workspace: {}", config.workspace.root.display());
    println!("   Model:     {}", config.default_model);

    toolloop_gateway::start(config).await?;

    Ok(())
}
