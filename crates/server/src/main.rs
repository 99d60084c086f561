use parley_server::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut config = ServerConfig::from_env();

    // Optional port override as the first argument.
    if let Some(port) = std::env::args().nth(1).and_then(|p| p.parse().ok()) {
        config.port = port;
    }

    parley_server::run(config).await
}
