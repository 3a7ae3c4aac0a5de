#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dealsign_registry::server::run().await
}
