use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    rapidtap::cli::run().await
}
