#[tokio::main]
async fn main() -> anyhow::Result<()> {
    marquee_api::run().await
}
