#[tokio::main]
async fn main() -> anyhow::Result<()> {
    standup_watch::init_tracing();
    standup_watch::run().await
}
