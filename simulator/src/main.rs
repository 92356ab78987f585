mod host;
mod openweather;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    host::run().await
}
