use miette::Result;

#[tokio::main]
async fn main() -> Result<()> {
    svcmap::init_crypto();
    svcmap::cli::run().await
}
