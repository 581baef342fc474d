#[tokio::main]
async fn main() -> anyhow::Result<()> {
    acord_pdf_factory::run().await
}
