use anyhow::Result;
use gamegen_studio::app::StudioApp;
use gamegen_studio::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;
    config.validate()?;

    let mut app = StudioApp::new(config)?;
    app.run().await?;

    Ok(())
}
