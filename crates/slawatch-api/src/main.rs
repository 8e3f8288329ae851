use slawatch_core::Config;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let config = Config::from_env()?;

    // Database, services, scheduler and routes
    let (state, router) = slawatch_api::setup::initialize_app(config.clone()).await?;

    slawatch_api::setup::server::start_server(&config, state, router).await?;

    Ok(())
}
