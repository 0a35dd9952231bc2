use anyhow::Context;

use harbor_streets::config::{output_path, HARBOR_BOUNDS, OVERPASS_URL};
use harbor_streets::OverpassClient;

fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"),
    );

    let client = OverpassClient::new(OVERPASS_URL).context("Could not build the HTTP client")?;
    let output = output_path();

    harbor_streets::run(&client, &HARBOR_BOUNDS, &output)
        .with_context(|| format!("Failed to export streets to {}", output.display()))?;

    Ok(())
}
