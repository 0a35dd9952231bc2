use anyhow::Context;

use harbor_streets::config::{output_path, HARBOR_BOUNDS};
use harbor_streets::PbfExtract;

const FILE_NAME: &str = "./osm_data/new-york-latest.osm.pbf";

/// Same export as the main binary, fed from a local extract instead of Overpass.
fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"),
    );

    let source = PbfExtract::new(FILE_NAME);
    let output = output_path();

    harbor_streets::run(&source, &HARBOR_BOUNDS, &output)
        .with_context(|| format!("Failed to export streets from {FILE_NAME}"))?;

    Ok(())
}
