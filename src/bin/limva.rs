use anyhow::Result;
use limva::cli::{start, telemetry};

#[tokio::main]
async fn main() -> Result<()> {
    let (action, globals) = start()?;

    let result = action.execute(&globals).await;

    telemetry::shutdown_tracer();

    result
}
