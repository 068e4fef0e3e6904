//! Pull command - the single-shot synchronize, resolve, pull operation

use caravel_repo::{ChartReference, MetadataStore, PullTarget};

use crate::error::Result;

/// Pull a chart named by a `helm://` reference to a `file://` target
pub async fn run(source: &str, target: &str, version: Option<&str>, force: bool) -> Result<()> {
    let mut reference = ChartReference::parse(source)?;
    // The flag is the more explicit request; it wins over ?version=.
    if let Some(version) = version {
        reference.version = Some(version.to_string());
    }
    let target = PullTarget::parse(target, force)?;

    let store = MetadataStore::from_env()?;
    let client = crate::commands::sync_client(store, None)?;

    let report = client.pull_reference(&reference, &target).await?;

    println!(
        "Pulled {}/{}:{} to {}",
        report.repository,
        report.chart,
        report.version,
        report.path.display()
    );
    println!("1 chart resolved and pulled");
    Ok(())
}
