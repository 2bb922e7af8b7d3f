use anyhow::{Context, Result};

use crate::context::AppContext;
use crate::render::{print_source_checks, print_sources};

pub async fn run(ctx: &AppContext, check: bool) -> Result<()> {
    if check {
        return check_all(ctx).await;
    }

    let sources = ctx
        .client
        .list_sources()
        .await
        .context("Failed to list sources")?;
    ctx.print_header(&format!("{} sources", sources.len()));
    print_sources(&sources);
    Ok(())
}

pub async fn check_all(ctx: &AppContext) -> Result<()> {
    ctx.print_info("Checking every source, this may take a while...");

    let report = ctx
        .client
        .check_sources()
        .await
        .context("Source check failed")?;

    ctx.print_header("Source check");
    print_source_checks(&report.sources);

    let summary = report.summary;
    println!();
    ctx.print_success(&format!(
        "{} ok / {} warning / {} error / {} disabled (of {})",
        summary.success, summary.warning, summary.error, summary.disabled, summary.total
    ));
    Ok(())
}
