use std::path::Path;

use anyhow::{Context, Result};

use crate::context::AppContext;
use crate::render::{format_file_size, print_files};

pub async fn list(ctx: &AppContext) -> Result<()> {
    let files = ctx
        .client
        .list_files()
        .await
        .context("Failed to list files")?;
    let total: u64 = files.iter().map(|file| file.size).sum();

    ctx.print_header(&format!(
        "{} files, {}",
        files.len(),
        format_file_size(total)
    ));
    print_files(&files);
    Ok(())
}

pub async fn fetch(ctx: &AppContext, name: &str, dir: Option<&Path>) -> Result<()> {
    let dest_dir = dir.unwrap_or(ctx.config.download_dir.as_path());
    let path = ctx
        .client
        .download_file(name, dest_dir)
        .await
        .with_context(|| format!("Failed to fetch {}", name))?;
    ctx.print_success(&format!("✓ Saved {}", path.display()));
    Ok(())
}
