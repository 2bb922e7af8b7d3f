//! Download task commands.

use anyhow::{Context, Result};
use colored::Colorize;
use novel_client::{DownloadFormat, DownloadRequest, DownloadTask};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::context::AppContext;
use crate::render::{print_tasks, task_line};

pub async fn download(
    ctx: &AppContext,
    book_url: &str,
    source_id: u32,
    start: i32,
    end: i32,
    format: DownloadFormat,
) -> Result<()> {
    let request = DownloadRequest::new(book_url, source_id)
        .chapters(start, end)
        .format(format);

    let task_id = ctx
        .client
        .start_download(&request)
        .await
        .context("Failed to start download")?;
    ctx.print_success(&format!("✓ Download queued: {}", task_id.bold()));
    Ok(())
}

pub async fn list(ctx: &AppContext, watch: bool) -> Result<()> {
    if watch {
        let interrupt = ctx.ctrl_c_token();
        return watch_tasks(ctx, interrupt.token(), || true).await;
    }

    let tasks = fetch(ctx).await?;
    print_tasks(&tasks);
    Ok(())
}

/// Poll the task list until every task has finished, `cancel` fires, or
/// `keep_polling` returns false.
pub async fn watch_tasks(
    ctx: &AppContext,
    cancel: &CancellationToken,
    mut keep_polling: impl FnMut() -> bool,
) -> Result<()> {
    let mut interval = tokio::time::interval(ctx.config.task_poll_interval);

    while keep_polling() {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {}
        }

        let tasks = fetch(ctx).await?;
        ctx.print_header(&format!(
            "Tasks at {}",
            chrono::Local::now().format("%H:%M:%S")
        ));
        print_tasks(&tasks);

        if tasks.iter().all(|task| task.status.is_finished()) {
            info!(tasks = tasks.len(), "All download tasks finished");
            ctx.print_success("All tasks finished");
            break;
        }
    }
    Ok(())
}

async fn fetch(ctx: &AppContext) -> Result<Vec<DownloadTask>> {
    ctx.client
        .list_tasks()
        .await
        .context("Failed to list tasks")
}

pub async fn show(ctx: &AppContext, task_id: &str) -> Result<()> {
    let task = ctx
        .client
        .get_task(task_id)
        .await
        .with_context(|| format!("Failed to load task {}", task_id))?;

    println!("{}", task_line(&task));
    println!("  {} {}", "url:".dimmed(), task.book_url);
    println!("  {} {}", "source:".dimmed(), task.source_name);
    if !task.author.is_empty() {
        println!("  {} {}", "author:".dimmed(), task.author);
    }
    println!(
        "  {} {}/{} chapters ({}%)",
        "progress:".dimmed(),
        task.downloaded_chapters,
        task.total_chapters,
        task.progress
    );
    Ok(())
}

pub async fn delete(ctx: &AppContext, task_id: &str) -> Result<()> {
    ctx.client
        .delete_task(task_id)
        .await
        .with_context(|| format!("Failed to delete task {}", task_id))?;
    ctx.print_success(&format!("✓ Task {} deleted", task_id));
    Ok(())
}
