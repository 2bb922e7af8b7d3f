//! Streaming search with live progress.

use anyhow::{Context, Result};
use colored::Colorize;
use dialoguer::Select;
use novel_client::{BookSummary, DownloadRequest, RenderTarget, SearchOutcome, SearchRequest};
use tracing::debug;

use crate::context::AppContext;
use crate::render::{book_line, print_books, LiveProgress};

pub async fn run(ctx: &AppContext, keyword: &str, source: Option<u32>, pick: bool) -> Result<()> {
    let mut request = SearchRequest::new(keyword);
    if let Some(source_id) = source {
        request = request.source(source_id);
    }

    let outcome = stream_search(ctx, &request, &mut LiveProgress::new()).await?;
    println!();
    print_books(outcome.books());

    if pick && !outcome.books().is_empty() {
        if let Some(index) = pick_book(ctx, outcome.books())? {
            book_action(ctx, &outcome.books()[index]).await?;
        }
    }
    Ok(())
}

/// Run a search until it ends or Ctrl-C is pressed.
pub async fn stream_search<R>(
    ctx: &AppContext,
    request: &SearchRequest,
    render: &mut R,
) -> Result<SearchOutcome>
where
    R: RenderTarget + ?Sized,
{
    let interrupt = ctx.ctrl_c_token();
    let result = ctx
        .client
        .search_until_cancelled(request, render, interrupt.token())
        .await;
    drop(interrupt);

    let outcome = result.context("Search request failed")?;
    if outcome.cancelled {
        ctx.print_warning(&format!(
            "Search cancelled ({} results so far)",
            outcome.books().len()
        ));
    }
    if !outcome.decode_errors.is_empty() {
        debug!(count = outcome.decode_errors.len(), "Skipped malformed records");
        ctx.print_warning(&format!(
            "Skipped {} malformed record(s)",
            outcome.decode_errors.len()
        ));
    }
    Ok(outcome)
}

/// Let the user choose one of `books` by position. `None` means back.
pub fn pick_book(ctx: &AppContext, books: &[BookSummary]) -> Result<Option<usize>> {
    let mut items: Vec<String> = books
        .iter()
        .enumerate()
        .map(|(index, book)| book_line(index, book))
        .collect();
    items.push("↩ Back".to_string());

    let selection = Select::with_theme(&ctx.theme())
        .with_prompt("Which book?")
        .items(&items)
        .default(0)
        .interact()?;

    Ok((selection < books.len()).then_some(selection))
}

/// Download or read one result.
pub async fn book_action(ctx: &AppContext, book: &BookSummary) -> Result<()> {
    let options = ["📥 Download", "📖 Read online", "↩ Back"];
    let selection = Select::with_theme(&ctx.theme())
        .with_prompt(format!("{} ({})", book.book_name, book.source_name))
        .items(&options)
        .default(0)
        .interact()?;

    match selection {
        0 => queue_download(ctx, book).await,
        1 => {
            let url = ctx
                .client
                .reader_url(book)
                .context("Failed to build reader link")?;
            ctx.print_info(&format!("📖 {}", url));
            Ok(())
        }
        _ => Ok(()),
    }
}

pub async fn queue_download(ctx: &AppContext, book: &BookSummary) -> Result<()> {
    if !ctx.confirm(
        &format!("Queue a download of {} from {}?", book.book_name, book.source_name),
        true,
    )? {
        return Ok(());
    }

    let task_id = ctx
        .client
        .start_download(&DownloadRequest::for_book(book))
        .await
        .context("Failed to start download")?;
    ctx.print_success(&format!("✓ Download queued: {}", task_id.bold()));
    ctx.print_info("Check progress with `novel tasks --watch`");
    Ok(())
}
