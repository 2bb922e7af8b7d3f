//! Interactive menu, one screen per tab.

use anyhow::Result;
use colored::Colorize;
use console::Term;
use dialoguer::{Input, Select};
use novel_client::{SearchRequest, Session, Tab};

use crate::cmd::{files, search, sources, tasks};
use crate::context::AppContext;
use crate::render::{file_line, print_books, print_tasks, task_line, LiveProgress, SessionProgress};

pub async fn run(ctx: &AppContext) -> Result<()> {
    let term = Term::stdout();
    print_banner(&term, ctx)?;

    let mut session = Session::new();

    loop {
        println!();
        let mut options: Vec<&str> = Tab::ALL.iter().map(|tab| tab.label()).collect();
        options.push("Exit");

        let default = Tab::ALL
            .iter()
            .position(|tab| *tab == session.current_tab())
            .unwrap_or(0);
        let selection = Select::with_theme(&ctx.theme())
            .with_prompt("What would you like to do?")
            .items(&options)
            .default(default)
            .interact_on(&term)?;

        let Some(&tab) = Tab::ALL.get(selection) else {
            println!("{}", "👋 Goodbye!".bright_blue());
            break;
        };
        session.switch_tab(tab);

        // Backend errors are shown and the menu carries on.
        let result = match tab {
            Tab::Search => search_tab(ctx, &mut session).await,
            Tab::Sources => sources_tab(ctx).await,
            Tab::Tasks => tasks_tab(ctx, &session).await,
            Tab::Files => files_tab(ctx).await,
        };
        if let Err(e) = result {
            println!("{} {:#}", "✗".bright_red(), e);
        }
    }

    Ok(())
}

fn print_banner(term: &Term, ctx: &AppContext) -> Result<()> {
    term.clear_screen()?;
    println!("{}", "╔════════════════════════════════════════╗".bright_cyan());
    println!("{}", "║            Z Reader                    ║".bright_cyan());
    println!("{}", "╚════════════════════════════════════════╝".bright_cyan());
    println!("{}", format!("  backend: {}", ctx.client.base_url()).dimmed());
    Ok(())
}

async fn search_tab(ctx: &AppContext, session: &mut Session) -> Result<()> {
    let keyword: String = Input::with_theme(&ctx.theme())
        .with_prompt("Book title or author")
        .interact_text()?;
    let keyword = keyword.trim();
    if keyword.is_empty() {
        return Ok(());
    }

    let ticket = session.begin_search();
    let mut progress = SessionProgress {
        session: &mut *session,
        ticket,
        live: LiveProgress::new(),
    };
    search::stream_search(ctx, &SearchRequest::new(keyword), &mut progress).await?;

    if let Some(state) = session.search_state() {
        ctx.print_header(&format!(
            "{} results for \"{}\"",
            state.accumulated_books.len(),
            state.keyword
        ));
    }
    print_books(session.search_results());
    if session.search_results().is_empty() {
        return Ok(());
    }

    let Some(index) = search::pick_book(ctx, session.search_results())? else {
        return Ok(());
    };

    let book = session.select_book(index)?.clone();
    search::book_action(ctx, &book).await?;
    session.clear_selection();
    Ok(())
}

async fn sources_tab(ctx: &AppContext) -> Result<()> {
    sources::run(ctx, false).await?;
    if ctx.confirm("Run a health check on every source?", false)? {
        sources::check_all(ctx).await?;
    }
    Ok(())
}

async fn tasks_tab(ctx: &AppContext, session: &Session) -> Result<()> {
    loop {
        let task_list = ctx.client.list_tasks().await?;
        ctx.print_header(&format!("{} tasks", task_list.len()));
        print_tasks(&task_list);

        let options = ["Refresh", "Watch until finished", "Delete a task", "↩ Back"];
        let selection = Select::with_theme(&ctx.theme())
            .items(&options)
            .default(0)
            .interact()?;

        match selection {
            0 => continue,
            1 => {
                let interrupt = ctx.ctrl_c_token();
                ctx.print_info("Press Ctrl+C to stop watching");
                tasks::watch_tasks(ctx, interrupt.token(), || session.should_poll_tasks())
                    .await?;
            }
            2 => {
                if task_list.is_empty() {
                    continue;
                }
                let items: Vec<String> = task_list.iter().map(task_line).collect();
                let choice = Select::with_theme(&ctx.theme())
                    .with_prompt("Delete which task?")
                    .items(&items)
                    .default(0)
                    .interact()?;
                let task = &task_list[choice];
                if ctx.confirm(&format!("Delete task {}?", task.id), false)? {
                    tasks::delete(ctx, &task.id).await?;
                }
            }
            _ => break,
        }
    }
    Ok(())
}

async fn files_tab(ctx: &AppContext) -> Result<()> {
    let file_list = ctx.client.list_files().await?;
    if file_list.is_empty() {
        ctx.print_warning("No downloaded files");
        return Ok(());
    }

    let mut items: Vec<String> = file_list.iter().map(file_line).collect();
    items.push("↩ Back".to_string());
    let selection = Select::with_theme(&ctx.theme())
        .with_prompt("Save which file locally?")
        .items(&items)
        .default(0)
        .interact()?;

    if let Some(file) = file_list.get(selection) {
        files::fetch(ctx, &file.name, None).await?;
    }
    Ok(())
}
