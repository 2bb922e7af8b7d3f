//! Terminal rendering for search progress, tables, and labels.

use colored::{ColoredString, Colorize};
use console::Term;
use novel_client::{
    AggregationState, BookSummary, CheckStatus, DownloadTask, DownloadedFile, ProgressReport,
    RenderTarget, ReportPhase, SearchTicket, Session, SourceCheck, SourceInfo, TaskStatus,
};

const BAR_WIDTH: usize = 30;

/// Redraws a short progress block in place after every event.
///
/// When stdout is not a terminal, each status line is printed once instead.
pub struct LiveProgress {
    term: Term,
    drawn: usize,
    last_status: Option<String>,
}

impl LiveProgress {
    pub fn new() -> Self {
        Self {
            term: Term::stdout(),
            drawn: 0,
            last_status: None,
        }
    }

    fn redraw(&mut self, lines: &[String]) -> std::io::Result<()> {
        if self.drawn > 0 {
            self.term.clear_last_lines(self.drawn)?;
        }
        for line in lines {
            self.term.write_line(line)?;
        }
        self.drawn = lines.len();
        Ok(())
    }
}

impl Default for LiveProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderTarget for LiveProgress {
    fn render(&mut self, report: &ProgressReport, _state: &AggregationState) {
        if !self.term.is_term() {
            if report.status_line != self.last_status {
                if let Some(line) = &report.status_line {
                    println!("{}", line);
                }
                self.last_status = report.status_line.clone();
            }
            if let Some(summary) = &report.summary {
                println!("{}", summary);
            }
            return;
        }

        let mut lines = vec![
            report.headline.bold().to_string(),
            format!(
                "{} {:>3}% ({}/{})",
                progress_bar(report.progress_fraction),
                report.percent(),
                report.completed_sources,
                report.total_sources
            ),
        ];
        if let Some(status) = &report.status_line {
            lines.push(status.dimmed().to_string());
        }
        if let Some(summary) = &report.summary {
            lines.push(phase_colored(report.phase, summary).to_string());
        }

        // Drawing is best effort; a broken terminal must not abort the search.
        let _ = self.redraw(&lines);
    }
}

/// Feeds a session first and draws only snapshots the session accepted.
pub struct SessionProgress<'a> {
    pub session: &'a mut Session,
    pub ticket: SearchTicket,
    pub live: LiveProgress,
}

impl RenderTarget for SessionProgress<'_> {
    fn render(&mut self, report: &ProgressReport, state: &AggregationState) {
        if self.session.accept(self.ticket, state) {
            self.live.render(report, state);
        }
    }
}

fn progress_bar(fraction: f64) -> String {
    let filled = ((fraction * BAR_WIDTH as f64).round() as usize).min(BAR_WIDTH);
    format!(
        "[{}{}]",
        "#".repeat(filled).green(),
        "-".repeat(BAR_WIDTH - filled).dimmed()
    )
}

fn phase_colored(phase: ReportPhase, text: &str) -> ColoredString {
    match phase {
        ReportPhase::Completed => text.bright_green().bold(),
        ReportPhase::Failed => text.bright_red().bold(),
        ReportPhase::Interrupted => text.bright_yellow().bold(),
        ReportPhase::Waiting | ReportPhase::Running => text.normal(),
    }
}

/// Human-readable size with two decimals, e.g. `1.50 KB`.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

    if bytes == 0 {
        return "0 B".to_string();
    }
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{:.2} {}", size, UNITS[unit])
}

pub fn status_label(status: TaskStatus) -> ColoredString {
    match status {
        TaskStatus::Pending => "pending".yellow(),
        TaskStatus::Downloading => "downloading".cyan(),
        TaskStatus::Completed => "completed".green(),
        TaskStatus::Failed => "failed".red(),
    }
}

fn check_label(status: CheckStatus) -> ColoredString {
    match status {
        CheckStatus::Success => "ok".green(),
        CheckStatus::Warning => "warning".yellow(),
        CheckStatus::Error => "error".red(),
        CheckStatus::Disabled => "disabled".dimmed(),
        CheckStatus::Unknown => "unknown".normal(),
    }
}

/// One line per book, numbered from 1.
pub fn book_line(index: usize, book: &BookSummary) -> String {
    let mut line = format!(
        "{:>3}. {} - {} [{}]",
        index + 1,
        book.book_name.bold(),
        if book.author.is_empty() { "?" } else { &book.author },
        book.source_name.cyan()
    );
    if let Some(latest) = &book.latest_chapter {
        line.push_str(&format!(" {}", latest.dimmed()));
    }
    line
}

pub fn print_books(books: &[BookSummary]) {
    if books.is_empty() {
        println!("{}", "No books found".yellow());
        return;
    }
    for (index, book) in books.iter().enumerate() {
        println!("{}", book_line(index, book));
    }
}

pub fn print_sources(sources: &[SourceInfo]) {
    for source in sources {
        let search = if source.search_enabled {
            "search".green()
        } else {
            "no search".dimmed()
        };
        println!(
            "{:>3}. {} {} [{}]",
            source.id,
            source.name.bold(),
            source.url.dimmed(),
            search
        );
        if !source.comment.is_empty() {
            println!("     {}", source.comment.dimmed());
        }
    }
}

pub fn print_source_checks(checks: &[SourceCheck]) {
    for check in checks {
        println!(
            "{:>3}. {:<20} {:<8} {}",
            check.id,
            check.name,
            check_label(check.status),
            check.message.dimmed()
        );
    }
}

pub fn task_line(task: &DownloadTask) -> String {
    let title = if task.book_name.is_empty() {
        task.book_url.as_str()
    } else {
        task.book_name.as_str()
    };
    let mut line = format!(
        "{} {} [{}] {}",
        task.id.dimmed(),
        title.bold(),
        status_label(task.status),
        task.created_at.format("%Y-%m-%d %H:%M")
    );
    if task.status == TaskStatus::Downloading {
        line.push_str(&format!(
            " {}% ({}/{} chapters)",
            task.progress, task.downloaded_chapters, task.total_chapters
        ));
    }
    if let Some(error) = &task.error {
        line.push_str(&format!(" {}", error.red()));
    }
    line
}

pub fn print_tasks(tasks: &[DownloadTask]) {
    if tasks.is_empty() {
        println!("{}", "No download tasks".dimmed());
        return;
    }
    for task in tasks {
        println!("{}", task_line(task));
    }
}

pub fn file_line(file: &DownloadedFile) -> String {
    format!(
        "{} {} {}",
        file.name.bold(),
        format_file_size(file.size).cyan(),
        file.modified_at.format("%Y-%m-%d %H:%M").to_string().dimmed()
    )
}

pub fn print_files(files: &[DownloadedFile]) {
    if files.is_empty() {
        println!("{}", "No downloaded files".dimmed());
        return;
    }
    for file in files {
        println!("{}", file_line(file));
    }
}
