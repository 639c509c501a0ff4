//! Terminal output for the `pdb-gpt` binary.
//!
//! Publications are rendered to strings first so the layout can be tested
//! without a terminal; colors are only applied when stdout is a terminal.

use owo_colors::OwoColorize;
use std::io::IsTerminal;
use std::time::Duration;

use crate::models::{Publication, PublicationSet};
use crate::utils::{terminal_width, wrap_text};

/// Column at which abstract text is wrapped
pub const WRAP_WIDTH: usize = 80;

/// Check if stdout is a terminal.
pub fn is_terminal() -> bool {
    std::io::stdout().is_terminal()
}

/// Status icons for different operations.
pub fn status_icon(status: Status) -> &'static str {
    match status {
        Status::Success => "✓",
        Status::Error => "✗",
        Status::Info => "ℹ",
        Status::Question => "?",
    }
}

/// Status types for colored output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Error,
    Info,
    Question,
}

/// Print a message prefixed with its status icon
pub fn print_status(status: Status, msg: &str) {
    let icon = status_icon(status);
    if !is_terminal() {
        println!("{} {}", icon, msg);
        return;
    }
    match status {
        Status::Success => println!("{} {}", icon.green().bold(), msg),
        Status::Error => println!("{} {}", icon.red().bold(), msg),
        Status::Info => println!("{} {}", icon.cyan().bold(), msg),
        Status::Question => println!("{} {}", icon.magenta().bold(), msg.bold()),
    }
}

/// Print a section header.
pub fn print_section(title: &str) {
    println!();
    let header = format!("━━━ {} ━━━", title);
    if is_terminal() {
        println!("{}", header.bold().cyan());
    } else {
        println!("{}", header);
    }
}

/// Render one publication.
///
/// Layout: title (with a "Primary Citation" badge on the primary record),
/// the DOI as a resolver link or "To be published.", then each abstract
/// section that has text as a heading followed by the wrapped text.
pub fn render_publication(publication: &Publication, color: bool) -> String {
    let mut out = String::new();

    if color {
        out.push_str(&publication.title.bold().to_string());
    } else {
        out.push_str(&publication.title);
    }
    out.push('\n');

    if publication.is_primary {
        if color {
            out.push_str(&" Primary Citation ".black().on_green().to_string());
        } else {
            out.push_str("[Primary Citation]");
        }
        out.push('\n');
    }

    match publication.doi_url() {
        Some(url) if color => out.push_str(&format!("doi: {}\n", url.blue().underline())),
        Some(url) => out.push_str(&format!("doi: {}\n", url)),
        None => out.push_str("doi: To be published.\n"),
    }

    for (name, text) in publication.abstract_sections.with_text() {
        out.push('\n');
        if color {
            out.push_str(&name.yellow().bold().to_string());
        } else {
            out.push_str(name);
        }
        out.push('\n');
        for line in wrap_text(text, WRAP_WIDTH) {
            out.push_str(&line);
            out.push('\n');
        }
    }

    out
}

/// Render a whole publication set, primary first, separated by dividers
pub fn render_publications(set: &PublicationSet, color: bool) -> String {
    let divider = "─".repeat(WRAP_WIDTH);
    let mut ordered: Vec<&Publication> = set.iter().collect();
    ordered.sort_by_key(|p| !p.is_primary);

    ordered
        .into_iter()
        .map(|p| render_publication(p, color))
        .collect::<Vec<_>>()
        .join(&format!("{}\n", if color { divider.dimmed().to_string() } else { divider }))
}

/// Print every publication of a set to stdout
pub fn print_publications(identifier: &str, set: &PublicationSet) {
    print_section(&format!("Publications for {}", identifier));
    println!();
    print!("{}", render_publications(set, is_terminal()));
}

/// Print a question and its answer
pub fn print_answer(question: &str, answer: &str) {
    println!();
    print_status(Status::Question, question);
    let width = WRAP_WIDTH.min(terminal_width().saturating_sub(2));
    for line in wrap_text(answer, width) {
        println!("  {}", line);
    }
}

/// Loading spinner shown while indexing and answering.
pub struct Spinner {
    pb: indicatif::ProgressBar,
}

impl Spinner {
    /// Create a new spinner with the given message; hidden when stdout is not a terminal.
    pub fn new(msg: &str) -> Self {
        let pb = if is_terminal() {
            indicatif::ProgressBar::new_spinner()
        } else {
            indicatif::ProgressBar::hidden()
        };
        if let Ok(style) = indicatif::ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            pb.set_style(style.tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ "));
        }
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));

        Self { pb }
    }

    /// Finish with success message.
    pub fn finish_with_success(&self, msg: &str) {
        self.finish_styled("{spinner:.green} {msg}", msg);
    }

    /// Finish with error message.
    pub fn finish_with_error(&self, msg: &str) {
        self.finish_styled("{spinner:.red} {msg}", msg);
    }

    /// Remove the spinner from the terminal.
    pub fn finish_and_clear(&self) {
        self.pb.finish_and_clear();
    }

    fn finish_styled(&self, template: &str, msg: &str) {
        if let Ok(style) = indicatif::ProgressStyle::with_template(template) {
            self.pb.set_style(style.tick_chars("✓ ✗ "));
        }
        self.pb.finish_with_message(msg.to_string());
    }
}
