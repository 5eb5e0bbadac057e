// Output formatting and display for the supervisor's operator console

use crate::process::{ServiceReport, StopOutcome, SupervisionTable};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

const RULE_WIDTH: usize = 50;

/// Print the startup banner
pub fn print_banner() {
    println!("{}", "Starting service mesh supervisor".bold());
    println!("{}", "=".repeat(RULE_WIDTH));
}

/// Print the post-launch summary: what came up, where to reach it,
/// and how to stop it
pub fn print_running_summary(table: &SupervisionTable) {
    println!("\n{}", "=".repeat(RULE_WIDTH));
    println!("{}", "✓ Supervisor running".green().bold());
    println!("{}", "=".repeat(RULE_WIDTH));

    for service in table.iter() {
        match service.port {
            Some(port) => println!(
                "  {} {}  {}",
                "[RUNNING]".green(),
                service.name.cyan(),
                format!("http://localhost:{}", port).dimmed()
            ),
            None => println!("  {} {}", "[RUNNING]".green(), service.name.cyan()),
        }
    }

    println!("{}", "=".repeat(RULE_WIDTH));
    println!("{}", "Press Ctrl+C to stop all services".dimmed());
}

/// Print an error message to stderr
pub fn print_error(error: &str) {
    eprintln!("{} {}", "✗ Error:".red().bold(), error);
}

/// Print the final per-service shutdown report
pub fn print_report(reports: &[ServiceReport]) {
    #[derive(Tabled)]
    struct ReportRow {
        #[tabled(rename = "Service")]
        name: String,
        #[tabled(rename = "Outcome")]
        outcome: String,
    }

    let rows: Vec<ReportRow> = reports
        .iter()
        .map(|r| ReportRow {
            name: r.name.clone(),
            outcome: format_outcome_colored(&r.outcome),
        })
        .collect();

    let mut table = Table::new(rows);
    table
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()));

    println!("\n{}\n", table);
    println!("{}", "✓ All services stopped".green().bold());
}

/// Format a stop outcome with color coding
fn format_outcome_colored(outcome: &StopOutcome) -> String {
    match outcome {
        StopOutcome::Graceful => outcome.to_string().green().to_string(),
        StopOutcome::Killed => outcome.to_string().yellow().bold().to_string(),
        StopOutcome::AlreadyExited => outcome.to_string().bright_black().to_string(),
        StopOutcome::Failed(_) => outcome.to_string().red().bold().to_string(),
    }
}

/// Create a spinner for the startup grace wait
pub fn create_progress_bar(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap()
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// Finish a spinner with success
pub fn finish_progress_success(pb: ProgressBar, message: &str) {
    pb.finish_with_message(format!("{} {}", "✓".green(), message));
}

/// Finish a spinner with error
pub fn finish_progress_error(pb: ProgressBar, message: &str) {
    pb.finish_with_message(format!("{} {}", "✗".red(), message));
}
