//! Terminal rendering of events, sessions and action logs.

use colored::Colorize;
use sc_protocol::{ActionLogEntry, Event, SessionStatus, TestConfiguration, TestSession};

pub fn status(status: SessionStatus) -> String {
    match status {
        SessionStatus::Running => status.as_str().yellow().to_string(),
        SessionStatus::Completed => status.as_str().green().to_string(),
        SessionStatus::Failed => status.as_str().red().to_string(),
        SessionStatus::Cancelled => status.as_str().magenta().to_string(),
    }
}

pub fn event(event: &Event) -> String {
    match event {
        Event::SessionStarted {
            session_id,
            url,
            test_kind,
            config_id,
        } => format!(
            "{} {} {} ({}, {})",
            "▶".cyan(),
            session_id.bold(),
            url,
            test_kind,
            config_id.as_deref().unwrap_or("inline")
        ),
        Event::SessionStatusUpdate { session_id, status: s } => {
            format!("  {} {} -> {}", "•".dimmed(), session_id, status(*s))
        }
        Event::ActionLogged {
            action_type,
            success,
            execution_time_ms,
            ..
        } => {
            let mark = if *success { "✓".green() } else { "✗".red() };
            format!("  {mark} {action_type} {}", format!("{execution_time_ms}ms").dimmed())
        }
        Event::SessionCompleted { session_id, success } => {
            let verdict = if *success { "passed".green() } else { "failed".red() };
            format!("{} {} {}", "■".cyan(), session_id.bold(), verdict)
        }
        Event::SessionError { session_id, error } => {
            format!("{} {}: {}", "!".red().bold(), session_id, error.red())
        }
        Event::SessionCancelled { session_id } => {
            format!("{} {} cancelled", "■".magenta(), session_id.bold())
        }
    }
}

pub fn configuration(config: &TestConfiguration) -> String {
    let active = if config.is_active {
        "active".green()
    } else {
        "inactive".dimmed()
    };
    format!(
        "{:<24} {:<14} {:<8} {}",
        config.id.bold(),
        config.test_kind.to_string(),
        active,
        config.url_pattern
    )
}

pub fn session(session: &TestSession) -> String {
    let mut lines = vec![
        format!("{} {}", "Session:".bold(), session.id),
        format!("{} {}", "URL:".bold(), session.url),
        format!("{} {}", "Kind:".bold(), session.test_kind),
        format!("{} {}", "Status:".bold(), status(session.status)),
        format!(
            "{} {}",
            "Configuration:".bold(),
            session.config_id.as_deref().unwrap_or("inline")
        ),
        format!("{} {}", "Started:".bold(), session.start_time.to_rfc3339()),
    ];
    if let Some(end) = session.end_time {
        lines.push(format!("{} {}", "Ended:".bold(), end.to_rfc3339()));
    }
    if let Some(error) = &session.error_summary {
        lines.push(format!("{} {}", "Error:".bold(), error.red()));
    }
    lines.join("\n")
}

pub fn log_entry(entry: &ActionLogEntry) -> String {
    let mark = if entry.succeeded() { "✓".green() } else { "✗".red() };
    let mut line = format!(
        "{} {mark} {:<16} {}",
        entry.timestamp.format("%H:%M:%S%.3f").to_string().dimmed(),
        entry.action_type,
        format!("{}ms", entry.execution_time_ms).dimmed()
    );
    if let Some(error) = &entry.error {
        line.push_str(&format!("  {}", error.red()));
    }
    line
}
