//! # Rendering
//!
//! Turns `CmdResult` pieces into terminal lines. Nothing here touches the API; handlers
//! pick the sections their command produced and pass them in.
//!
//! Colors come from `console`, which turns styling off when stdout is not a terminal, so
//! piped output and the e2e tests see plain text.

use chrono::{DateTime, Utc};
use console::style;
use folioapp::api::{CmdMessage, MessageLevel};
use folioapp::backup::BackupInfo;
use folioapp::commands::{HistoryView, StatusReport};
use folioapp::model::{CurrentDraft, Preferences, SavedDocument};
use folioapp::store::StorageUsage;
use folioapp::sync::DrainReport;
use timeago::Formatter;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

pub const LINE_WIDTH: usize = 80;
const TIME_WIDTH: usize = 16;
const INDEX_WIDTH: usize = 5;
const CURRENT_MARKER: &str = "▸";

pub fn print_messages(messages: &[CmdMessage]) {
    for message in messages {
        match message.level {
            MessageLevel::Info => println!("{}", style(&message.content).dim()),
            MessageLevel::Success => println!("{}", style(&message.content).green()),
            MessageLevel::Warning => println!("{}", style(&message.content).yellow()),
            MessageLevel::Error => println!("{}", style(&message.content).red()),
        }
    }
}

pub fn print_draft(draft: &CurrentDraft, document_name: Option<&str>) {
    let doc = &draft.data;
    let info = &doc.personal_info;

    let title = if info.full_name.is_empty() {
        "(no name)".to_string()
    } else {
        info.full_name.clone()
    };
    println!("{}", style(title).bold());

    let contact: Vec<&str> = [&info.email, &info.phone, &info.location, &info.website]
        .into_iter()
        .map(String::as_str)
        .filter(|s| !s.is_empty())
        .collect();
    if !contact.is_empty() {
        println!("{}", contact.join(" · "));
    }
    let source = match document_name {
        Some(name) => format!("{} · template {}", name, draft.template_id),
        None => format!("unsaved · template {}", draft.template_id),
    };
    println!("{}", style(source).dim());

    if !info.summary.is_empty() {
        println!();
        println!("{}", info.summary);
    }

    if !doc.experience.is_empty() {
        print_section("Experience");
        for (i, job) in doc.experience.iter().enumerate() {
            let end = if job.current {
                "present".to_string()
            } else {
                job.end_date.clone().unwrap_or_default()
            };
            println!(
                "{:>3}. {} · {}  {}",
                i + 1,
                style(&job.position).bold(),
                job.company,
                style(date_range(&job.start_date, &end)).dim()
            );
            if !job.location.is_empty() {
                println!("     {}", style(&job.location).dim());
            }
            if !job.description.is_empty() {
                println!("     {}", job.description);
            }
            for highlight in &job.highlights {
                println!("     - {}", highlight);
            }
        }
    }

    if !doc.education.is_empty() {
        print_section("Education");
        for (i, school) in doc.education.iter().enumerate() {
            let mut degree = school.degree.clone();
            if !school.field.is_empty() && school.field != school.degree {
                degree = format!("{}, {}", degree, school.field);
            }
            println!(
                "{:>3}. {} · {}  {}",
                i + 1,
                style(degree).bold(),
                school.institution,
                style(date_range(
                    &school.start_date,
                    school.end_date.as_deref().unwrap_or_default()
                ))
                .dim()
            );
            if let Some(gpa) = &school.gpa {
                println!("     GPA {}", gpa);
            }
        }
    }

    if !doc.skills.is_empty() {
        print_section("Skills");
        for (i, skill) in doc.skills.iter().enumerate() {
            println!("{:>3}. {}", i + 1, skill);
        }
    }
}

fn print_section(name: &str) {
    println!();
    println!("{}", style(name).yellow().bold());
}

fn date_range(start: &str, end: &str) -> String {
    match (start.is_empty(), end.is_empty()) {
        (true, true) => String::new(),
        (false, true) => start.to_string(),
        (true, false) => format!("until {}", end),
        (false, false) => format!("{} – {}", start, end),
    }
}

pub fn print_documents(docs: &[SavedDocument], editing: Option<&str>, now: DateTime<Utc>) {
    for (i, doc) in docs.iter().enumerate() {
        let marker = if editing == Some(doc.id.as_str()) {
            CURRENT_MARKER
        } else {
            " "
        };
        let index = format!("{}.", i + 1);
        let tags = if doc.tags.is_empty() {
            String::new()
        } else {
            let joined: Vec<&str> = doc.tags.iter().map(String::as_str).collect();
            format!(" [{}]", joined.join(" "))
        };
        let time_ago = format_time_ago(doc.updated_at, now);

        let fixed = 2 + INDEX_WIDTH + tags.width() + TIME_WIDTH;
        let available = LINE_WIDTH.saturating_sub(fixed);
        let name = truncate_to_width(&doc.name, available);
        let padding = available.saturating_sub(name.width());

        println!(
            "{} {:<width$}{}{}{}{}",
            style(marker).yellow(),
            style(index).yellow(),
            name,
            style(tags).cyan(),
            " ".repeat(padding),
            style(time_ago).dim(),
            width = INDEX_WIDTH
        );
    }
}

pub fn print_history(view: &HistoryView, now: DateTime<Utc>) {
    for item in &view.items {
        let marker = if item.current { CURRENT_MARKER } else { " " };
        let index = format!("{}.", item.index);
        let action = format!("{:<14}", item.action);
        let time_ago = format_time_ago(item.timestamp, now);

        let fixed = 2 + INDEX_WIDTH + action.width() + TIME_WIDTH;
        let available = LINE_WIDTH.saturating_sub(fixed);
        let label = truncate_to_width(&item.label, available);
        let padding = available.saturating_sub(label.width());

        let label = if item.current {
            style(label).bold()
        } else {
            style(label)
        };
        println!(
            "{} {:<width$}{}{}{}{}",
            style(marker).yellow(),
            style(index).yellow(),
            style(action).cyan(),
            label,
            " ".repeat(padding),
            style(time_ago).dim(),
            width = INDEX_WIDTH
        );
    }
    let mut hints = Vec::new();
    if view.can_undo {
        hints.push("undo");
    }
    if view.can_redo {
        hints.push("redo");
    }
    if !hints.is_empty() {
        println!("{}", style(format!("can {}", hints.join(" and "))).dim());
    }
}

pub fn print_backups(backups: &[BackupInfo], now: DateTime<Utc>) {
    for (i, backup) in backups.iter().enumerate() {
        println!(
            "  {:<width$}{}  {:>9}  {}",
            style(format!("{}.", i + 1)).yellow(),
            backup.key,
            format_bytes(backup.size),
            style(format_time_ago(backup.date, now)).dim(),
            width = INDEX_WIDTH
        );
    }
}

pub fn print_usage(usage: &StorageUsage) {
    let line = format!(
        "Storage: {} of {} ({:.1}%)",
        format_bytes(usage.used),
        format_bytes(usage.capacity),
        usage.percentage
    );
    if usage.percentage > 90.0 {
        println!("{}", style(line).red());
    } else {
        println!("{}", line);
    }
}

pub fn print_status(report: &StatusReport, now: DateTime<Utc>) {
    print_usage(&report.usage);
    println!("Documents: {}", report.documents);
    let last = report
        .last_backup
        .map(|at| format!(", last {}", format_time_ago(at, now).trim()))
        .unwrap_or_default();
    println!("Backups: {}{}", report.backups, last);
    println!(
        "History: entry {} of {}",
        report.history_position, report.history_entries
    );
    match &report.editing {
        Some(name) => println!("Editing: {}", name),
        None => println!("Editing: {}", style("unsaved draft").dim()),
    }
    println!(
        "Sync: {} via {} ({}, {} pending)",
        if report.sync.enabled {
            "enabled"
        } else {
            "disabled"
        },
        report.sync.transport,
        if report.sync.online {
            "online"
        } else {
            "offline"
        },
        report.sync.pending
    );
}

pub fn print_preferences(prefs: &Preferences) {
    println!("theme             {}", prefs.theme);
    println!("auto-save         {}", prefs.auto_save);
    println!("default-template  {}", prefs.default_template);
    let page = serde_json::to_value(prefs.page_size)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default();
    println!("page-size         {}", page);
}

pub fn print_drain(report: &DrainReport) {
    println!(
        "{}",
        style(format!(
            "{} pushed, {} pending",
            report.pushed, report.remaining
        ))
        .dim()
    );
}

pub fn print_paths(paths: &[std::path::PathBuf]) {
    for path in paths {
        println!("{}", style(path.display()).dim());
    }
}

pub fn format_time_ago(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let duration = (now - at).to_std().unwrap_or_default();
    let formatter = Formatter::new();
    format!("{:>width$}", formatter.convert(duration), width = TIME_WIDTH)
}

fn format_bytes(bytes: usize) -> String {
    const KB: f64 = 1024.0;
    let b = bytes as f64;
    if b < KB {
        format!("{} B", bytes)
    } else if b < KB * KB {
        format!("{:.1} KB", b / KB)
    } else {
        format!("{:.1} MB", b / (KB * KB))
    }
}

pub fn truncate_to_width(s: &str, max_width: usize) -> String {
    if s.width() <= max_width {
        return s.to_string();
    }
    let mut result = String::new();
    let mut current_width = 0;
    for c in s.chars() {
        let char_width = c.width().unwrap_or(0);
        if current_width + char_width > max_width.saturating_sub(1) {
            result.push('…');
            return result;
        }
        result.push(c);
        current_width += char_width;
    }
    result
}
