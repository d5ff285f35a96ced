use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, Table};

use crate::config::context::ServiceKind;
use crate::config::model::Link;
use crate::ui::logs::emphasize;

pub struct StatusRow {
    pub name: String,
    pub kind: ServiceKind,
    pub status: String,
    pub uptime_ms: Option<u64>,
    pub cpu_percent: Option<f64>,
    pub memory_bytes: Option<u64>,
}

/// Render the merged service table for `zap status`.
pub fn print_status(project: &str, rows: &[StatusRow]) {
    println!("{}", emphasize(project));

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(["service", "kind", "status", "uptime", "cpu", "memory"]);

    for row in rows {
        table.add_row([
            Cell::new(&row.name),
            Cell::new(row.kind.to_string()),
            Cell::new(&row.status),
            Cell::new(format_uptime(row.uptime_ms)),
            Cell::new(
                row.cpu_percent
                    .map(|cpu| format!("{cpu:.1}%"))
                    .unwrap_or_else(|| "-".into()),
            ),
            Cell::new(format_memory(row.memory_bytes)),
        ]);
    }

    println!("{table}");
}

pub fn print_links(links: &[Link]) {
    if links.is_empty() {
        return;
    }
    println!();
    for link in links {
        println!("  {}  {}", link.name, link.url);
    }
}

/// Supervisor uptime arrives as a start-epoch in milliseconds.
fn format_uptime(uptime_ms: Option<u64>) -> String {
    let Some(started_ms) = uptime_ms else {
        return "-".to_string();
    };
    let now_ms = chrono::Utc::now().timestamp_millis() as u64;
    let elapsed_secs = now_ms.saturating_sub(started_ms) / 1000;
    humantime::format_duration(std::time::Duration::from_secs(elapsed_secs)).to_string()
}

fn format_memory(bytes: Option<u64>) -> String {
    match bytes {
        None => "-".to_string(),
        Some(b) if b >= 1_073_741_824 => format!("{:.1}gb", b as f64 / 1_073_741_824.0),
        Some(b) if b >= 1_048_576 => format!("{:.1}mb", b as f64 / 1_048_576.0),
        Some(b) if b >= 1024 => format!("{:.1}kb", b as f64 / 1024.0),
        Some(b) => format!("{b}b"),
    }
}
