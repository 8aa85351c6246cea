use colored::*;
use common::{
    AccessRequest, EventKind, NetworkNode, NodeKind, NodeStatus, Notification, NotificationStyle, RequestStatus,
    SecurityEvent, Severity,
};
use ztna_engine::dashboard::{recent_events, recent_requests};
use ztna_engine::{RiskBand, Snapshot, Summary};

pub const WIDTH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Dashboard,
    Network,
    Access,
    Events,
}

impl Tab {
    pub const ALL: [Tab; 4] = [Tab::Dashboard, Tab::Network, Tab::Access, Tab::Events];

    pub fn title(self) -> &'static str {
        match self {
            Tab::Dashboard => "Dashboard",
            Tab::Network => "Network Map",
            Tab::Access => "Access Control",
            Tab::Events => "Security Events",
        }
    }

    pub fn next(self) -> Tab {
        let i = Tab::ALL.iter().position(|t| *t == self).unwrap_or(0);
        Tab::ALL[(i + 1) % Tab::ALL.len()]
    }
}

/// Everything the screen needs besides the snapshot itself.
pub struct Frame<'a> {
    pub tab: Tab,
    pub cursor: usize,
    pub notification: Option<&'a Notification>,
}

struct Screen {
    out: String,
}

impl Screen {
    fn new() -> Self {
        Screen { out: String::new() }
    }

    fn raw(&mut self, line: impl std::fmt::Display) {
        self.out.push_str(&format!("{}\r\n", line));
    }

    fn rule(&mut self, left: &str, right: &str) {
        self.raw(format!("{}{}{}", left, "═".repeat(WIDTH - 2), right).bright_cyan());
    }

    /// Boxed row, padded by visible width so colours do not skew the frame.
    fn row(&mut self, content: impl std::fmt::Display) {
        let content = content.to_string();
        let content = truncate_visible(&content, WIDTH - 4);
        let padding = (WIDTH - 4).saturating_sub(display_width(&content));
        self.raw(format!("{} {}{} {}", "║".bright_cyan(), content, " ".repeat(padding), "║".bright_cyan()));
    }
}

pub fn render_screen(snapshot: &Snapshot, frame: &Frame<'_>) -> String {
    let mut screen = Screen::new();

    screen.rule("╔", "╗");
    screen.row(format!("{}  {}", "ZTNA Simulator".bright_cyan().bold(), "● System Secure".bright_green()));
    screen.row("Real-time Zero Trust Network Access monitoring and control".dimmed());
    screen.rule("╠", "╣");
    screen.row(tab_bar(frame.tab));
    screen.rule("╠", "╣");

    match frame.tab {
        Tab::Dashboard => dashboard(&mut screen, snapshot),
        Tab::Network => network(&mut screen, snapshot, frame.cursor),
        Tab::Access => access(&mut screen, snapshot, frame.cursor),
        Tab::Events => events(&mut screen, snapshot),
    }

    screen.rule("╠", "╣");
    match frame.notification {
        Some(note) => screen.row(notification_line(note)),
        None => screen.row(format!("Ticks: {}", snapshot.ticks).dimmed()),
    }
    screen.row(controls(frame.tab).dimmed());
    screen.rule("╚", "╝");
    screen.out
}

fn tab_bar(active: Tab) -> String {
    Tab::ALL
        .iter()
        .enumerate()
        .map(|(i, tab)| {
            let label = format!("{} {}", i + 1, tab.title());
            if *tab == active {
                label.black().on_bright_cyan().to_string()
            } else {
                label.bright_white().to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn controls(tab: Tab) -> &'static str {
    match tab {
        Tab::Access => "↑↓ Move | A Approve | D Deny | Tab/1-4 Switch | Q Exit",
        Tab::Network => "↑↓ Move | Enter Inspect | Tab/1-4 Switch | Q Exit",
        _ => "Tab/1-4 Switch | Q Exit",
    }
}

fn dashboard(screen: &mut Screen, snapshot: &Snapshot) {
    let summary = Summary::from_snapshot(snapshot);
    let average = summary
        .average_risk
        .map(|avg| format!("{:.0}%", avg))
        .unwrap_or_else(|| "n/a".to_string());

    screen.row(format!(
        "{} {}   {} {}   {} {}",
        "Pending:".bright_cyan(),
        summary.pending.to_string().bright_yellow().bold(),
        "Approved:".bright_cyan(),
        summary.approved.to_string().bright_green().bold(),
        "Blocked:".bright_cyan(),
        summary.blocked().to_string().bright_red().bold(),
    ));
    screen.row(format!(
        "{} {} (avg {})",
        "Risk level:".bright_cyan(),
        risk_band_label(summary.risk_level),
        average
    ));
    screen.rule("╠", "╣");
    screen.row("Recent Access Requests".bold());
    let requests = recent_requests(snapshot);
    if requests.is_empty() {
        screen.row("  waiting for traffic...".dimmed());
    }
    for request in requests {
        screen.row(format!(
            "  {} → {}  risk {}%  {}  {}",
            request.user,
            request.resource.dimmed(),
            request.risk_score,
            request.location.dimmed(),
            status_label(request.status)
        ));
    }
    screen.rule("╠", "╣");
    screen.row("Security Events".bold());
    let events = recent_events(snapshot);
    if events.is_empty() {
        screen.row("  no events yet".dimmed());
    }
    for event in events {
        screen.row(format!(
            "  {} {}  {}  {}",
            event_marker(event.kind),
            event.message,
            severity_label(event.severity),
            event.timestamp.format("%H:%M:%S").to_string().dimmed()
        ));
    }
}

fn network(screen: &mut Screen, snapshot: &Snapshot, cursor: usize) {
    screen.row("Network Topology".bold());
    for (i, node) in snapshot.nodes.iter().enumerate() {
        let selected = snapshot.selected_node.as_deref() == Some(node.id.as_str());
        let pointer = if i == cursor { "▶" } else { " " };
        let mark = if selected { "*".bright_cyan().bold().to_string() } else { " ".to_string() };
        screen.row(format!(
            "{}{} {:<18} {:<12} {}",
            pointer,
            mark,
            node.name,
            node_kind_label(node.kind),
            node_status_label(node.status)
        ));
    }
    screen.rule("╠", "╣");
    match snapshot.selected_details() {
        Some(details) => {
            screen.row(format!("{} {}", "Node Details:".bold(), details.name));
            screen.row(format!(
                "  Type: {}   Status: {}",
                details.kind,
                node_status_label(details.status)
            ));
            screen.row(format!(
                "  Connections: {}   Access Level: {}",
                details.connection_count, details.access_level
            ));
            if let Some(node) = snapshot.selected() {
                screen.row(format!("  Links to: {}", connection_names(snapshot, node)).dimmed());
            }
        }
        None => screen.row("Select a node to inspect it".dimmed()),
    }
}

fn connection_names(snapshot: &Snapshot, node: &NetworkNode) -> String {
    if node.connections.is_empty() {
        return "none".to_string();
    }
    node.connections
        .iter()
        .map(|id| {
            snapshot
                .nodes
                .iter()
                .find(|n| &n.id == id)
                .map(|n| n.name.clone())
                .unwrap_or_else(|| id.clone())
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn access(screen: &mut Screen, snapshot: &Snapshot, cursor: usize) {
    screen.row("Access Control Requests".bold());
    if snapshot.requests.is_empty() {
        screen.row("  waiting for traffic...".dimmed());
    }
    for (i, request) in snapshot.requests.iter().enumerate() {
        let pointer = if i == cursor { "▶" } else { " " };
        screen.row(format!(
            "{} {:<13} {}  {}",
            pointer,
            request.user,
            truncate(&request.resource, 17),
            status_label(request.status)
        ));
        if i == cursor {
            request_detail(screen, request);
        }
    }
}

fn request_detail(screen: &mut Screen, request: &AccessRequest) {
    screen.row(format!(
        "    {} {}  {} {}  {} {}",
        "Location:".dimmed(),
        request.location,
        "Risk:".dimmed(),
        risk_label(request.risk_score),
        "Time:".dimmed(),
        request.timestamp.format("%H:%M:%S")
    ));
    if let Some(ref reason) = request.reason {
        screen.row(format!("    {} {}", "Reason:".dimmed(), reason));
    }
}

fn events(screen: &mut Screen, snapshot: &Snapshot) {
    screen.row("Security Event Log".bold());
    if snapshot.events.is_empty() {
        screen.row("  no events yet".dimmed());
    }
    for event in &snapshot.events {
        event_rows(screen, event);
    }
}

fn event_rows(screen: &mut Screen, event: &SecurityEvent) {
    screen.row(format!(
        "{} {} event  {}",
        event_marker(event.kind),
        capitalize(&event.kind.to_string()),
        severity_label(event.severity)
    ));
    screen.row(format!("    {}", event.message));
    screen.row(
        format!(
            "    Time: {}  ID: {}",
            event.timestamp.format("%Y-%m-%d %H:%M:%S"),
            event.id
        )
        .dimmed(),
    );
}

fn notification_line(note: &Notification) -> String {
    match note.style {
        NotificationStyle::Info => format!("✓ {}: {}", note.title.bold(), note.description).bright_green().to_string(),
        NotificationStyle::Alert => format!("✗ {}: {}", note.title.bold(), note.description).bright_red().to_string(),
    }
}

pub fn status_label(status: RequestStatus) -> ColoredString {
    let text = status.to_string();
    match status {
        RequestStatus::Approved => text.bright_green().bold(),
        RequestStatus::Denied => text.bright_red().bold(),
        RequestStatus::Pending => text.bright_yellow(),
    }
}

pub fn severity_label(severity: Severity) -> ColoredString {
    let text = severity.to_string();
    match severity {
        Severity::Critical => text.white().on_red().bold(),
        Severity::High => text.bright_red(),
        Severity::Medium => text.bright_yellow(),
        Severity::Low => text.bright_green(),
    }
}

fn risk_label(score: u8) -> ColoredString {
    let text = format!("{}%", score);
    match RiskBand::of(score) {
        RiskBand::High => text.bright_red().bold(),
        RiskBand::Medium => text.bright_yellow(),
        RiskBand::Low => text.bright_green(),
    }
}

fn risk_band_label(band: RiskBand) -> ColoredString {
    let text = band.to_string();
    match band {
        RiskBand::High => text.bright_red().bold(),
        RiskBand::Medium => text.bright_yellow().bold(),
        RiskBand::Low => text.bright_green().bold(),
    }
}

fn event_marker(kind: EventKind) -> ColoredString {
    match kind {
        EventKind::Threat => "⚠".bright_red(),
        EventKind::Access => "◉".bright_blue(),
        EventKind::Policy => "⛨".bright_yellow(),
    }
}

fn node_kind_label(kind: NodeKind) -> String {
    capitalize(&kind.to_string())
}

pub fn node_status_label(status: NodeStatus) -> ColoredString {
    let text = status.to_string();
    match status {
        NodeStatus::Secure => text.bright_green(),
        NodeStatus::Compromised => text.bright_red().bold(),
        NodeStatus::Unknown => text.bright_yellow(),
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        format!("{:<width$}", s, width = max_len)
    } else {
        let cut: String = s.chars().take(max_len.saturating_sub(1)).collect();
        format!("{}…", cut)
    }
}

/// Visible width, skipping ANSI escape sequences.
pub fn display_width(s: &str) -> usize {
    let mut width = 0;
    let mut in_escape = false;
    for ch in s.chars() {
        if in_escape {
            if ch.is_ascii_alphabetic() {
                in_escape = false;
            }
        } else if ch == '\x1b' {
            in_escape = true;
        } else {
            width += 1;
        }
    }
    width
}

/// Cuts `s` to `max` visible characters, keeping escape sequences intact.
fn truncate_visible(s: &str, max: usize) -> String {
    if display_width(s) <= max {
        return s.to_string();
    }
    let mut out = String::new();
    let mut width = 0;
    let mut in_escape = false;
    for ch in s.chars() {
        if in_escape {
            out.push(ch);
            if ch.is_ascii_alphabetic() {
                in_escape = false;
            }
        } else if ch == '\x1b' {
            in_escape = true;
            out.push(ch);
        } else if width < max {
            out.push(ch);
            width += 1;
        }
    }
    out.push_str("\x1b[0m");
    out
}
