//! Formatting of captured game output into group replies.

use chatbridge_core::registry::CommandKind;
use chatbridge_core::types::{Reply, code_block, colors};

/// How a capture is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Lines verbatim in a code block.
    Raw,
    /// Ranked faction values, one field per faction.
    FactionTop,
}

impl OutputFormat {
    /// Formatter for a command, if it consumes buffered output at all.
    #[must_use]
    pub fn for_command(kind: CommandKind) -> Option<Self> {
        if !kind.descriptor().consumes_buffered_output {
            return None;
        }
        Some(match kind {
            CommandKind::Ftop => Self::FactionTop,
            _ => Self::Raw,
        })
    }

    /// Render `lines` into `reply`.
    pub fn apply(self, lines: &[String], reply: &mut Reply) {
        match self {
            Self::Raw => render_raw(lines, reply),
            Self::FactionTop => render_faction_top(lines, reply),
        }
    }
}

fn render_raw(lines: &[String], reply: &mut Reply) {
    if lines.is_empty() {
        reply.description = Some("No output received from the server".into());
    } else {
        reply.description = Some(code_block(lines));
    }
}

/// One parsed faction top entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactionEntry {
    /// Position in the listing.
    pub rank: u32,
    /// Faction name.
    pub name: String,
    /// Value as printed, currency sign included.
    pub value: String,
}

/// Parse one line of faction top output, e.g. `1. Wolves - $1,234,567`.
#[must_use]
pub fn parse_ftop_line(line: &str) -> Option<FactionEntry> {
    let line = line.trim().trim_start_matches('#');
    let digits_end = line.find(|c: char| !c.is_ascii_digit()).unwrap_or(line.len());
    if digits_end == 0 {
        return None;
    }
    let rank = line[..digits_end].parse().ok()?;
    let rest = line[digits_end..].trim_start_matches(['.', ')', ':']).trim();

    let dollar = rest.find('$')?;
    let name = rest[..dollar].trim_end_matches([' ', '-', ':']).trim();
    if name.is_empty() {
        return None;
    }
    let value = rest[dollar..].split_whitespace().next()?.to_string();
    Some(FactionEntry {
        rank,
        name: name.to_string(),
        value,
    })
}

fn render_faction_top(lines: &[String], reply: &mut Reply) {
    let entries: Vec<FactionEntry> = lines.iter().filter_map(|l| parse_ftop_line(l)).collect();
    if entries.is_empty() {
        render_raw(lines, reply);
        return;
    }
    reply.title = Some("Faction Top".into());
    reply.color = Some(colors::INFO);
    for entry in entries {
        reply.push_field(format!("#{} {}", entry.rank, entry.name), entry.value, false);
    }
}
