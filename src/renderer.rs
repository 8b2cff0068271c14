//! # Timeline Rendering
//!
//! Renders the tile timeline to a terminal for development and for the CLI.
//! The bar spans the whole window; each column takes the state of the segment
//! covering its start instant, and the current instant is marked with `X`.
//!
//! ```text
//! ··········████████······▓▓▓▓▓▓▓▓▓▓
//!               X
//! 09:00-10:00  NOW: Computing
//! ```

use crate::config::DisplayConfig;
use crate::merger::{DisplaySegment, EventKind};
use crate::summary::{timeline_entries, TimelineEntry};
use chrono::{DateTime, TimeZone, Utc};

const LESSON_ACTIVE: char = '█';
const EXAM_ACTIVE: char = '▓';
const UPCOMING: char = '·';
const EMPTY: char = ' ';
const NOW_MARKER: char = 'X';

/// Render segments over `[window_start, window_end)` as an ASCII bar plus one
/// line per timeline entry, with times shown in `zone`.
pub fn render_ascii<Tz: TimeZone>(
    segments: &[DisplaySegment<'_>],
    has_events: bool,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
    now: DateTime<Utc>,
    zone: &Tz,
    display: &DisplayConfig,
) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let mut out = String::new();
    if window_end <= window_start {
        return out;
    }

    let width = display.width.max(1);
    let span_secs = (window_end - window_start).num_seconds().max(1);
    let column_start = |col: usize| {
        window_start + chrono::Duration::seconds(span_secs * col as i64 / width as i64)
    };

    let bar: String = (0..width)
        .map(|col| {
            let t = column_start(col);
            segments
                .iter()
                .find(|seg| seg.start <= t && t < seg.end)
                .map_or(EMPTY, segment_char)
        })
        .collect();
    out.push_str(&bar);
    out.push('\n');

    if window_start <= now && now < window_end {
        let col = ((now - window_start).num_seconds() * width as i64 / span_secs) as usize;
        out.push_str(&" ".repeat(col.min(width - 1)));
        out.push(NOW_MARKER);
    }
    out.push('\n');

    let entries = timeline_entries(segments, has_events);
    for entry in entries.iter().take(display.max_segments) {
        out.push_str(&entry_line(entry, zone));
        out.push('\n');
    }
    if entries.len() > display.max_segments {
        out.push_str(&format!(
            "... {} more segments\n",
            entries.len() - display.max_segments
        ));
    }

    out
}

/// Print the rendered timeline to stdout.
pub fn draw_ascii<Tz: TimeZone>(
    segments: &[DisplaySegment<'_>],
    has_events: bool,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
    now: DateTime<Utc>,
    zone: &Tz,
    display: &DisplayConfig,
) where
    Tz::Offset: std::fmt::Display,
{
    let out = render_ascii(segments, has_events, window_start, window_end, now, zone, display);
    print!("{out}");
}

fn segment_char(seg: &DisplaySegment<'_>) -> char {
    match seg.display {
        Some(event) if seg.is_display_active => match event.kind() {
            EventKind::Lesson => LESSON_ACTIVE,
            EventKind::Exam => EXAM_ACTIVE,
        },
        Some(_) => UPCOMING,
        None => EMPTY,
    }
}

fn entry_line<Tz: TimeZone>(entry: &TimelineEntry, zone: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let start = entry.start.with_timezone(zone).format("%a %H:%M");
    let end = entry.end.with_timezone(zone).format("%H:%M");
    let mut line = format!("{start}-{end}  {}", entry.headline);
    if !entry.detail.is_empty() {
        line.push_str(&format!("  ({})", entry.detail));
    }
    if let Some(next) = &entry.next_line {
        line.push_str(&format!("  | {next}"));
    }
    line
}
