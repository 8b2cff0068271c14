//! # Display Summaries
//!
//! Text for the small watch surfaces, derived only from the merge engine's
//! answers. A complication shows one [`ComplicationSummary`]; the tile shows a
//! list of [`TimelineEntry`]s, one per display segment.

use crate::merger::{DisplaySegment, Event, EventKind, Pick};
use chrono::{DateTime, Utc};

/// Placeholder shown after the last event of a window when data exists.
pub const DONE_FOR_TODAY: &str = "You're done for today!";

/// Placeholder shown when nothing has been synced at all.
pub const NO_DATA: &str = "No schedule data";

/// Text for a short- and long-text complication.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComplicationSummary {
    pub short_text: String,
    pub long_title: String,
    pub long_text: String,
    pub content_description: String,
    /// The summary goes stale when the displayed event ends.
    pub valid_until: Option<DateTime<Utc>>,
}

impl ComplicationSummary {
    pub fn from_pick(pick: &Pick<'_>) -> Self {
        let Some(event) = pick.display() else {
            return ComplicationSummary {
                short_text: "NSCG".to_string(),
                long_title: "NSCG Schedule".to_string(),
                long_text: "No upcoming events".to_string(),
                content_description: "No upcoming lessons or exams".to_string(),
                valid_until: None,
            };
        };

        let start = event.raw_start_time();
        match event.kind() {
            EventKind::Lesson => ComplicationSummary {
                short_text: event.room().to_string(),
                long_title: event.room().to_string(),
                long_text: start.to_string(),
                content_description: format!(
                    "Next lesson: {} at {start} in {}",
                    event.title(),
                    event.room()
                ),
                valid_until: Some(event.end),
            },
            EventKind::Exam => {
                let room = short_room(event.room());
                ComplicationSummary {
                    long_title: format!("EXAM - {room}"),
                    short_text: room,
                    long_text: start.to_string(),
                    content_description: format!(
                        "Next exam: {} at {start} in {}",
                        event.title(),
                        event.room()
                    ),
                    valid_until: Some(event.end),
                }
            }
        }
    }
}

/// One tile state, valid over `[start, end)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimelineEntry {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub headline: String,
    pub detail: String,
    pub next_line: Option<String>,
}

/// Turn display segments into tile entries.
///
/// `has_events` says whether the merge produced anything at all; it decides
/// between the "done for today" and "no data" placeholders for empty segments.
pub fn timeline_entries(segments: &[DisplaySegment<'_>], has_events: bool) -> Vec<TimelineEntry> {
    segments
        .iter()
        .map(|seg| match seg.display {
            Some(event) => TimelineEntry {
                start: seg.start,
                end: seg.end,
                headline: headline(event, seg.is_display_active),
                detail: detail(event),
                next_line: seg.next.map(|n| format!("Next: {} {}", n.raw_start_time(), n.title())),
            },
            None => TimelineEntry {
                start: seg.start,
                end: seg.end,
                headline: (if has_events { DONE_FOR_TODAY } else { NO_DATA }).to_string(),
                detail: String::new(),
                next_line: None,
            },
        })
        .collect()
}

/// Relative start label: "Starting", "in 25m", "in 2h".
pub fn time_until(start: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let minutes = (start - now).num_minutes();
    match minutes {
        m if m < 1 => "Starting".to_string(),
        m if m < 60 => format!("in {m}m"),
        m => format!("in {}h", m / 60),
    }
}

/// First token of a room string with punctuation removed, e.g. "B123" from
/// "B123 1st Floor".
pub fn short_room(room: &str) -> String {
    room.split_whitespace()
        .next()
        .map(|token| token.chars().filter(|c| c.is_alphanumeric()).collect())
        .unwrap_or_default()
}

fn headline(event: &Event, active: bool) -> String {
    let prefix = match (event.kind(), active) {
        (EventKind::Exam, true) => "EXAM NOW",
        (EventKind::Exam, false) => "EXAM",
        (EventKind::Lesson, true) => "NOW",
        (EventKind::Lesson, false) => "NEXT",
    };
    format!("{prefix}: {}", event.title())
}

fn detail(event: &Event) -> String {
    match event.exam() {
        Some(exam) if !exam.seat_number.is_empty() => format!(
            "{} {} seat {}",
            event.raw_start_time(),
            event.room(),
            exam.seat_number
        ),
        _ => format!("{} {}", event.raw_start_time(), event.room()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merger::EventItem;
    use crate::{Exam, Lesson};
    use chrono::{Duration, TimeZone};

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 8, h, m, 0).unwrap()
    }

    fn lesson_event() -> Event {
        Event {
            start: at(9, 0),
            end: at(10, 0),
            item: EventItem::Lesson(Lesson {
                name: "Computing".to_string(),
                start_time: "9:00AM".to_string(),
                end_time: "10:00AM".to_string(),
                room: "TG00".to_string(),
                ..Lesson::default()
            }),
            source_label: "lesson:Monday".to_string(),
        }
    }

    fn exam_event() -> Event {
        Event {
            start: at(13, 0),
            end: at(15, 0),
            item: EventItem::Exam(Exam {
                start_time: "1:00PM".to_string(),
                subject_description: "Physics Paper 2".to_string(),
                exam_room: "B123 1st Floor".to_string(),
                seat_number: "42".to_string(),
                ..Exam::default()
            }),
            source_label: "exam:08-09-2025".to_string(),
        }
    }

    #[test]
    fn test_short_room() {
        assert_eq!(short_room("B123 1st Floor"), "B123");
        assert_eq!(short_room("TG00"), "TG00");
        assert_eq!(short_room("  (A1), east"), "A1");
        assert_eq!(short_room(""), "");
    }

    #[test]
    fn test_time_until() {
        assert_eq!(time_until(at(9, 0), at(9, 0)), "Starting");
        assert_eq!(time_until(at(9, 0), at(9, 30)), "Starting");
        assert_eq!(time_until(at(9, 25), at(9, 0)), "in 25m");
        assert_eq!(time_until(at(11, 59), at(9, 0)), "in 2h");
        assert_eq!(
            time_until(at(9, 0) + Duration::seconds(59), at(9, 0)),
            "Starting"
        );
    }

    #[test]
    fn test_lesson_complication() {
        let lesson = lesson_event();
        let pick = Pick {
            current: Some(&lesson),
            next: None,
        };
        let summary = ComplicationSummary::from_pick(&pick);
        assert_eq!(summary.short_text, "TG00");
        assert_eq!(summary.long_title, "TG00");
        assert_eq!(summary.long_text, "9:00AM");
        assert_eq!(summary.valid_until, Some(at(10, 0)));
        assert!(summary.content_description.contains("Computing"));
    }

    #[test]
    fn test_exam_complication_uses_short_room() {
        let exam = exam_event();
        let pick = Pick {
            current: None,
            next: Some(&exam),
        };
        let summary = ComplicationSummary::from_pick(&pick);
        assert_eq!(summary.short_text, "B123");
        assert_eq!(summary.long_title, "EXAM - B123");
        assert_eq!(summary.long_text, "1:00PM");
        assert_eq!(
            summary.content_description,
            "Next exam: Physics Paper 2 at 1:00PM in B123 1st Floor"
        );
    }

    #[test]
    fn test_empty_complication() {
        let summary = ComplicationSummary::from_pick(&Pick {
            current: None,
            next: None,
        });
        assert_eq!(summary.short_text, "NSCG");
        assert_eq!(summary.long_text, "No upcoming events");
        assert!(summary.valid_until.is_none());
    }

    #[test]
    fn test_timeline_entries() {
        let lesson = lesson_event();
        let exam = exam_event();
        let segments = vec![
            DisplaySegment {
                start: at(9, 0),
                end: at(10, 0),
                display: Some(&lesson),
                next: Some(&exam),
                is_display_active: true,
            },
            DisplaySegment {
                start: at(10, 0),
                end: at(13, 0),
                display: Some(&exam),
                next: None,
                is_display_active: false,
            },
            DisplaySegment {
                start: at(15, 0),
                end: at(23, 0),
                display: None,
                next: None,
                is_display_active: false,
            },
        ];

        let entries = timeline_entries(&segments, true);
        assert_eq!(entries[0].headline, "NOW: Computing");
        assert_eq!(entries[0].detail, "9:00AM TG00");
        assert_eq!(
            entries[0].next_line.as_deref(),
            Some("Next: 1:00PM Physics Paper 2")
        );
        assert_eq!(entries[1].headline, "EXAM: Physics Paper 2");
        assert_eq!(entries[1].detail, "1:00PM B123 1st Floor seat 42");
        assert_eq!(entries[2].headline, DONE_FOR_TODAY);

        let entries = timeline_entries(&segments[2..], false);
        assert_eq!(entries[0].headline, NO_DATA);
    }
}
