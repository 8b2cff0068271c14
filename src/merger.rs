//! # Schedule Merge Engine
//!
//! Turns the lesson timetable and exam timetable into one ordered list of
//! [`Event`]s and answers the two questions every watch surface asks of it.
//!
//! ## Rules
//!
//! - Lessons and exams are ordered by absolute start time.
//! - When intervals overlap, exams win.
//! - When an item ends the display moves to the next item; it never keeps
//!   showing a finished item through a gap.
//!
//! ## Canonical Order
//!
//! Events sort by start ascending, then priority descending (an exam sorts
//! before a lesson starting at the same instant), then end ascending. Every
//! selection below resolves ties with this order, so all surfaces agree on what
//! is showing.
//!
//! ## Purity
//!
//! Nothing here reads the clock or touches storage. Given the same inputs the
//! output is identical, which the segment collapse step relies on.

use crate::{time_parse, DaySchedule, Exam, ExamTimetable, Lesson, Timetable};
use chrono::{DateTime, Days, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use std::cmp::{Ordering, Reverse};

/// How far in the past an event may have ended and still be built.
///
/// Keeps an item that is finishing right now from vanishing at the query
/// instant without accumulating history.
pub const END_GRACE_MINUTES: i64 = 6;

/// Default look-ahead used by the watch surfaces.
pub const DEFAULT_HORIZON_DAYS: i64 = 14;

/// Which kind of timetable entry an event came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    Lesson,
    Exam,
}

/// The timetable entry behind an event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EventItem {
    Lesson(Lesson),
    Exam(Exam),
}

/// A lesson or exam resolved to absolute instants.
///
/// `end` is exclusive. Events are rebuilt from source data on every query and
/// never stored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Event {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub item: EventItem,
    /// Where the event came from, for diagnostics only.
    pub source_label: String,
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self.item {
            EventItem::Lesson(_) => EventKind::Lesson,
            EventItem::Exam(_) => EventKind::Exam,
        }
    }

    /// Exams outrank lessons.
    pub fn priority(&self) -> u8 {
        match self.kind() {
            EventKind::Exam => 2,
            EventKind::Lesson => 1,
        }
    }

    pub fn is_active_at(&self, t: DateTime<Utc>) -> bool {
        self.start <= t && t < self.end
    }

    pub fn lesson(&self) -> Option<&Lesson> {
        match &self.item {
            EventItem::Lesson(lesson) => Some(lesson),
            EventItem::Exam(_) => None,
        }
    }

    pub fn exam(&self) -> Option<&Exam> {
        match &self.item {
            EventItem::Exam(exam) => Some(exam),
            EventItem::Lesson(_) => None,
        }
    }

    /// Human-readable name: lesson name or exam subject.
    pub fn title(&self) -> &str {
        match &self.item {
            EventItem::Lesson(lesson) => &lesson.name,
            EventItem::Exam(exam) => &exam.subject_description,
        }
    }

    /// Room the student needs to be in.
    pub fn room(&self) -> &str {
        match &self.item {
            EventItem::Lesson(lesson) => &lesson.room,
            EventItem::Exam(exam) => &exam.exam_room,
        }
    }

    /// The start time exactly as the portal wrote it.
    pub fn raw_start_time(&self) -> &str {
        match &self.item {
            EventItem::Lesson(lesson) => &lesson.start_time,
            EventItem::Exam(exam) => &exam.start_time,
        }
    }
}

/// What is on now and what follows it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pick<'a> {
    pub current: Option<&'a Event>,
    pub next: Option<&'a Event>,
}

impl<'a> Pick<'a> {
    /// The event a surface should show: the current one, else the next.
    pub fn display(&self) -> Option<&'a Event> {
        self.current.or(self.next)
    }
}

/// A sub-range `[start, end)` of a window over which the display is constant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DisplaySegment<'a> {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub display: Option<&'a Event>,
    pub next: Option<&'a Event>,
    /// Whether `display` is in progress (as opposed to upcoming).
    pub is_display_active: bool,
}

impl DisplaySegment<'_> {
    fn shows_same_as(&self, other: &Self) -> bool {
        self.display == other.display
            && self.next == other.next
            && self.is_display_active == other.is_display_active
    }
}

/// Build the unified, canonically ordered event list.
///
/// Lessons take their date from the day label when it carries one (e.g.
/// "Monday 09/12/2025"), otherwise from the next occurrence of the weekday.
/// Exams are included whether upcoming or in progress. Anything that fails to
/// parse, has `end <= start`, lies beyond the horizon or ended more than
/// [`END_GRACE_MINUTES`] ago is skipped.
///
/// # Example
/// ```
/// use chrono::{TimeZone, Utc};
/// use nscg_schedule_lib::merger::build_events;
///
/// let now = Utc.with_ymd_and_hms(2025, 9, 8, 9, 0, 0).unwrap();
/// let events = build_events(None, None, now, &Utc, 14);
/// assert!(events.is_empty());
/// ```
pub fn build_events<Tz: TimeZone>(
    timetable: Option<&Timetable>,
    exam_timetable: Option<&ExamTimetable>,
    now: DateTime<Utc>,
    zone: &Tz,
    horizon_days: i64,
) -> Vec<Event> {
    let today = now.with_timezone(zone).date_naive();
    let horizon_end = last_horizon_date(today, horizon_days);
    let cutoff = now - Duration::minutes(END_GRACE_MINUTES);

    let mut events = Vec::new();

    for day in timetable.into_iter().flat_map(|t| &t.days) {
        lesson_events(day, today, horizon_end, cutoff, zone, &mut events);
    }

    for exam in exam_timetable.into_iter().flat_map(|t| &t.exams) {
        if let Some(event) = exam_event(exam, horizon_end, cutoff, zone) {
            events.push(event);
        }
    }

    sort_events(&mut events);

    log::debug!("Built events: count={}, now={now}", events.len());
    for (idx, event) in events.iter().take(12).enumerate() {
        log::debug!(
            "Event[{idx}] kind={:?} start={} end={} title='{}' room='{}' src='{}'",
            event.kind(),
            event.start,
            event.end,
            event.title(),
            event.room(),
            event.source_label
        );
    }

    events
}

/// Pick the current event at `now` and the one that follows it.
///
/// "Next" is measured from the end of the current event when there is one,
/// so a surface never falls back to something already superseded.
pub fn pick(events: &[Event], now: DateTime<Utc>) -> Pick<'_> {
    let current = pick_current(events, now);
    let next = match current {
        Some(event) => pick_next_after(events, event.end),
        None => pick_next_after(events, now),
    };

    log::debug!(
        "Pick: now={now} current={:?} next={:?}",
        current.map(Event::kind),
        next.map(Event::kind)
    );

    Pick { current, next }
}

/// Partition `[window_start, window_end)` into maximal segments over which the
/// displayed event, its active flag and its follower are all constant.
///
/// Gaps between events show the next event straight away rather than holding
/// on to the previous one.
pub fn build_display_segments(
    events: &[Event],
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
) -> Vec<DisplaySegment<'_>> {
    if window_end <= window_start {
        return Vec::new();
    }

    let in_window = |t: DateTime<Utc>| window_start <= t && t <= window_end;

    // Duplicates are kept; zero-width spans are skipped below.
    let mut bounds = vec![window_start, window_end];
    for event in events {
        if in_window(event.start) {
            bounds.push(event.start);
        }
        if in_window(event.end) {
            bounds.push(event.end);
        }
    }
    bounds.sort();

    let mut segments: Vec<DisplaySegment<'_>> = Vec::new();
    for pair in bounds.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if a >= b {
            continue;
        }

        let display = pick_current(events, a).or_else(|| pick_next_after(events, a));
        let segment = DisplaySegment {
            start: a,
            end: b,
            display,
            next: display.and_then(|event| pick_next_after(events, event.end)),
            is_display_active: display.is_some_and(|event| event.is_active_at(a)),
        };

        if let Some(last) = segments.last_mut() {
            if last.end == segment.start && last.shows_same_as(&segment) {
                last.end = segment.end;
                continue;
            }
        }
        segments.push(segment);
    }

    log::debug!(
        "Display segments: count={}, window=[{window_start}, {window_end})",
        segments.len()
    );
    for (idx, seg) in segments.iter().take(12).enumerate() {
        log::debug!(
            "Seg[{idx}] [{}, {}) display={:?} active={} next={:?}",
            seg.start,
            seg.end,
            seg.display.map(Event::kind),
            seg.is_display_active,
            seg.next.map(Event::kind)
        );
    }

    segments
}

/// Canonical order: start asc, priority desc, end asc.
pub fn canonical_order(a: &Event, b: &Event) -> Ordering {
    a.start
        .cmp(&b.start)
        .then_with(|| b.priority().cmp(&a.priority()))
        .then_with(|| a.end.cmp(&b.end))
}

/// Last date inside the horizon. Negative horizons count as zero; one that runs
/// past the calendar range places no limit.
fn last_horizon_date(today: NaiveDate, horizon_days: i64) -> NaiveDate {
    let days = u64::try_from(horizon_days).unwrap_or(0);
    today.checked_add_days(Days::new(days)).unwrap_or(NaiveDate::MAX)
}

fn sort_events(events: &mut [Event]) {
    events.sort_by(canonical_order);
}

/// Highest-priority active event; ties go to the earliest start, then end.
fn pick_current(events: &[Event], now: DateTime<Utc>) -> Option<&Event> {
    events
        .iter()
        .filter(|event| event.is_active_at(now))
        .min_by_key(|event| (Reverse(event.priority()), event.start, event.end))
}

/// First event in canonical order starting at or after `threshold`.
fn pick_next_after(events: &[Event], threshold: DateTime<Utc>) -> Option<&Event> {
    events
        .iter()
        .filter(|event| event.start >= threshold)
        .min_by(|a, b| canonical_order(a, b))
}

fn lesson_events<Tz: TimeZone>(
    day: &DaySchedule,
    today: NaiveDate,
    horizon_end: NaiveDate,
    cutoff: DateTime<Utc>,
    zone: &Tz,
    events: &mut Vec<Event>,
) {
    let Some(date) = time_parse::resolve_day_date(&day.day, today) else {
        log::debug!("Skipping day (no date): day='{}'", day.day);
        return;
    };
    if date > horizon_end {
        return;
    }

    for lesson in &day.lessons {
        let (Some(start), Some(end)) = (lesson.parsed_start_time(), lesson.parsed_end_time())
        else {
            log::debug!(
                "Lesson time parse failed: name='{}' rawStart='{}' rawEnd='{}' day='{}'",
                lesson.name,
                lesson.start_time,
                lesson.end_time,
                day.day
            );
            continue;
        };
        if end <= start {
            log::debug!(
                "Lesson invalid interval (end<=start): name='{}' start={start} end={end} day='{date}'",
                lesson.name
            );
            continue;
        }

        let Some((start, end)) = resolve_interval(date, start, end, zone) else {
            continue;
        };
        if end < cutoff {
            continue;
        }

        events.push(Event {
            start,
            end,
            item: EventItem::Lesson(lesson.clone()),
            source_label: format!("lesson:{}", day.day),
        });
    }
}

fn exam_event<Tz: TimeZone>(
    exam: &Exam,
    horizon_end: NaiveDate,
    cutoff: DateTime<Utc>,
    zone: &Tz,
) -> Option<Event> {
    let (Some(date), Some(start), Some(finish)) = (
        exam.parsed_date(),
        exam.parsed_start_time(),
        exam.parsed_finish_time(),
    ) else {
        log::debug!(
            "Exam parse failed: subj='{}' rawDate='{}' rawStart='{}' rawFinish='{}'",
            exam.subject_description,
            exam.date,
            exam.start_time,
            exam.finish_time
        );
        return None;
    };
    if date > horizon_end {
        return None;
    }
    if finish <= start {
        log::debug!(
            "Exam invalid interval (finish<=start): subj='{}' start={start} finish={finish} date='{date}'",
            exam.subject_description
        );
        return None;
    }

    let (start, end) = resolve_interval(date, start, finish, zone)?;
    if end < cutoff {
        return None;
    }

    Some(Event {
        start,
        end,
        item: EventItem::Exam(exam.clone()),
        source_label: format!("exam:{}", exam.date),
    })
}

/// Combine a date and two wall-clock times into UTC instants, dropping the
/// interval if the zone shifts make it empty.
fn resolve_interval<Tz: TimeZone>(
    date: NaiveDate,
    start: NaiveTime,
    end: NaiveTime,
    zone: &Tz,
) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let start = to_instant(date.and_time(start), zone)?;
    let end = to_instant(date.and_time(end), zone)?;
    (end > start).then_some((start, end))
}

/// Local wall-clock time to an instant. Ambiguous times take the earlier
/// offset; times inside a DST gap move forward by an hour.
fn to_instant<Tz: TimeZone>(local: NaiveDateTime, zone: &Tz) -> Option<DateTime<Utc>> {
    zone.from_local_datetime(&local)
        .earliest()
        .or_else(|| {
            let shifted = local.checked_add_signed(Duration::hours(1))?;
            zone.from_local_datetime(&shifted).earliest()
        })
        .map(|t| t.with_timezone(&Utc))
}
