//! # NSCG Schedule Core Library
//!
//! This library holds the schedule data model synced from the phone and the
//! merge engine that every watch surface (complication, tile timeline, CLI)
//! uses to decide what to show.
//!
//! ## Design Philosophy
//!
//! ### One merge engine
//! Lessons and exams arrive as two independent, loosely-typed timetables.
//! [`merger`] turns them into a single ordered list of [`merger::Event`]s and
//! answers two questions about it:
//! - **Point pick**: what is on right now, and what comes after it
//! - **Segmentation**: over which sub-ranges of a window that answer is constant
//!
//! Exams always outrank lessons that run at the same time. Once an item ends the
//! display moves straight on to the next item; it never lingers on a finished one.
//!
//! ### Pure and clock-free
//! The engine never reads the system clock. Callers pass a snapshot instant and
//! a time zone, so identical inputs always produce identical output and tests
//! can pin any moment they like.
//!
//! ### Tolerant input
//! Dates and times come from a scraped college portal and are inconsistent
//! ("9:30AM", "09:30", "9:30\u{a0}am", "Monday 12/09/2025", "12-06-2025").
//! Anything that cannot be parsed is dropped from the merge instead of failing it.
//!
//! ## Data Flow
//! 1. **Sync**: phone payload → [`store::FileStore`] → cached JSON on disk
//! 2. **Merge**: [`Timetable`] + [`ExamTimetable`] → [`merger::build_events`]
//! 3. **Select**: [`merger::pick`] / [`merger::build_display_segments`]
//! 4. **Present**: [`summary`] text and [`renderer`] timeline

use serde::{Deserialize, Serialize};

pub mod config;
pub mod merger;
pub mod renderer;
pub mod store;
pub mod summary;
pub mod time_parse;

/// A single timetabled lesson.
///
/// Start and end are kept as the raw strings the portal produced; they are
/// parsed by [`time_parse::parse_time_of_day`] whenever events are built.
///
/// # Example
/// ```
/// use nscg_schedule_lib::Lesson;
///
/// let lesson = Lesson {
///     teachers: vec!["A. Smith".to_string()],
///     course: "CS101".to_string(),
///     group: "G1".to_string(),
///     name: "Computing".to_string(),
///     start_time: "9:30AM".to_string(),
///     end_time: "10:45AM".to_string(),
///     room: "TG00".to_string(),
/// };
///
/// assert_eq!(lesson.parsed_start_time().unwrap().to_string(), "09:30:00");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Lesson {
    pub teachers: Vec<String>,
    pub course: String,
    pub group: String,
    pub name: String,
    pub start_time: String,
    pub end_time: String,
    pub room: String,
}

impl Lesson {
    pub fn parsed_start_time(&self) -> Option<chrono::NaiveTime> {
        time_parse::parse_time_of_day(&self.start_time)
    }

    pub fn parsed_end_time(&self) -> Option<chrono::NaiveTime> {
        time_parse::parse_time_of_day(&self.end_time)
    }
}

/// One labelled day of lessons.
///
/// The label is either weekday-only ("Monday") or carries an explicit date
/// ("Monday 12/09/2025").
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaySchedule {
    pub day: String,
    pub lessons: Vec<Lesson>,
}

impl DaySchedule {
    /// First word of the label, e.g. "Monday" from "Monday 09/12/2025".
    pub fn day_name(&self) -> &str {
        self.day.split_whitespace().next().unwrap_or(&self.day)
    }
}

/// The weekly lesson timetable.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timetable {
    pub days: Vec<DaySchedule>,
}

impl Timetable {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse a timetable from its JSON form, returning `None` when malformed.
    pub fn from_json_str(json: &str) -> Option<Self> {
        serde_json::from_str(json).ok()
    }

    pub fn to_json_string(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Candidate details attached to an exam timetable. Not used by the merge.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StudentInfo {
    pub ref_no: String,
    pub name: String,
    pub date_of_birth: String,
    pub uln: String,
    pub candidate_no: String,
}

/// A single exam sitting.
///
/// `date` is `DD-MM-YYYY`, `DD/MM/YYYY` or `YYYY-MM-DD`; the times follow the
/// same tolerant rules as lesson times.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Exam {
    pub date: String,
    pub board_code: String,
    pub paper: String,
    pub start_time: String,
    pub finish_time: String,
    pub subject_description: String,
    pub pre_room: String,
    pub exam_room: String,
    pub seat_number: String,
    pub additional: String,
}

impl Exam {
    pub fn parsed_date(&self) -> Option<chrono::NaiveDate> {
        time_parse::parse_exam_date(&self.date)
    }

    pub fn parsed_start_time(&self) -> Option<chrono::NaiveTime> {
        time_parse::parse_time_of_day(&self.start_time)
    }

    pub fn parsed_finish_time(&self) -> Option<chrono::NaiveTime> {
        time_parse::parse_time_of_day(&self.finish_time)
    }

    /// First two words of the subject, short enough for a complication.
    pub fn short_description(&self) -> String {
        self.subject_description
            .split_whitespace()
            .take(2)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// The exam timetable as synced from the phone.
///
/// `warning_message` is passed through untouched for the UI.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExamTimetable {
    pub has_exams: bool,
    pub student_info: Option<StudentInfo>,
    pub exams: Vec<Exam>,
    pub warning_message: Option<String>,
}

impl ExamTimetable {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse an exam timetable from its JSON form, returning `None` when malformed.
    pub fn from_json_str(json: &str) -> Option<Self> {
        serde_json::from_str(json).ok()
    }

    pub fn to_json_string(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lesson_json_uses_camel_case() {
        let json = r#"{
            "teachers": ["A. Smith", "B. Jones"],
            "course": "CS101",
            "group": "G1",
            "name": "Computing",
            "startTime": "9:30AM",
            "endTime": "10:45AM",
            "room": "TG00"
        }"#;

        let lesson: Lesson = serde_json::from_str(json).unwrap();
        assert_eq!(lesson.teachers.len(), 2);
        assert_eq!(lesson.start_time, "9:30AM");
        assert_eq!(lesson.end_time, "10:45AM");
    }

    #[test]
    fn test_missing_fields_default_to_empty() {
        let exam: Exam = serde_json::from_str(r#"{"date": "12-06-2025"}"#).unwrap();
        assert_eq!(exam.date, "12-06-2025");
        assert_eq!(exam.exam_room, "");

        let exams = ExamTimetable::from_json_str("{}").unwrap();
        assert!(!exams.has_exams);
        assert!(exams.exams.is_empty());
        assert!(exams.student_info.is_none());
    }

    #[test]
    fn test_malformed_json_is_none() {
        assert!(Timetable::from_json_str("{not json").is_none());
        assert!(ExamTimetable::from_json_str("[1, 2").is_none());
    }

    #[test]
    fn test_day_name_and_short_description() {
        let day = DaySchedule {
            day: "Monday 09/12/2025".to_string(),
            lessons: vec![],
        };
        assert_eq!(day.day_name(), "Monday");

        let exam = Exam {
            subject_description: "Mathematics Paper 1 Calculator".to_string(),
            ..Exam::default()
        };
        assert_eq!(exam.short_description(), "Mathematics Paper");
    }

    #[test]
    fn test_exam_timetable_keeps_warning() {
        let exams = ExamTimetable {
            has_exams: true,
            student_info: None,
            exams: vec![],
            warning_message: Some("Provisional".to_string()),
        };
        let json = exams.to_json_string().unwrap();
        assert!(json.contains("warningMessage"));
        assert_eq!(ExamTimetable::from_json_str(&json).unwrap(), exams);
    }
}
