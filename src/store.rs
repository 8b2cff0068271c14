//! # Synced Schedule Store
//!
//! This module keeps the last timetable and exam timetable received from the
//! phone so every surface can render without waiting for a sync. The merge
//! engine never touches it; callers read from a store and pass plain data in.
//!
//! ## On-Disk Layout
//!
//! A [`FileStore`] owns one directory:
//! - `timetable.json`: the lesson timetable
//! - `exam_timetable.json`: the exam timetable
//! - `sync_state.json`: when each of the two was last synced
//!
//! ## Sync Payloads
//!
//! The phone sends one JSON envelope that may carry either timetable or both:
//! ```json
//! {
//!   "timetable": { "days": [] },
//!   "timetableUpdated": "2025-09-08T07:00:00",
//!   "examTimetable": { "hasExams": false, "exams": [] },
//!   "examUpdated": "2025-09-08T07:00:00"
//! }
//! ```
//!
//! ## Error Handling
//!
//! A missing or corrupt cache file is logged and treated as "no data" when the
//! store opens. Write failures are returned through [`StoreError`].

use crate::{ExamTimetable, Timetable};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use thiserror::Error;

const TIMETABLE_FILE: &str = "timetable.json";
const EXAM_TIMETABLE_FILE: &str = "exam_timetable.json";
const SYNC_STATE_FILE: &str = "sync_state.json";

/// Errors that can occur while persisting or ingesting schedule data.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Cache file operations failed (permissions, disk space)
    #[error("store IO: {0}")]
    Io(#[from] io::Error),

    /// Payload or cache content was not valid JSON for the expected shape
    #[error("store JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Sync payload carried neither a timetable nor an exam timetable
    #[error("sync payload has no timetable or examTimetable")]
    UnknownPayload,
}

/// Change notifications sent to subscribers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreUpdate {
    Timetable,
    ExamTimetable,
    Cleared,
}

/// Timestamps of the last successful sync of each timetable.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncState {
    pub last_timetable_sync: Option<String>,
    pub last_exam_sync: Option<String>,
}

/// Key-value style access to the latest synced schedule data.
pub trait ScheduleStore {
    fn current_timetable(&self) -> Option<&Timetable>;

    fn current_exam_timetable(&self) -> Option<&ExamTimetable>;

    fn sync_state(&self) -> &SyncState;

    /// Persist a new timetable. `updated` is the phone's sync timestamp; when
    /// absent or empty the local time is recorded instead.
    fn save_timetable(
        &mut self,
        timetable: Timetable,
        updated: Option<&str>,
    ) -> Result<(), StoreError>;

    fn save_exam_timetable(
        &mut self,
        exam_timetable: ExamTimetable,
        updated: Option<&str>,
    ) -> Result<(), StoreError>;

    /// Register for change notifications.
    fn subscribe(&mut self) -> Receiver<StoreUpdate>;

    fn clear(&mut self) -> Result<(), StoreError>;
}

/// Envelope sent by the phone companion app.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SyncPayload {
    timetable: Option<Timetable>,
    timetable_updated: Option<String>,
    exam_timetable: Option<ExamTimetable>,
    exam_updated: Option<String>,
}

/// A [`ScheduleStore`] backed by JSON files in one directory.
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
    timetable: Option<Timetable>,
    exam_timetable: Option<ExamTimetable>,
    sync: SyncState,
    subscribers: Vec<Sender<StoreUpdate>>,
}

impl FileStore {
    /// Open (creating if needed) a store directory and load any cached data.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;

        let store = FileStore {
            timetable: load_cached(&dir.join(TIMETABLE_FILE)),
            exam_timetable: load_cached(&dir.join(EXAM_TIMETABLE_FILE)),
            sync: load_cached(&dir.join(SYNC_STATE_FILE)).unwrap_or_default(),
            subscribers: Vec::new(),
            dir,
        };

        log::debug!(
            "Loaded cached data: timetable={} exams={}",
            store.timetable.is_some(),
            store.exam_timetable.is_some()
        );
        Ok(store)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Apply a sync envelope from the phone, saving whichever timetables it carries.
    ///
    /// Returns the updates that were applied. The timetable is saved before the
    /// exam timetable and each save stands on its own: if the exam save fails,
    /// the timetable stays persisted and subscribers have already been told,
    /// yet the error is still returned. Callers wanting to report a partial
    /// apply should [`subscribe`](ScheduleStore::subscribe) first.
    pub fn ingest_payload(&mut self, json: &str) -> Result<Vec<StoreUpdate>, StoreError> {
        let payload: SyncPayload = serde_json::from_str(json)?;
        let mut applied = Vec::new();

        if let Some(timetable) = payload.timetable {
            let days = timetable.days.len();
            self.save_timetable(timetable, payload.timetable_updated.as_deref())?;
            log::info!("Processed timetable with {days} days");
            applied.push(StoreUpdate::Timetable);
        }

        if let Some(exam_timetable) = payload.exam_timetable {
            let exams = exam_timetable.exams.len();
            self.save_exam_timetable(exam_timetable, payload.exam_updated.as_deref())?;
            log::info!("Processed exam timetable with {exams} exams");
            applied.push(StoreUpdate::ExamTimetable);
        }

        if applied.is_empty() {
            return Err(StoreError::UnknownPayload);
        }
        Ok(applied)
    }

    fn write_json<T: Serialize>(&self, file: &str, value: &T) -> Result<(), StoreError> {
        let data = serde_json::to_vec(value)?;
        fs::write(self.dir.join(file), data)?;
        Ok(())
    }

    /// Send to every live subscriber, dropping those that hung up.
    fn notify(&mut self, update: StoreUpdate) {
        self.subscribers.retain(|tx| tx.send(update.clone()).is_ok());
    }
}

impl ScheduleStore for FileStore {
    fn current_timetable(&self) -> Option<&Timetable> {
        self.timetable.as_ref()
    }

    fn current_exam_timetable(&self) -> Option<&ExamTimetable> {
        self.exam_timetable.as_ref()
    }

    fn sync_state(&self) -> &SyncState {
        &self.sync
    }

    fn save_timetable(
        &mut self,
        timetable: Timetable,
        updated: Option<&str>,
    ) -> Result<(), StoreError> {
        self.write_json(TIMETABLE_FILE, &timetable)?;
        self.sync.last_timetable_sync = Some(sync_timestamp(updated));
        self.write_json(SYNC_STATE_FILE, &self.sync)?;

        log::debug!("Saved timetable with {} days", timetable.days.len());
        self.timetable = Some(timetable);
        self.notify(StoreUpdate::Timetable);
        Ok(())
    }

    fn save_exam_timetable(
        &mut self,
        exam_timetable: ExamTimetable,
        updated: Option<&str>,
    ) -> Result<(), StoreError> {
        self.write_json(EXAM_TIMETABLE_FILE, &exam_timetable)?;
        self.sync.last_exam_sync = Some(sync_timestamp(updated));
        self.write_json(SYNC_STATE_FILE, &self.sync)?;

        log::debug!(
            "Saved exam timetable with {} exams",
            exam_timetable.exams.len()
        );
        self.exam_timetable = Some(exam_timetable);
        self.notify(StoreUpdate::ExamTimetable);
        Ok(())
    }

    fn subscribe(&mut self) -> Receiver<StoreUpdate> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        for file in [TIMETABLE_FILE, EXAM_TIMETABLE_FILE, SYNC_STATE_FILE] {
            match fs::remove_file(self.dir.join(file)) {
                Err(e) if e.kind() != io::ErrorKind::NotFound => return Err(e.into()),
                _ => {}
            }
        }

        self.timetable = None;
        self.exam_timetable = None;
        self.sync = SyncState::default();
        self.notify(StoreUpdate::Cleared);
        Ok(())
    }
}

/// Read and deserialize a cache file. Missing files are silent; corrupt ones
/// are logged. Both come back as `None`.
fn load_cached<T: for<'de> Deserialize<'de>>(path: &Path) -> Option<T> {
    let data = fs::read(path).ok()?;
    match serde_json::from_slice(&data) {
        Ok(value) => Some(value),
        Err(e) => {
            log::warn!("Ignoring corrupt cache file {}: {e}", path.display());
            None
        }
    }
}

fn sync_timestamp(updated: Option<&str>) -> String {
    match updated.map(str::trim) {
        Some(ts) if !ts.is_empty() => ts.to_string(),
        _ => Local::now().format("%Y-%m-%dT%H:%M:%S").to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DaySchedule, Exam, Lesson};
    use tempfile::TempDir;

    /// Test helper: a one-day timetable
    fn sample_timetable() -> Timetable {
        Timetable {
            days: vec![DaySchedule {
                day: "Monday".to_string(),
                lessons: vec![Lesson {
                    name: "Computing".to_string(),
                    start_time: "9:00AM".to_string(),
                    end_time: "10:00AM".to_string(),
                    room: "TG00".to_string(),
                    ..Lesson::default()
                }],
            }],
        }
    }

    fn sample_exams() -> ExamTimetable {
        ExamTimetable {
            has_exams: true,
            exams: vec![Exam {
                date: "12-06-2025".to_string(),
                subject_description: "Physics".to_string(),
                ..Exam::default()
            }],
            ..ExamTimetable::default()
        }
    }

    #[test]
    fn test_save_and_reopen() {
        let dir = TempDir::new().unwrap();

        let mut store = FileStore::open(dir.path()).unwrap();
        assert!(store.current_timetable().is_none());
        store
            .save_timetable(sample_timetable(), Some("2025-09-08T07:00:00"))
            .unwrap();
        store.save_exam_timetable(sample_exams(), None).unwrap();

        let reopened = FileStore::open(dir.path()).unwrap();
        assert_eq!(reopened.current_timetable(), Some(&sample_timetable()));
        assert_eq!(reopened.current_exam_timetable(), Some(&sample_exams()));
        assert_eq!(
            reopened.sync_state().last_timetable_sync.as_deref(),
            Some("2025-09-08T07:00:00")
        );
        assert!(reopened.sync_state().last_exam_sync.is_some());
    }

    #[test]
    fn test_corrupt_cache_treated_as_absent() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(TIMETABLE_FILE), b"{ nope").unwrap();

        let store = FileStore::open(dir.path()).unwrap();
        assert!(store.current_timetable().is_none());
    }

    #[test]
    fn test_subscribers_are_notified() {
        let dir = TempDir::new().unwrap();
        let mut store = FileStore::open(dir.path()).unwrap();
        let rx = store.subscribe();
        let dropped = store.subscribe();
        drop(dropped);

        store.save_timetable(sample_timetable(), None).unwrap();
        store.clear().unwrap();

        assert_eq!(rx.try_recv(), Ok(StoreUpdate::Timetable));
        assert_eq!(rx.try_recv(), Ok(StoreUpdate::Cleared));
        assert!(rx.try_recv().is_err());
        assert_eq!(store.subscribers.len(), 1);
    }

    #[test]
    fn test_ingest_payload() {
        let dir = TempDir::new().unwrap();
        let mut store = FileStore::open(dir.path()).unwrap();

        let payload = r#"{
            "timetable": {"days": [{"day": "Tuesday", "lessons": []}]},
            "timetableUpdated": "",
            "examTimetable": {"hasExams": true, "exams": [{"date": "2025-06-12"}]},
            "examUpdated": "2025-06-01T08:00:00"
        }"#;

        let applied = store.ingest_payload(payload).unwrap();
        assert_eq!(applied, vec![StoreUpdate::Timetable, StoreUpdate::ExamTimetable]);
        assert_eq!(store.current_timetable().unwrap().days[0].day, "Tuesday");
        assert_eq!(
            store.sync_state().last_exam_sync.as_deref(),
            Some("2025-06-01T08:00:00")
        );
        // Empty timestamp falls back to local time
        assert!(!store
            .sync_state()
            .last_timetable_sync
            .as_deref()
            .unwrap_or_default()
            .is_empty());
    }

    #[test]
    fn test_ingest_rejects_unknown_and_malformed() {
        let dir = TempDir::new().unwrap();
        let mut store = FileStore::open(dir.path()).unwrap();

        assert!(matches!(store.ingest_payload(r#"{"other": 1}"#), Err(StoreError::UnknownPayload)));
        assert!(matches!(store.ingest_payload("not json"), Err(StoreError::Json(_))));
    }

    #[test]
    fn test_failed_exam_save_keeps_timetable() {
        let dir = TempDir::new().unwrap();
        // A directory where the exam cache file should be makes its write fail.
        fs::create_dir(dir.path().join(EXAM_TIMETABLE_FILE)).unwrap();
        let mut store = FileStore::open(dir.path()).unwrap();
        let rx = store.subscribe();

        let payload = r#"{
            "timetable": {"days": [{"day": "Monday", "lessons": []}]},
            "examTimetable": {"hasExams": true, "exams": []}
        }"#;
        assert!(matches!(store.ingest_payload(payload), Err(StoreError::Io(_))));

        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![StoreUpdate::Timetable]);
        assert!(store.current_exam_timetable().is_none());
        let reopened = FileStore::open(dir.path()).unwrap();
        assert_eq!(reopened.current_timetable().unwrap().days[0].day, "Monday");
    }

    #[test]
    fn test_clear_removes_files() {
        let dir = TempDir::new().unwrap();
        let mut store = FileStore::open(dir.path()).unwrap();
        store.save_timetable(sample_timetable(), None).unwrap();
        store.clear().unwrap();
        // Clearing twice is fine
        store.clear().unwrap();

        assert!(!dir.path().join(TIMETABLE_FILE).exists());
        let reopened = FileStore::open(dir.path()).unwrap();
        assert!(reopened.current_timetable().is_none());
        assert_eq!(reopened.sync_state(), &SyncState::default());
    }
}
