//! # NSCG Schedule Command-Line Entry Point
//!
//! This binary wires the library together for development and for scripting
//! on the watch side: it loads the cached timetables, runs the merge engine
//! once for a snapshot instant and prints what each surface would show.


use anyhow::Context;
use chrono::{DateTime, Days, Local, NaiveDateTime, TimeZone, Utc};
use clap::{Parser, Subcommand};
use nscg_schedule_lib::config::{Config, DEFAULT_CONFIG_PATH};
use nscg_schedule_lib::merger::{self, Event, EventKind};
use nscg_schedule_lib::renderer::draw_ascii;
use nscg_schedule_lib::store::{FileStore, ScheduleStore, StoreUpdate};
use nscg_schedule_lib::summary::{time_until, ComplicationSummary};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "nscg-schedule", about = "Lesson and exam schedule for the watch")]
struct Cli {
    /// Configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Local time to evaluate at instead of the system clock
    /// (e.g. 2025-09-08T09:45:00)
    #[arg(long)]
    now: Option<NaiveDateTime>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show what is on now and what comes next
    Now,
    /// Show the display timeline from local midnight today
    Timeline,
    /// List all merged events within the horizon
    Events,
    /// Apply a sync payload file from the phone
    Ingest { file: PathBuf },
    /// Remove all cached schedule data
    Clear,
}

/// Main application entry point.
fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = Config::load_from_path(&cli.config);
    let now = resolve_now(cli.now)?;

    let mut store = FileStore::open(&config.storage.data_dir).with_context(|| {
        format!(
            "opening schedule store at {}",
            config.storage.data_dir.display()
        )
    })?;

    match cli.command {
        Command::Now => show_now(&store, &config, now),
        Command::Timeline => show_timeline(&store, &config, now)?,
        Command::Events => show_events(&store, &config, now),
        Command::Ingest { file } => {
            let payload = fs::read_to_string(&file)
                .with_context(|| format!("reading sync payload {}", file.display()))?;
            let updates = store.subscribe();
            let result = store.ingest_payload(&payload);
            let applied: Vec<StoreUpdate> = updates.try_iter().collect();
            result.with_context(|| {
                format!(
                    "applying sync payload {} (saved before the failure: {applied:?})",
                    file.display()
                )
            })?;
            println!("Applied {} update(s): {:?}", applied.len(), applied);
        }
        Command::Clear => {
            store.clear()?;
            println!("Cleared cached schedule data");
        }
    }

    Ok(())
}

/// The snapshot instant for this run; the only place the clock is read.
fn resolve_now(local: Option<NaiveDateTime>) -> anyhow::Result<DateTime<Utc>> {
    match local {
        Some(naive) => Local
            .from_local_datetime(&naive)
            .earliest()
            .map(|t| t.with_timezone(&Utc))
            .with_context(|| format!("{naive} does not exist in the local time zone")),
        None => Ok(Utc::now()),
    }
}

fn build_events(store: &FileStore, config: &Config, now: DateTime<Utc>) -> Vec<Event> {
    merger::build_events(
        store.current_timetable(),
        store.current_exam_timetable(),
        now,
        &Local,
        config.schedule.horizon_days,
    )
}

fn show_now(store: &FileStore, config: &Config, now: DateTime<Utc>) {
    let events = build_events(store, config, now);
    let pick = merger::pick(&events, now);

    match pick.current {
        Some(event) => println!("Now:  {}", describe(event)),
        None => println!("Now:  nothing in progress"),
    }
    match pick.next {
        Some(event) => println!(
            "Next: {} ({})",
            describe(event),
            time_until(event.start, now)
        ),
        None => println!("Next: no upcoming events"),
    }

    let summary = ComplicationSummary::from_pick(&pick);
    println!();
    println!("Complication short: {}", summary.short_text);
    println!(
        "Complication long:  {} / {}",
        summary.long_title, summary.long_text
    );
    if let Some(until) = summary.valid_until {
        println!(
            "Valid until:        {}",
            until.with_timezone(&Local).format("%a %H:%M")
        );
    }
}

fn show_timeline(store: &FileStore, config: &Config, now: DateTime<Utc>) -> anyhow::Result<()> {
    let events = build_events(store, config, now);

    let today = now.with_timezone(&Local).date_naive();
    let days = u64::try_from(config.schedule.timeline_days).unwrap_or(1);
    let last_day = today
        .checked_add_days(Days::new(days))
        .with_context(|| format!("timeline of {days} days runs past the calendar"))?;
    let window_start = local_midnight(today)?;
    let window_end = local_midnight(last_day)?;

    let segments = merger::build_display_segments(&events, window_start, window_end);
    draw_ascii(
        &segments,
        !events.is_empty(),
        window_start,
        window_end,
        now,
        &Local,
        &config.display,
    );
    Ok(())
}

fn show_events(store: &FileStore, config: &Config, now: DateTime<Utc>) {
    let events = build_events(store, config, now);
    if events.is_empty() {
        println!("No events within {} days", config.schedule.horizon_days);
        return;
    }
    for event in &events {
        println!(
            "{}-{}  {}",
            event.start.with_timezone(&Local).format("%a %d %b %H:%M"),
            event.end.with_timezone(&Local).format("%H:%M"),
            describe(event)
        );
    }

    let state = store.sync_state();
    println!();
    println!(
        "Last sync: timetable={} exams={}",
        state.last_timetable_sync.as_deref().unwrap_or("never"),
        state.last_exam_sync.as_deref().unwrap_or("never")
    );
}

fn describe(event: &Event) -> String {
    let tag = match event.kind() {
        EventKind::Lesson => "Lesson",
        EventKind::Exam => "EXAM",
    };
    format!("[{tag}] {} in {}", event.title(), event.room())
}

fn local_midnight(date: chrono::NaiveDate) -> anyhow::Result<DateTime<Utc>> {
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .context("midnight is always a valid time")?;
    Local
        .from_local_datetime(&midnight)
        .earliest()
        .map(|t| t.with_timezone(&Utc))
        .with_context(|| format!("local midnight of {date} does not exist"))
}
