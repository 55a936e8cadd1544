use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use super::*;
use crate::history::{SinkError, SqliteSink};
use crate::source::{MetadataField, Sample, ScriptedSource};

/// In-memory sink that shares what it received with the test.
#[derive(Clone, Default)]
struct MemorySink {
    log: Arc<Mutex<Vec<String>>>,
    events: Arc<Mutex<Vec<PlayEvent>>>,
    path: PathBuf,
}

impl EventSink for MemorySink {
    fn append(&mut self, event: &PlayEvent) -> Result<(), SinkError> {
        self.log.lock().unwrap().push(format!("append {}", event.title));
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }

    fn close(&mut self) {
        self.log.lock().unwrap().push("close".to_string());
    }

    fn location(&self) -> &Path {
        &self.path
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

/// Sink whose store can never be written.
struct FailingSink {
    attempts: Arc<Mutex<u32>>,
    path: PathBuf,
}

impl EventSink for FailingSink {
    fn append(&mut self, _event: &PlayEvent) -> Result<(), SinkError> {
        *self.attempts.lock().unwrap() += 1;
        Err(SinkError::Closed)
    }

    fn location(&self) -> &Path {
        &self.path
    }

    fn describe(&self) -> String {
        "failing".to_string()
    }
}

/// Source that reports a new title on every sample, forever.
struct EndlessSource {
    n: u64,
}

impl PlaybackSource for EndlessSource {
    fn sample(&mut self) -> Sample {
        self.n += 1;
        Sample::playing(format!("Track {}", self.n), format!("/t/{}.mp3", self.n), 0, 60_000)
    }
}

/// Source whose sample blocks long enough to overlap the next fire.
struct SlowSource {
    entered: mpsc::Sender<()>,
    hold: Duration,
}

impl PlaybackSource for SlowSource {
    fn sample(&mut self) -> Sample {
        let _ = self.entered.send(());
        thread::sleep(self.hold);
        Sample::idle()
    }
}

struct PanickySource;

impl PlaybackSource for PanickySource {
    fn sample(&mut self) -> Sample {
        panic!("player went away mid-call");
    }
}

fn memory_monitor(source: impl PlaybackSource + Send + 'static) -> (Monitor, MemorySink) {
    let sink = MemorySink::default();
    let monitor = Monitor::new(
        Box::new(source),
        Box::new(sink.clone()),
        RepeatThresholds::default(),
    );
    (monitor, sink)
}

#[test]
fn intro_loop_end_to_end_records_two_plays() {
    let source = ScriptedSource::new([
        Sample::playing("Intro", "a.mp3", 0, 10_000),
        Sample::playing("Intro", "a.mp3", 9_500, 10_000),
        Sample::playing("Intro", "a.mp3", 100, 10_000),
    ]);
    let (mut monitor, sink) = memory_monitor(source);

    match monitor.tick() {
        TickOutcome::Emitted(ev) => {
            assert_eq!(ev.title, "Intro");
            assert_eq!(ev.filename, "a.mp3");
        }
        other => panic!("expected a recorded play, got {other:?}"),
    }
    assert_eq!(monitor.tick(), TickOutcome::NoChange);
    assert_eq!(monitor.detector_state().last_position_percent, 95);
    assert!(matches!(monitor.tick(), TickOutcome::Emitted(_)));
    assert_eq!(monitor.tick(), TickOutcome::Idle);

    let events = sink.events.lock().unwrap();
    assert_eq!(events.len(), 2);
    assert!(events.iter().all(|e| e.filepath == "a.mp3"));
}

#[test]
fn tags_enrich_the_record_only_for_emitted_files() {
    let source = ScriptedSource::new([
        Sample::playing("1. Band - Song", "/m/song.mp3", 0, 200_000),
        Sample::playing("1. Band - Song", "/m/song.mp3", 5_000, 200_000),
    ])
    .with_metadata(
        "/m/song.mp3",
        [
            (MetadataField::Title, "Song"),
            (MetadataField::Artist, "Band"),
            (MetadataField::Length, "200"),
        ],
    );
    let (mut monitor, sink) = memory_monitor(source);

    monitor.tick();
    monitor.tick();

    let events = sink.events.lock().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].title, "Song");
    assert_eq!(events[0].artist, "Band");
    assert_eq!(events[0].duration_ms, 200_000);
    // Comparison key stays the sampled title so the second tick is not a change.
    assert_eq!(monitor.detector_state().last_emitted_title, "1. Band - Song");
}

#[test]
fn window_caption_stands_in_for_a_missing_sampled_title() {
    let untitled = Sample {
        title: None,
        ..Sample::playing("", "/m/x.mp3", 0, 10_000)
    };
    let source = ScriptedSource::new([untitled.clone(), untitled])
        .with_window_title("Caption Title");
    let (mut monitor, sink) = memory_monitor(source);

    assert!(matches!(monitor.tick(), TickOutcome::Emitted(_)));
    assert_eq!(monitor.tick(), TickOutcome::NoChange);
    assert_eq!(sink.events.lock().unwrap()[0].title, "Caption Title");
}

#[test]
fn sink_failure_stays_inside_the_tick() {
    let attempts = Arc::new(Mutex::new(0));
    let mut monitor = Monitor::new(
        Box::new(ScriptedSource::new([
            Sample::playing("A", "/a.mp3", 0, 10_000),
            Sample::playing("B", "/b.mp3", 0, 10_000),
        ])),
        Box::new(FailingSink {
            attempts: attempts.clone(),
            path: PathBuf::from("/nowhere"),
        }),
        RepeatThresholds::default(),
    );

    assert!(matches!(monitor.tick(), TickOutcome::PersistFailed(_)));
    assert!(matches!(monitor.tick(), TickOutcome::PersistFailed(_)));
    assert_eq!(*attempts.lock().unwrap(), 2);
    // Detection moved on even though nothing was stored.
    assert_eq!(monitor.detector_state().last_emitted_title, "B");
}

#[test]
fn monitor_writes_through_to_a_real_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("plays.db");
    let mut monitor = Monitor::new(
        Box::new(ScriptedSource::new([
            Sample::playing("A", "/music/a.mp3", 0, 10_000),
            Sample::playing("B", "/music/b.mp3", 0, 10_000),
        ])),
        Box::new(SqliteSink::new(&path, Duration::from_millis(100))),
        RepeatThresholds::default(),
    );
    monitor.tick();
    monitor.tick();
    monitor.close();

    let mut reader = SqliteSink::new(&path, Duration::from_millis(100));
    let titles: Vec<String> = reader
        .recent(10)
        .unwrap()
        .into_iter()
        .map(|e| e.title)
        .collect();
    assert_eq!(titles.len(), 2);
    assert!(titles.contains(&"A".to_string()));
    assert!(titles.contains(&"B".to_string()));
}

#[test]
fn describe_mentions_the_sink() {
    let (monitor, _sink) = memory_monitor(ScriptedSource::default());
    let text = monitor.describe();
    assert!(text.starts_with("playlog - Now Playing Logger"));
    assert!(text.ends_with("memory"));
}

#[test]
fn scheduler_keeps_firing_when_the_store_is_unwritable() {
    let attempts = Arc::new(Mutex::new(0));
    let monitor = Monitor::new(
        Box::new(EndlessSource { n: 0 }),
        Box::new(FailingSink {
            attempts: attempts.clone(),
            path: PathBuf::from("/nowhere"),
        }),
        RepeatThresholds::default(),
    );

    let handle = Scheduler::start(monitor, Duration::from_millis(10));
    thread::sleep(Duration::from_millis(200));
    let stats = handle.stats();
    handle.stop();

    assert!(stats.ticks_run >= 3, "only {} ticks ran", stats.ticks_run);
    assert!(stats.persist_failures >= 3);
    assert_eq!(stats.plays_recorded, 0);
    assert!(*attempts.lock().unwrap() >= 3);
}

#[test]
fn stop_disarms_the_timer_before_closing_the_store() {
    let (monitor, sink) = memory_monitor(EndlessSource { n: 0 });
    let handle = Scheduler::start(monitor, Duration::from_millis(5));
    thread::sleep(Duration::from_millis(60));
    let state = handle.stop();

    let log = sink.log.lock().unwrap().clone();
    assert_eq!(log.last().map(String::as_str), Some("close"));
    assert_eq!(log.iter().filter(|l| *l == "close").count(), 1);
    assert!(state.last_emitted_title.starts_with("Track "));

    // Nothing is appended once stopped.
    thread::sleep(Duration::from_millis(30));
    assert_eq!(sink.log.lock().unwrap().len(), log.len());
}

#[test]
fn overlapping_ticks_are_skipped_not_queued() {
    let (entered_tx, entered_rx) = mpsc::channel();
    let (monitor, _sink) = memory_monitor(SlowSource {
        entered: entered_tx,
        hold: Duration::from_millis(150),
    });

    let handle = Scheduler::start(monitor, Duration::from_millis(10));
    entered_rx
        .recv_timeout(Duration::from_secs(2))
        .expect("first tick should start");

    // The timer thread is inside a tick right now.
    assert_eq!(handle.tick_now(), None);

    thread::sleep(Duration::from_millis(200));
    let stats = handle.stats();
    handle.stop();

    assert!(stats.ticks_skipped >= 1);
    // 150 ms ticks on a 10 ms period: far fewer ticks than fires.
    assert!(stats.ticks_run <= 3, "ran {} ticks", stats.ticks_run);
}

#[test]
fn a_panicking_source_does_not_stop_the_scheduler() {
    let (monitor, _sink) = memory_monitor(PanickySource);
    let handle = Scheduler::start(monitor, Duration::from_millis(10));
    thread::sleep(Duration::from_millis(100));
    let stats = handle.stats();
    drop(handle);

    assert!(stats.ticks_run >= 2);
}

#[test]
fn tick_now_runs_when_idle() {
    let (monitor, sink) = memory_monitor(ScriptedSource::new([Sample::playing(
        "Now", "/n.mp3", 0, 1_000,
    )]));
    // Long interval so only the manual tick runs.
    let handle = Scheduler::start(monitor, Duration::from_secs(60));

    assert!(matches!(handle.tick_now(), Some(TickOutcome::Emitted(_))));
    assert_eq!(handle.stats().plays_recorded, 1);
    assert_eq!(handle.describe(), "playlog - Now Playing Logger\n\nLogs currently playing songs to memory");
    handle.stop();
    assert_eq!(sink.events.lock().unwrap().len(), 1);
}
