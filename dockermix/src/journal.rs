//! Logging handle passed to every component at construction.
//!
//! Records go through the [`log`] data model, but to a sink owned by the
//! caller instead of the process-wide logger. The binary hands in a
//! `pretty_env_logger` instance, tests hand in a capturing one.

use log::{Level, Log, Metadata, Record};
use std::{fmt, sync::Arc};

const TARGET: &str = "dockermix";

#[derive(Clone)]
pub struct Journal {
    sink: Arc<dyn Log>,
}

impl Journal {
    pub fn new(sink: Arc<dyn Log>) -> Journal {
        Journal { sink }
    }

    /// Drops every record.
    pub fn discard() -> Journal {
        Journal::new(Arc::new(NullLogger))
    }

    pub fn info(&self, args: fmt::Arguments<'_>) {
        self.emit(Level::Info, args);
    }

    pub fn warn(&self, args: fmt::Arguments<'_>) {
        self.emit(Level::Warn, args);
    }

    pub fn debug(&self, args: fmt::Arguments<'_>) {
        self.emit(Level::Debug, args);
    }

    fn emit(&self, level: Level, args: fmt::Arguments<'_>) {
        let metadata = Metadata::builder().level(level).target(TARGET).build();
        if !self.sink.enabled(&metadata) {
            return;
        }

        self.sink.log(
            &Record::builder()
                .metadata(metadata)
                .args(args)
                .module_path_static(Some(module_path!()))
                .build(),
        );
    }
}

impl fmt::Debug for Journal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Journal").finish()
    }
}

struct NullLogger;

impl Log for NullLogger {
    fn enabled(&self, _metadata: &Metadata<'_>) -> bool {
        false
    }

    fn log(&self, _record: &Record<'_>) {}

    fn flush(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Capture(Mutex<Vec<(Level, String)>>);

    impl Log for Capture {
        fn enabled(&self, metadata: &Metadata<'_>) -> bool {
            metadata.level() <= Level::Info
        }

        fn log(&self, record: &Record<'_>) {
            self.0
                .lock()
                .unwrap()
                .push((record.level(), record.args().to_string()));
        }

        fn flush(&self) {}
    }

    #[test]
    fn records_reach_the_injected_sink() {
        let capture = Arc::new(Capture::default());
        let journal = Journal::new(capture.clone());

        journal.info(format_args!("building {}", "web"));
        journal.warn(format_args!("stop failed"));

        let records = capture.0.lock().unwrap();
        assert_eq!(
            *records,
            vec![
                (Level::Info, "building web".to_owned()),
                (Level::Warn, "stop failed".to_owned()),
            ]
        );
    }

    #[test]
    fn disabled_levels_are_filtered_before_formatting() {
        let capture = Arc::new(Capture::default());
        let journal = Journal::new(capture.clone());

        journal.debug(format_args!("noise"));

        assert!(capture.0.lock().unwrap().is_empty());
    }
}
