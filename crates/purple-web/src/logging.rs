#![forbid(unsafe_code)]

//! `tracing` output routed to a line sink (`console.log` in the browser).

use std::io;

use tracing::Subscriber;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::MakeWriter;

/// Directive used when the configured one does not parse.
pub const FALLBACK_DIRECTIVE: &str = "info";

/// Receives one formatted event per call, without the trailing newline.
pub type LineSink = fn(&str);

/// Buffers one formatted event and hands it to the sink on flush or drop.
#[derive(Debug)]
pub struct LineWriter {
    buf: Vec<u8>,
    sink: LineSink,
}

impl LineWriter {
    fn emit(&mut self) {
        if self.buf.is_empty() {
            return;
        }
        let text = String::from_utf8_lossy(&self.buf);
        (self.sink)(text.trim_end_matches('\n'));
        self.buf.clear();
    }
}

impl io::Write for LineWriter {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(bytes);
        Ok(bytes.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.emit();
        Ok(())
    }
}

impl Drop for LineWriter {
    fn drop(&mut self) {
        self.emit();
    }
}

/// [`MakeWriter`] producing a fresh [`LineWriter`] per event.
#[derive(Debug, Clone, Copy)]
pub struct SinkWriter {
    sink: LineSink,
}

impl SinkWriter {
    #[must_use]
    pub const fn new(sink: LineSink) -> Self {
        Self { sink }
    }
}

impl<'a> MakeWriter<'a> for SinkWriter {
    type Writer = LineWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LineWriter {
            buf: Vec::new(),
            sink: self.sink,
        }
    }
}

/// Parse `directive`, falling back to [`FALLBACK_DIRECTIVE`].
#[must_use]
pub fn env_filter(directive: &str) -> EnvFilter {
    EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new(FALLBACK_DIRECTIVE))
}

/// Plain-text subscriber: no timestamps, no ANSI, no target.
pub fn subscriber(directive: &str, sink: LineSink) -> impl Subscriber + Send + Sync + 'static {
    tracing_subscriber::fmt()
        .with_writer(SinkWriter::new(sink))
        .with_ansi(false)
        .without_time()
        .with_target(false)
        .with_env_filter(env_filter(directive))
        .finish()
}

/// Install the global subscriber. Returns `false` if one was already set.
pub fn install(directive: &str, sink: LineSink) -> bool {
    tracing::subscriber::set_global_default(subscriber(directive, sink)).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tracing_subscriber::filter::LevelFilter;

    static LINES: Mutex<Vec<String>> = Mutex::new(Vec::new());

    fn capture(line: &str) {
        LINES.lock().unwrap().push(line.to_owned());
    }

    fn take_lines() -> Vec<String> {
        std::mem::take(&mut *LINES.lock().unwrap())
    }

    #[test]
    fn events_become_single_lines_filtered_by_level() {
        take_lines();
        tracing::subscriber::with_default(subscriber("info", capture), || {
            tracing::info!(passes = 3, "engine ready");
            tracing::debug!("hidden at info");
        });
        let lines = take_lines();
        assert_eq!(lines.len(), 1, "{lines:?}");
        assert!(lines[0].contains("INFO"));
        assert!(lines[0].contains("engine ready"));
        assert!(lines[0].contains("passes=3"));
        assert!(!lines[0].contains('\n'));
        assert!(!lines[0].contains('\u{1b}'));
    }

    #[test]
    fn bad_directive_falls_back_to_info() {
        assert_eq!(
            env_filter("purple_engine=loud").max_level_hint(),
            Some(LevelFilter::INFO)
        );
        assert_eq!(
            env_filter("purple_engine=debug").max_level_hint(),
            Some(LevelFilter::DEBUG)
        );
    }
}
