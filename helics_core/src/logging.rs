//! Background logging spine (§4.3).
//!
//! A single consumer thread drains a [`BlockingQueue`] of `(sink_index, text)` records
//! and dispatches each to the registered sink. Records can carry a control prefix
//! (`flush`, `close`) instead of ordinary text, and a trailing sentinel marking which
//! kind of sink the record is destined for; both are stripped before the text reaches a
//! sink's `write`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::sync::queue::BlockingQueue;

/// Control prefix recognized ahead of ordinary log text.
const FLUSH_PREFIX: &str = "!!>flush";
const CLOSE_PREFIX: &str = "!!>close";

/// Suffix sentinel marking a record for delivery to the file sink.
pub const FILE_SINK_SUFFIX: &str = "\u{1}F";
/// Suffix sentinel marking a record for delivery to the console sink.
pub const CONSOLE_SINK_SUFFIX: &str = "\u{1}C";

/// Sink index used for the `close` control record that terminates the consumer thread.
pub const CLOSE_SINK_INDEX: i32 = -1;

/// Destination a log sink writes to.
pub trait LogSink: Send {
    fn write(&self, text: &str);
    fn flush(&self) {}
}

enum Record {
    Text { sink_index: i32, text: String },
    Flush,
    Close,
}

fn parse_record(sink_index: i32, mut text: String) -> Record {
    if sink_index == CLOSE_SINK_INDEX && text == CLOSE_PREFIX {
        return Record::Close;
    }
    if text == FLUSH_PREFIX {
        return Record::Flush;
    }
    if let Some(stripped) = text.strip_suffix(FILE_SINK_SUFFIX) {
        text = stripped.to_string();
    } else if let Some(stripped) = text.strip_suffix(CONSOLE_SINK_SUFFIX) {
        text = stripped.to_string();
    }
    Record::Text { sink_index, text }
}

/// Formats a log line as `"name(fed_id)::message"`, per the wire log format (§6).
pub fn format_record(name: &str, fed_id: i64, message: &str) -> String {
    format!("{name}({fed_id})::{message}")
}

struct QueueEntry {
    sink_index: i32,
    text: String,
}

/// A process-wide logging core: a queue, a registry of sinks, and the thread draining it.
pub struct Logger {
    queue: Arc<BlockingQueue<QueueEntry>>,
    /// Set by the owner immediately before an unclean process teardown so the consumer
    /// thread skips any remaining orderly-close bookkeeping and exits at once.
    fast_shutdown: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Logger {
    pub fn new(sinks: Vec<Box<dyn LogSink>>) -> Self {
        let queue: Arc<BlockingQueue<QueueEntry>> = Arc::new(BlockingQueue::new());
        let fast_shutdown = Arc::new(AtomicBool::new(false));

        let worker_queue = queue.clone();
        let worker_fast_shutdown = fast_shutdown.clone();
        let handle = std::thread::spawn(move || {
            Self::drain_loop(worker_queue, sinks, worker_fast_shutdown);
        });

        Self {
            queue,
            fast_shutdown,
            handle: Some(handle),
        }
    }

    fn drain_loop(queue: Arc<BlockingQueue<QueueEntry>>, sinks: Vec<Box<dyn LogSink>>, fast_shutdown: Arc<AtomicBool>) {
        loop {
            let Some(entry) = queue.pop() else { return };
            match parse_record(entry.sink_index, entry.text) {
                Record::Close => {
                    if fast_shutdown.load(Ordering::Acquire) {
                        return;
                    }
                    for sink in &sinks {
                        sink.flush();
                    }
                    return;
                }
                Record::Flush => {
                    for sink in &sinks {
                        sink.flush();
                    }
                }
                Record::Text { sink_index, text } => {
                    if sink_index >= 0 {
                        if let Some(sink) = sinks.get(sink_index as usize) {
                            sink.write(&text);
                        }
                    } else {
                        for sink in &sinks {
                            sink.write(&text);
                        }
                    }
                }
            }
        }
    }

    pub fn log(&self, sink_index: i32, text: impl Into<String>) {
        self.queue.push(QueueEntry {
            sink_index,
            text: text.into(),
        });
    }

    pub fn flush(&self) {
        self.queue.push(QueueEntry {
            sink_index: CLOSE_SINK_INDEX,
            text: FLUSH_PREFIX.to_string(),
        });
    }

    /// Mark this logger for fast (non-orderly) shutdown; the next `close` the consumer
    /// thread sees will skip the final sink flush.
    pub fn trip_fast_shutdown(&self) {
        self.fast_shutdown.store(true, Ordering::Release);
    }

    pub fn shutdown(&mut self) {
        self.queue.push(QueueEntry {
            sink_index: CLOSE_SINK_INDEX,
            text: CLOSE_PREFIX.to_string(),
        });
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.shutdown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct RecordingSink(Arc<Mutex<Vec<String>>>);

    impl LogSink for RecordingSink {
        fn write(&self, text: &str) {
            self.0.lock().unwrap().push(text.to_string());
        }
    }

    #[test]
    fn text_records_are_dispatched_to_the_addressed_sink() {
        let captured = Arc::new(Mutex::new(Vec::new()));
        let mut logger = Logger::new(vec![Box::new(RecordingSink(captured.clone()))]);
        logger.log(0, format_record("fed1", 3, "hello"));
        logger.shutdown();
        assert_eq!(captured.lock().unwrap().as_slice(), ["fed1(3)::hello"]);
    }

    #[test]
    fn sink_suffix_sentinels_are_stripped() {
        let captured = Arc::new(Mutex::new(Vec::new()));
        let mut logger = Logger::new(vec![Box::new(RecordingSink(captured.clone()))]);
        logger.log(0, format!("line one{FILE_SINK_SUFFIX}"));
        logger.shutdown();
        assert_eq!(captured.lock().unwrap().as_slice(), ["line one"]);
    }

    #[test]
    fn close_addressed_to_negative_one_terminates_the_thread() {
        let mut logger = Logger::new(vec![]);
        logger.shutdown();
        assert!(logger.handle.is_none());
    }
}
