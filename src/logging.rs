//! Process logger: writes to stderr, keeps the most recent lines in memory
//! and broadcasts each line to live subscribers.

use crate::constants::LOG_BUFFER_CAPACITY;
use log::{LevelFilter, Metadata, Record, SetLoggerError};
use once_cell::sync::OnceCell;
use std::collections::VecDeque;
use std::str::FromStr;
use std::sync::Mutex;
use tokio::sync::broadcast;

pub struct MapFoldLogger {
    buffer: Mutex<VecDeque<String>>,
    sender: broadcast::Sender<String>,
}

impl MapFoldLogger {
    fn new() -> Self {
        let (sender, _) = broadcast::channel(LOG_BUFFER_CAPACITY);
        Self {
            buffer: Mutex::new(VecDeque::with_capacity(LOG_BUFFER_CAPACITY)),
            sender,
        }
    }

    fn push(&self, line: String) {
        if let Ok(mut buf) = self.buffer.lock() {
            buf.push_back(line.clone());
            if buf.len() > LOG_BUFFER_CAPACITY {
                buf.pop_front();
            }
        }
        let _ = self.sender.send(line);
    }
}

static LOGGER: OnceCell<MapFoldLogger> = OnceCell::new();

impl log::Log for MapFoldLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let line = format!(
                "{} {:<5} [{}] {}",
                chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ"),
                record.level(),
                record.target(),
                record.args()
            );
            eprintln!("{}", line);
            self.push(line);
        }
    }

    fn flush(&self) {}
}

/// Parse a level name such as `debug` or `WARN`.
pub fn parse_level(level: &str) -> Option<LevelFilter> {
    LevelFilter::from_str(level.trim()).ok()
}

/// Install the logger. Fails if another logger is already installed.
pub fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
    let logger = LOGGER.get_or_init(MapFoldLogger::new);
    log::set_logger(logger)?;
    log::set_max_level(level);
    Ok(())
}

pub fn recent_logs() -> Vec<String> {
    LOGGER
        .get()
        .and_then(|l| l.buffer.lock().ok().map(|buf| buf.iter().cloned().collect()))
        .unwrap_or_default()
}

pub fn subscribe() -> Option<broadcast::Receiver<String>> {
    LOGGER.get().map(|l| l.sender.subscribe())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("debug"), Some(LevelFilter::Debug));
        assert_eq!(parse_level(" WARN "), Some(LevelFilter::Warn));
        assert_eq!(parse_level("loud"), None);
    }

    #[test]
    fn test_buffer_is_bounded() {
        let logger = MapFoldLogger::new();
        for i in 0..(LOG_BUFFER_CAPACITY + 5) {
            logger.push(format!("line {}", i));
        }
        let buf = logger.buffer.lock().unwrap();
        assert_eq!(buf.len(), LOG_BUFFER_CAPACITY);
        assert_eq!(buf.front().map(String::as_str), Some("line 5"));
    }

    #[test]
    fn test_subscribers_receive_lines() {
        let logger = MapFoldLogger::new();
        let mut receiver = logger.sender.subscribe();
        logger.push("mapped host h1".to_string());
        assert_eq!(receiver.try_recv().unwrap(), "mapped host h1");
    }
}
