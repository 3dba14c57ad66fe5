use std::{fmt, fmt::Write as _, thread};

use chrono::Local;
use once_cell::sync::Lazy;
use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver, UnboundedSender};

use crate::logging::rotate::Rotate;

pub mod rotate;

static LOGGER: Lazy<Logger> = Lazy::new(|| Logger::new("default"));

/// 累積到此長度就先寫入檔案
const BATCH_SIZE: usize = 4096;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Level::Debug => "Debug",
            Level::Info => "Info",
            Level::Warn => "Warn",
            Level::Error => "Error",
        };
        f.write_str(s)
    }
}

struct LogMessage {
    level: Level,
    msg: String,
    created_at: chrono::DateTime<Local>,
}

/// 非同步寫檔的記錄器，每個名稱對應一組 log/日期-名稱.log 檔案
pub struct Logger {
    writer: UnboundedSender<LogMessage>,
}

impl Logger {
    pub fn new(log_name: &str) -> Self {
        let (tx, rx) = mpsc::unbounded_channel::<LogMessage>();
        let pattern = format!("log/%Y-%m-%d-{}.log", log_name);

        // 寫入檔案的操作使用另一個線程處理
        thread::spawn(move || write_loop(Rotate::new(pattern), rx));

        Logger { writer: tx }
    }

    pub fn debug(&self, log: String) {
        self.send(Level::Debug, log);
    }

    pub fn info(&self, log: String) {
        self.send(Level::Info, log);
    }

    pub fn warn(&self, log: String) {
        self.send(Level::Warn, log);
    }

    pub fn error(&self, log: String) {
        self.send(Level::Error, log);
    }

    fn send(&self, level: Level, msg: String) {
        let message = LogMessage {
            level,
            msg,
            created_at: Local::now(),
        };

        if let Err(why) = self.writer.send(message) {
            error_console(format!("Failed to send log message because {:?}", why.0.msg));
        }
    }
}

fn write_loop(mut rotate: Rotate, mut rx: UnboundedReceiver<LogMessage>) {
    let mut batch = String::with_capacity(BATCH_SIZE);

    while let Some(first) = rx.blocking_recv() {
        let mut received = Some(first);

        while let Some(message) = received.take() {
            let _ = writeln!(
                &mut batch,
                "{} {} {}",
                message.created_at.format("%F %X%.6f"),
                message.level,
                message.msg
            );

            if batch.len() >= BATCH_SIZE {
                flush_batch(&mut rotate, &mut batch);
            }

            match rx.try_recv() {
                Ok(next) => received = Some(next),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => {}
            }
        }

        flush_batch(&mut rotate, &mut batch);
    }
}

fn flush_batch(rotate: &mut Rotate, batch: &mut String) {
    if batch.is_empty() {
        return;
    }

    if let Err(why) = rotate.write_msg(Local::now(), batch.as_bytes()) {
        error_console(format!("Failed to write log file because {:?}\r\n{}", why, batch));
    }

    rotate.flush();
    batch.clear();
}

pub fn debug_file_async(log: String) {
    LOGGER.debug(log);
}

pub fn info_file_async(log: String) {
    LOGGER.info(log);
}

pub fn warn_file_async(log: String) {
    LOGGER.warn(log);
}

pub fn error_file_async(log: String) {
    LOGGER.error(log);
}

pub fn info_console(log: String) {
    println!(
        "{} Info {}",
        Local::now().format("%Y-%m-%d %H:%M:%S.%3f"),
        log
    );
}

pub fn error_console(log: String) {
    eprintln!(
        "{} Error {}",
        Local::now().format("%Y-%m-%d %H:%M:%S.%3f"),
        log
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_display() {
        assert_eq!(Level::Warn.to_string(), "Warn");
        assert_eq!(Level::Error.to_string(), "Error");
    }

    #[tokio::test]
    #[ignore]
    async fn test_file_async() {
        info_file_async("開始 test_file_async".to_string());
        warn_file_async("warn".to_string());
        error_file_async("error".to_string());
        debug_file_async("結束 test_file_async".to_string());
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    }
}
