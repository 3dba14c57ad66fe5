use std::{
    fs::{self, File, OpenOptions},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    time::UNIX_EPOCH,
};

use anyhow::{anyhow, Result};
use chrono::{DateTime, Local, TimeDelta};
use rayon::prelude::*;

use crate::logging;

/// 預設單檔最大大小：10 MB
const DEFAULT_MAX_SIZE: u64 = 10 * 1024 * 1024;
/// 預設保留天數：7 天
const DEFAULT_MAX_AGE_DAYS: i64 = 7;

/// 依日期切檔、超過大小時再依世代編號切檔的日誌寫入器
pub struct Rotate {
    /// 檔名模式，例如 "log/%Y-%m-%d-name.log"
    pattern: String,
    /// 由日期決定的基礎檔名
    base_name: String,
    /// 當前世代編號，只增不減
    generation: u32,
    max_size: u64,
    current_size: u64,
    max_age: TimeDelta,
    out: Option<BufWriter<File>>,
}

impl Rotate {
    pub fn new(pattern: String) -> Self {
        Self::with_options(pattern, DEFAULT_MAX_SIZE, DEFAULT_MAX_AGE_DAYS)
    }

    pub fn with_options(pattern: String, max_size: u64, max_age_days: i64) -> Self {
        Rotate {
            pattern,
            base_name: String::new(),
            generation: 0,
            max_size,
            current_size: 0,
            max_age: TimeDelta::try_days(max_age_days).unwrap_or(TimeDelta::days(7)),
            out: None,
        }
    }

    /// 寫入訊息，必要時先依日期或大小切換檔案
    pub fn write_msg(&mut self, now: DateTime<Local>, msg: &[u8]) -> Result<()> {
        let base_name = now.format(&self.pattern).to_string();

        if base_name != self.base_name || self.out.is_none() {
            self.base_name = base_name;
            self.generation = 0;
            self.open_file()?;
            self.skip_full_generations()?;
            self.remove_expired(now);
        }

        if self.current_size + msg.len() as u64 > self.max_size && self.current_size > 0 {
            self.generation += 1;
            self.open_file()?;
        }

        let out = self
            .out
            .as_mut()
            .ok_or_else(|| anyhow!("log file {} is not open", self.base_name))?;
        out.write_all(msg)?;
        self.current_size += msg.len() as u64;

        Ok(())
    }

    pub fn flush(&mut self) {
        if let Some(out) = self.out.as_mut() {
            let _ = out.flush();
        }
    }

    /// generation 0: log/2025-02-03-app.log，generation 1: log/2025-02-03-app.1.log
    fn file_name(base_name: &str, generation: u32) -> PathBuf {
        let path = Path::new(base_name);
        if generation == 0 {
            return path.to_path_buf();
        }

        let parent = path.parent().unwrap_or(Path::new(""));
        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("log");
        let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("log");

        parent.join(format!("{}.{}.{}", stem, generation, ext))
    }

    fn open_file(&mut self) -> Result<()> {
        self.flush();

        let path = Self::file_name(&self.base_name, self.generation);
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        self.current_size = file.metadata().map(|m| m.len()).unwrap_or(0);
        self.out = Some(BufWriter::with_capacity(4096, file));

        Ok(())
    }

    /// 重新開檔時，已達上限的世代直接跳過，改寫下一個世代
    fn skip_full_generations(&mut self) -> Result<()> {
        while self.max_size > 0 && self.current_size >= self.max_size {
            self.generation += 1;
            self.open_file()?;
        }

        Ok(())
    }

    /// 刪除最後修改時間早於保留期限的檔案
    fn remove_expired(&self, now: DateTime<Local>) {
        let dir = match Path::new(&self.base_name).parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => return,
        };

        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(why) => {
                logging::error_console(format!(
                    "Failed to read log directory {} because {:?}",
                    dir.display(),
                    why
                ));
                return;
            }
        };

        let cut_off = (now - self.max_age).timestamp().max(0) as u64;
        let expired: Vec<PathBuf> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| {
                fs::metadata(path)
                    .and_then(|m| m.modified())
                    .ok()
                    .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                    .is_some_and(|d| d.as_secs() <= cut_off)
            })
            .collect();

        expired
            .par_iter()
            .with_min_len(num_cpus::get())
            .for_each(|path| {
                if let Err(why) = fs::remove_file(path) {
                    logging::error_console(format!(
                        "couldn't remove the file({}). because {:?}",
                        path.display(),
                        why
                    ));
                }
            });
    }
}

impl Drop for Rotate {
    fn drop(&mut self) {
        self.flush();
    }
}
