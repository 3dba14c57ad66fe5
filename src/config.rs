use std::{env, path::PathBuf, str::FromStr};

use anyhow::Result;
use config::{Config as config_config, File as config_file};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::logging;

const CONFIG_PATH: &str = "app.json";

#[derive(Serialize, Deserialize, Default, Debug, Clone)]
pub struct App {
    #[serde(default)]
    pub crawl: Crawl,
    #[serde(default)]
    pub http: Http,
}

const CRAWL_BOOKS_DIR: &str = "CRAWL_BOOKS_DIR";
const CRAWL_STOCK_START: &str = "CRAWL_STOCK_START";
const CRAWL_STOCK_FINISH: &str = "CRAWL_STOCK_FINISH";
const CRAWL_SEASON_START: &str = "CRAWL_SEASON_START";
const CRAWL_SEASON_END: &str = "CRAWL_SEASON_END";
const CRAWL_DELAY_MIN_SECS: &str = "CRAWL_DELAY_MIN_SECS";
const CRAWL_DELAY_MAX_SECS: &str = "CRAWL_DELAY_MAX_SECS";
const CRAWL_EARLIEST_YEAR: &str = "CRAWL_EARLIEST_YEAR";
const CRAWL_STATEMENTS: &str = "CRAWL_STATEMENTS";
const CRAWL_CONCURRENCY: &str = "CRAWL_CONCURRENCY";
const CRAWL_CONFIRM: &str = "CRAWL_CONFIRM";

/// 一次執行所需的參數，區間留空代表不設限
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Crawl {
    /// 活頁簿存放目錄
    pub books_dir: String,
    /// 起始股票代號
    pub stock_start: String,
    /// 結束股票代號
    pub stock_finish: String,
    /// 起始季數(1 為最近一季)
    pub season_start: String,
    /// 結束季數
    pub season_end: String,
    /// 每次請求前隨機等待的下限(秒)
    pub delay_min_secs: u64,
    /// 每次請求前隨機等待的上限(秒)
    pub delay_max_secs: u64,
    /// 最早的西元年度
    pub earliest_year: i32,
    /// 要下載的報表類型標籤
    pub statements: Vec<String>,
    /// 同時處理的股票數
    pub concurrency: usize,
    /// 開始前是否要求確認
    pub confirm: bool,
}

impl Default for Crawl {
    fn default() -> Self {
        Crawl {
            books_dir: "books".to_string(),
            stock_start: String::new(),
            stock_finish: String::new(),
            season_start: String::new(),
            season_end: String::new(),
            delay_min_secs: 2,
            delay_max_secs: 7,
            earliest_year: 2013,
            statements: default_statements(),
            concurrency: 1,
            confirm: true,
        }
    }
}

impl Crawl {
    pub fn books_path(&self) -> PathBuf {
        PathBuf::from(&self.books_dir)
    }
}

fn default_statements() -> Vec<String> {
    [
        "basic-info",
        "balance-sheet",
        "comprehensive-income",
        "cash-flow",
        "equity-changes",
        "financial-notes",
        "dividend-distribution",
        "accounting-report",
        "financial-analysis",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

const HTTP_TIMEOUT_SECS: &str = "HTTP_TIMEOUT_SECS";
const HTTP_MAX_RETRIES: &str = "HTTP_MAX_RETRIES";

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Http {
    pub timeout_secs: u64,
    pub max_retries: usize,
}

impl Default for Http {
    fn default() -> Self {
        Http {
            timeout_secs: 15,
            max_retries: 2,
        }
    }
}

pub static SETTINGS: Lazy<App> = Lazy::new(App::new);

impl App {
    /// 讀取設定檔，失敗時記錄原因並改用預設值，最後再以 env 覆蓋
    pub fn new() -> Self {
        match Self::get() {
            Ok(app) => app,
            Err(why) => {
                logging::error_file_async(format!(
                    "I can't read the config context because {:?}",
                    why
                ));
                App::default().override_with_env()
            }
        }
    }

    fn get() -> Result<Self> {
        let config_path = config_path();
        if !config_path.exists() {
            return Ok(App::default().override_with_env());
        }

        let app: App = config_config::builder()
            .add_source(config_file::from(config_path))
            .build()?
            .try_deserialize()?;

        Ok(app.override_with_env())
    }

    /// 將來至於 env 的設定值覆蓋掉 json 上的設定值
    fn override_with_env(mut self) -> Self {
        if let Ok(dir) = env::var(CRAWL_BOOKS_DIR) {
            self.crawl.books_dir = dir;
        }

        if let Ok(start) = env::var(CRAWL_STOCK_START) {
            self.crawl.stock_start = start;
        }

        if let Ok(finish) = env::var(CRAWL_STOCK_FINISH) {
            self.crawl.stock_finish = finish;
        }

        if let Ok(start) = env::var(CRAWL_SEASON_START) {
            self.crawl.season_start = start;
        }

        if let Ok(end) = env::var(CRAWL_SEASON_END) {
            self.crawl.season_end = end;
        }

        override_parsed(CRAWL_DELAY_MIN_SECS, &mut self.crawl.delay_min_secs);
        override_parsed(CRAWL_DELAY_MAX_SECS, &mut self.crawl.delay_max_secs);
        override_parsed(CRAWL_EARLIEST_YEAR, &mut self.crawl.earliest_year);
        override_parsed(CRAWL_CONCURRENCY, &mut self.crawl.concurrency);
        override_parsed(CRAWL_CONFIRM, &mut self.crawl.confirm);

        if let Ok(statements) = env::var(CRAWL_STATEMENTS) {
            self.crawl.statements = split_labels(&statements);
        }

        override_parsed(HTTP_TIMEOUT_SECS, &mut self.http.timeout_secs);
        override_parsed(HTTP_MAX_RETRIES, &mut self.http.max_retries);

        self
    }
}

/// env 的值無法解析時保留原值
fn override_parsed<T: FromStr>(key: &str, target: &mut T) {
    if let Ok(value) = env::var(key) {
        match T::from_str(value.trim()) {
            Ok(v) => *target = v,
            Err(_) => logging::warn_file_async(format!(
                "Ignore {} because '{}' can't be parsed",
                key, value
            )),
        }
    }
}

/// "balance-sheet, cash-flow" => ["balance-sheet", "cash-flow"]
fn split_labels(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// 回傳設定檔的路徑
fn config_path() -> PathBuf {
    PathBuf::from(CONFIG_PATH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let app = App::default();
        assert_eq!(app.crawl.books_dir, "books");
        assert_eq!(app.crawl.delay_min_secs, 2);
        assert_eq!(app.crawl.delay_max_secs, 7);
        assert_eq!(app.crawl.statements.len(), 9);
        assert_eq!(app.http.max_retries, 2);
    }

    #[test]
    fn test_split_labels() {
        assert_eq!(
            split_labels(" balance-sheet, ,cash-flow "),
            vec!["balance-sheet".to_string(), "cash-flow".to_string()]
        );
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let app: App = serde_json::from_str(r#"{"crawl":{"stock_start":"2330"}}"#).unwrap();
        assert_eq!(app.crawl.stock_start, "2330");
        assert_eq!(app.crawl.earliest_year, 2013);
        assert_eq!(app.http.timeout_secs, 15);
    }
}
