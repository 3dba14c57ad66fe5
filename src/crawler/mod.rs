use std::{fmt, time::Duration};

use anyhow::Result;
use async_trait::async_trait;

use crate::{error::CrawlError, logging, util};

/// 台灣證券交易所、公開資訊觀測站
pub mod twse;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// 回應內容的編碼
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Encoding {
    Utf8,
    Big5,
}

/// 一次頁面下載所需的資訊
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub url: String,
    pub method: Method,
    /// 已 url-encode 的表單內容，GET 時不使用
    pub body: Option<String>,
    pub encoding: Encoding,
}

impl PageRequest {
    pub fn get(url: impl Into<String>) -> Self {
        PageRequest {
            url: url.into(),
            method: Method::Get,
            body: None,
            encoding: Encoding::Utf8,
        }
    }

    pub fn post(url: impl Into<String>, body: impl Into<String>) -> Self {
        PageRequest {
            url: url.into(),
            method: Method::Post,
            body: Some(body.into()),
            encoding: Encoding::Utf8,
        }
    }

    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }
}

impl fmt::Display for PageRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.method, &self.body) {
            (Method::Post, Some(body)) => write!(f, "POST:{}?{}", self.url, body),
            (Method::Post, None) => write!(f, "POST:{}", self.url),
            (Method::Get, _) => write!(f, "GET:{}", self.url),
        }
    }
}

/// 下載網頁內容
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn download(&self, request: &PageRequest) -> Result<String>;
}

/// 使用 reqwest 的實作，逾時與重試由 util::http 處理
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpFetcher;

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn download(&self, request: &PageRequest) -> Result<String> {
        let result = match (request.method, request.encoding) {
            (Method::Get, Encoding::Big5) => util::http::get_use_big5(&request.url).await,
            (Method::Get, Encoding::Utf8) => util::http::get(&request.url, None).await,
            (Method::Post, _) => {
                util::http::post_form(
                    &request.url,
                    None,
                    request.body.clone().unwrap_or_default(),
                )
                .await
            }
        };

        result.map_err(|why| {
            CrawlError::Fetch {
                url: request.to_string(),
                reason: format!("{:?}", why),
            }
            .into()
        })
    }
}

/// 每次請求前隨機等待，降低對來源網站的負擔
#[derive(Debug, Clone, Copy)]
pub struct Throttle {
    min_secs: u64,
    max_secs: u64,
}

impl Throttle {
    /// 上下限順序顛倒時自動對調
    pub fn new(min_secs: u64, max_secs: u64) -> Self {
        Throttle {
            min_secs: min_secs.min(max_secs),
            max_secs: min_secs.max(max_secs),
        }
    }

    pub fn next_delay(&self) -> Duration {
        let millis = rand::random_range(self.min_secs * 1000..=self.max_secs * 1000);
        Duration::from_millis(millis)
    }

    pub async fn wait(&self) {
        let delay = self.next_delay();
        if delay.is_zero() {
            return;
        }

        logging::debug_file_async(format!("wait {} ms before next request", delay.as_millis()));
        tokio::time::sleep(delay).await;
    }
}
