use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use once_cell::sync::{Lazy, OnceCell};
use reqwest::{header, Client, Method, RequestBuilder, Response};
use tokio::sync::Semaphore;

use crate::{config::SETTINGS, logging::Logger, util};

pub mod element;
pub mod user_agent;

/// A semaphore for limiting concurrent requests.
///
/// 限制最多 5 個並發請求，避免被目標網站封禁。
static SEMAPHORE: Lazy<Semaphore> = Lazy::new(|| Semaphore::new(5));

/// A singleton instance of the reqwest client.
static CLIENT: OnceCell<Client> = OnceCell::new();

static LOGGER: Lazy<Logger> = Lazy::new(|| Logger::new("http"));

/// An asynchronous trait that provides a method to force convert a reqwest::Response body
/// from Big5 encoding to UTF-8 encoding.
#[async_trait]
pub trait TextForceBig5 {
    /// Converts the body of a reqwest::Response from Big5 encoding to UTF-8 encoding.
    async fn text_force_big5(self) -> Result<String>;
}

#[async_trait]
impl TextForceBig5 for Response {
    async fn text_force_big5(self) -> Result<String> {
        util::text::big5_2_utf8(self.bytes().await?.as_ref())
    }
}

/// Returns the reqwest client singleton instance or creates one if it doesn't exist.
fn get_client() -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| {
        // reqwest 使用 rustls-no-provider，需先指定加密實作；已安裝過時會回傳 Err，可忽略
        let _ = rustls::crypto::ring::default_provider().install_default();

        Client::builder()
            // ===== 壓縮 =====
            .brotli(true)
            .gzip(true)
            .zstd(true)
            // ===== 超時設置 =====
            .connect_timeout(Duration::from_secs(8))
            .timeout(Duration::from_secs(SETTINGS.http.timeout_secs.max(1)))
            // ===== TCP 優化 =====
            .tcp_nodelay(true)
            .tcp_keepalive(Duration::from_secs(60))
            // ===== 連接池 =====
            .pool_max_idle_per_host(20)
            .pool_idle_timeout(Duration::from_secs(90))
            // ===== Cookie 和重定向 =====
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::limited(5))
            // ===== Headers =====
            .referer(true)
            .user_agent(user_agent::gen_random_ua())
            .build()
            .map_err(|e| anyhow!("Failed to create reqwest client: {:?}", e))
    })
}

/// Performs an HTTP GET request and returns the response as text.
pub async fn get(url: &str, headers: Option<header::HeaderMap>) -> Result<String> {
    send(Method::GET, url, headers, None::<fn(_) -> _>)
        .await?
        .text()
        .await
        .map_err(|e| anyhow!("Error parsing response text: {:?}", e))
}

/// Performs an HTTP GET request and returns the Big5 encoded response as UTF-8 text.
pub async fn get_use_big5(url: &str) -> Result<String> {
    send(Method::GET, url, None, None::<fn(_) -> _>)
        .await?
        .text_force_big5()
        .await
        .map_err(|e| anyhow!("Error parsing response text use BIG5: {:?}", e))
}

/// Performs an HTTP POST request with an already url-encoded form body.
///
/// # Arguments
///
/// * `url`: The URL to send the POST request to.
/// * `headers`: An optional set of headers to include with the request.
/// * `body`: The form body, e.g. `step=1&co_id=2330`.
pub async fn post_form(
    url: &str,
    headers: Option<header::HeaderMap>,
    body: String,
) -> Result<String> {
    send(
        Method::POST,
        url,
        headers,
        Some(move |rb: RequestBuilder| {
            rb.header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(body)
        }),
    )
    .await?
    .text()
    .await
    .map_err(|why| anyhow!("Error parsing response text: {:?}", why))
}

/// Sends an HTTP request, retrying with an increasing delay on failure.
///
/// A response with an error status counts as a failure. The number of attempts
/// comes from `http.max_retries` in the settings (at least one).
async fn send(
    method: Method,
    url: &str,
    headers: Option<header::HeaderMap>,
    body: Option<impl FnOnce(RequestBuilder) -> RequestBuilder>,
) -> Result<Response> {
    let visit_log = format!("{method}:{url}");
    let client = get_client()?;
    let mut rb = client.request(method, url);
    let max_retries = SETTINGS.http.max_retries.max(1);
    let mut last_error = String::new();

    if let Some(h) = headers {
        rb = rb.headers(h);
    }

    if let Some(body_fn) = body {
        rb = body_fn(rb);
    }

    for attempt in 1..=max_retries {
        let msg = format!("Attempt {} to send {}", attempt, visit_log);
        let rb_clone = rb
            .try_clone()
            .ok_or_else(|| anyhow!("Failed to clone RequestBuilder"))?;
        let permit = SEMAPHORE.acquire().await;
        let start = Instant::now();
        let res = rb_clone.send().await.and_then(Response::error_for_status);
        let elapsed = start.elapsed().as_millis();
        drop(permit);

        match res {
            Ok(response) => {
                LOGGER.info(format!("{} {} ms", msg, elapsed));
                return Ok(response);
            }
            Err(why) => {
                last_error = format!("{:?}", why);
                LOGGER.error(format!("{} failed because {:?}. {} ms", msg, why, elapsed));
                if attempt < max_retries {
                    tokio::time::sleep(Duration::from_secs(2u64.pow(attempt as u32))).await;
                }
            }
        }
    }

    Err(anyhow!(
        "Failed to send request to {} after {} attempts; last error: {}",
        url,
        max_retries,
        last_error
    ))
}

#[cfg(test)]
mod tests {
    use crate::logging;

    use super::*;

    #[tokio::test]
    #[ignore]
    async fn test_get_use_big5() {
        dotenv::dotenv().ok();
        logging::debug_file_async("開始 get_use_big5".to_string());

        match get_use_big5("https://isin.twse.com.tw/isin/C_public.jsp?strMode=2").await {
            Ok(text) => {
                assert!(text.contains("股票"));
            }
            Err(why) => {
                logging::debug_file_async(format!("Failed to get_use_big5 because {:?}", why));
            }
        }

        logging::debug_file_async("結束 get_use_big5".to_string());
    }

    #[tokio::test]
    #[ignore]
    async fn test_post_form() {
        dotenv::dotenv().ok();
        let body = "encodeURIComponent=1&step=1&firstin=1&off=1&queryName=co_id&inpuType=co_id&TYPEK=all&co_id=2330".to_string();

        match post_form("https://mops.twse.com.tw/mops/web/ajax_t05st03", None, body).await {
            Ok(text) => logging::debug_file_async(format!("len:{}", text.len())),
            Err(why) => {
                logging::debug_file_async(format!("Failed to post_form because {:?}", why));
            }
        }
    }
}
