pub mod backfill;
pub mod calculation;
pub mod config;
pub mod crawler;
pub mod declare;
pub mod error;
pub mod logging;
pub mod spreadsheet;
pub mod util;

use std::{io, io::Write, time::Duration};

use anyhow::Result;

use crate::{
    backfill::{
        progress::{LogProgress, StopSignal},
        Sweep,
    },
    config::{Crawl, SETTINGS},
    crawler::HttpFetcher,
    error::CrawlError,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let crawl = &SETTINGS.crawl;
    logging::info_file_async(format!(
        "settings: {}",
        serde_json::to_string(&*SETTINGS)?
    ));

    if crawl.confirm {
        if let Err(why) = confirm(crawl) {
            logging::info_file_async(format!("{}", why));
            logging::error_console("取消建立!".to_string());
            return Ok(());
        }
    }

    let stop = StopSignal::default();
    let signal = stop.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            logging::info_console("收到中止要求，完成目前的項目後停止".to_string());
            signal.stop();
        }
    });

    let observer = LogProgress;
    let result = match Sweep::new(crawl, &HttpFetcher, &observer) {
        Ok(sweep) => sweep.with_stop(stop).run().await,
        Err(why) => Err(why.into()),
    };

    if let Err(why) = &result {
        logging::error_file_async(format!("Failed to build workbooks because {:?}", why));
        logging::error_console(format!("{}", why));
    }

    // 讓背景的記錄執行緒把剩下的訊息寫完
    tokio::time::sleep(Duration::from_millis(200)).await;

    result.map(|_| ())
}

/// 顯示本次的設定並等待使用者確認
fn confirm(crawl: &Crawl) -> Result<(), CrawlError> {
    println!("活頁簿目錄: {}", crawl.books_dir);
    println!(
        "股票代號: {} ~ {}",
        or_unbounded(&crawl.stock_start),
        or_unbounded(&crawl.stock_finish)
    );
    println!(
        "季數: {} ~ {}",
        or_unbounded(&crawl.season_start),
        or_unbounded(&crawl.season_end)
    );
    println!("報表: {}", crawl.statements.join(", "));
    println!("每次請求間隔: {} ~ {} 秒", crawl.delay_min_secs, crawl.delay_max_secs);
    print!("確定要開始建立嗎? (y/N) ");

    let mut answer = String::new();
    let read = io::stdout()
        .flush()
        .and_then(|_| io::stdin().read_line(&mut answer));

    match read {
        Ok(_) if is_yes(&answer) => Ok(()),
        _ => Err(CrawlError::ConfigurationCancelled),
    }
}

fn or_unbounded(bound: &str) -> &str {
    if bound.trim().is_empty() {
        "不限"
    } else {
        bound
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim(), "y" | "Y" | "yes" | "Yes" | "YES")
}
