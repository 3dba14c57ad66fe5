use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::{FixedOffset, Local, NaiveDate, Utc};
use concat_string::concat_string;
use futures::{stream, StreamExt};
use hashbrown::{hash_map::Entry, HashMap};
use scopeguard::defer;

use crate::{
    calculation::{
        period::{self, Period},
        stock_range,
    },
    config::Crawl,
    crawler::{
        twse::{basic_info, company, statement},
        Fetcher, Throttle,
    },
    declare::{StatementKind, Stock},
    error::CrawlError,
    logging,
    spreadsheet::{Book, DEFAULT_SHEET},
    util::text,
};

use self::progress::{Outcome, ProgressObserver, StopSignal, Summary, Tally, Unit};

/// 進度回報與中止
pub mod progress;

/// 一家公司要處理的工作項目，依執行順序排列
pub type UnitList = Vec<(StatementKind, Option<Period>)>;

/// 一次執行的工作內容
#[derive(Debug)]
pub struct WorkPlan {
    pub stocks: Vec<Stock>,
    pub periods: Vec<Period>,
    /// 民國年，由近至遠
    pub years: Vec<i32>,
    pub units: UnitList,
    /// stocks × units
    pub total: usize,
}

/// 下載所有上市公司的財報並寫入活頁簿，已存在的工作表或活頁簿會略過
pub struct Sweep<'a> {
    fetcher: &'a dyn Fetcher,
    observer: &'a dyn ProgressObserver,
    books_dir: PathBuf,
    stock_start: String,
    stock_finish: String,
    season_start: String,
    season_end: String,
    earliest_year: i32,
    kinds: Vec<StatementKind>,
    throttle: Throttle,
    concurrency: usize,
    stop: StopSignal,
    today: NaiveDate,
}

impl<'a> Sweep<'a> {
    /// 未知的報表標籤會在這裡失敗，不會發出任何請求
    pub fn new(
        crawl: &Crawl,
        fetcher: &'a dyn Fetcher,
        observer: &'a dyn ProgressObserver,
    ) -> Result<Self, CrawlError> {
        let kinds = statement::parse_kinds(&crawl.statements)?;

        Ok(Sweep {
            fetcher,
            observer,
            books_dir: crawl.books_path(),
            stock_start: crawl.stock_start.clone(),
            stock_finish: crawl.stock_finish.clone(),
            season_start: crawl.season_start.clone(),
            season_end: crawl.season_end.clone(),
            earliest_year: crawl.earliest_year,
            kinds,
            throttle: Throttle::new(crawl.delay_min_secs, crawl.delay_max_secs),
            concurrency: crawl.concurrency.max(1),
            stop: StopSignal::default(),
            today: taiwan_today(),
        })
    }

    /// 以指定日期計算可取得的季度
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn with_stop(mut self, stop: StopSignal) -> Self {
        self.stop = stop;
        self
    }

    /// 取得上市公司列表後開始處理
    pub async fn run(&self) -> Result<Summary> {
        logging::info_file_async("建立財報活頁簿開始".to_string());
        defer! {
            logging::info_file_async("建立財報活頁簿結束".to_string());
        }

        // 季數區間有誤時不必下載公司列表
        self.periods()?;

        fs::create_dir_all(&self.books_dir)
            .with_context(|| format!("create directory {}", self.books_dir.display()))?;

        self.throttle.wait().await;
        let stocks = company::visit(self.fetcher).await?;

        self.run_with_stocks(&stocks).await
    }

    /// 處理指定的公司，代號區間仍會套用
    pub async fn run_with_stocks(&self, stocks: &[Stock]) -> Result<Summary> {
        let plan = self.plan(stocks)?;
        let tally = Tally::new(plan.total);

        logging::info_file_async(format!(
            "共 {} 家公司、{} 季、{} 種報表，合計 {} 項",
            plan.stocks.len(),
            plan.periods.len(),
            self.kinds.len(),
            plan.total
        ));

        let plan_ref = &plan;
        let tally_ref = &tally;
        stream::iter(plan.stocks.iter())
            .for_each_concurrent(self.concurrency, |stock| async move {
                if !self.crawl_stock(stock, plan_ref, tally_ref).await {
                    tally_ref.interrupt();
                }
            })
            .await;

        let summary = tally.summary();
        self.observer.on_finish(&summary);

        Ok(summary)
    }

    /// 篩選公司並排出每家公司的工作項目
    pub fn plan(&self, stocks: &[Stock]) -> Result<WorkPlan, CrawlError> {
        let stocks = stock_range::filter_by_range(stocks, &self.stock_start, &self.stock_finish);
        let periods = self.periods()?;
        let years = period::distinct_years(&periods);
        let units = self.units(&periods, &years);
        let total = stocks.len() * units.len();

        Ok(WorkPlan {
            stocks,
            periods,
            years,
            units,
            total,
        })
    }

    fn periods(&self) -> Result<Vec<Period>, CrawlError> {
        let available = period::compute_available_periods(self.today, self.earliest_year);
        period::slice(&available, &self.season_start, &self.season_end)
    }

    /// 基本資料，接著每一年度先財務分析，再依季度處理各季報表
    fn units(&self, periods: &[Period], years: &[i32]) -> UnitList {
        let mut units = UnitList::new();

        if self.kinds.contains(&StatementKind::BasicInfo) {
            units.push((StatementKind::BasicInfo, None));
        }

        for &year in years {
            if self.kinds.contains(&StatementKind::FinancialAnalysis) {
                units.push((StatementKind::FinancialAnalysis, Some(Period::annual(year))));
            }

            for period in periods.iter().filter(|p| p.roc_year == year) {
                for kind in self.kinds.iter().filter(|k| k.is_quarterly()) {
                    units.push((*kind, Some(*period)));
                }
            }
        }

        units
    }

    /// 全部項目都處理過時回傳 true，中途被要求停止則回傳 false
    async fn crawl_stock(&self, stock: &Stock, plan: &WorkPlan, tally: &Tally) -> bool {
        let mut books = StockBooks::new(&self.books_dir, stock);

        for (kind, period) in &plan.units {
            if self.stop.is_stopped() {
                return false;
            }

            let outcome = match self.crawl_unit(&mut books, *kind, period.as_ref()).await {
                Ok(outcome) => outcome,
                Err(why) => {
                    logging::error_file_async(format!(
                        "Failed to crawl {} {} {} because {:?}",
                        stock,
                        kind,
                        period.map(|p| p.sheet_name()).unwrap_or_default(),
                        why
                    ));
                    Outcome::Failed
                }
            };

            let progress = tally.record(outcome);
            self.observer.on_unit(
                &Unit {
                    stock,
                    kind: *kind,
                    period: *period,
                    outcome,
                },
                progress,
            );
        }

        true
    }

    async fn crawl_unit(
        &self,
        books: &mut StockBooks<'_>,
        kind: StatementKind,
        period: Option<&Period>,
    ) -> Result<Outcome> {
        let sheet_name = match period {
            Some(period) => period.sheet_name(),
            None => DEFAULT_SHEET.to_string(),
        };

        // 基本資料整本只有一張表，檔案存在即略過
        let done = match kind {
            StatementKind::BasicInfo => Book::exists(books.path(kind)),
            _ => books.book(kind)?.sheet_exists(&sheet_name),
        };
        if done {
            return Ok(Outcome::Skipped);
        }

        self.throttle.wait().await;
        let rows = self.fetch_rows(books.stock, kind, period).await?;

        let book = books.book(kind)?;
        book.open_sheet(&sheet_name);
        book.append(rows);

        if let Err(why) = book.save() {
            book.remove_sheet(&sheet_name);
            return Err(why);
        }

        Ok(Outcome::Fetched)
    }

    async fn fetch_rows(
        &self,
        stock: &Stock,
        kind: StatementKind,
        period: Option<&Period>,
    ) -> Result<Vec<Vec<String>>> {
        let spec = kind.spec();
        let request = spec.request(stock, period);
        let html = self.fetcher.download(&request).await?;
        let rows = match kind {
            StatementKind::BasicInfo => basic_info::extract(&html)?,
            _ => spec.extract_rows(&html)?,
        };

        if !rows.is_empty() {
            return Ok(rows);
        }

        // 查無資料也寫入工作表，之後的執行視為已完成
        match statement::no_filing_notice(&html) {
            Some(notice) => {
                logging::info_file_async(format!("{} {} {}: {}", stock, kind, request, notice));
                Ok(vec![vec![notice.to_string()]])
            }
            None => Err(CrawlError::NoData {
                url: request.to_string(),
            }
            .into()),
        }
    }
}

/// 一家公司的活頁簿，每種報表只開啟一次
struct StockBooks<'s> {
    dir: &'s Path,
    stock: &'s Stock,
    books: HashMap<StatementKind, Book>,
}

impl<'s> StockBooks<'s> {
    fn new(dir: &'s Path, stock: &'s Stock) -> Self {
        StockBooks {
            dir,
            stock,
            books: HashMap::new(),
        }
    }

    fn path(&self, kind: StatementKind) -> PathBuf {
        book_path(self.dir, self.stock, kind)
    }

    fn book(&mut self, kind: StatementKind) -> Result<&mut Book> {
        match self.books.entry(kind) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let book = Book::open(book_path(self.dir, self.stock, kind))?;
                Ok(entry.insert(book))
            }
        }
    }
}

/// 基本資料︰{id}({name}).xlsx，其餘︰{id}({name})_{報表名稱}.xlsx
pub fn book_path(dir: &Path, stock: &Stock, kind: StatementKind) -> PathBuf {
    let name = text::file_name_safe(&stock.name);
    let file_name = match kind {
        StatementKind::BasicInfo => concat_string!(stock.id, "(", name, ").xlsx"),
        _ => concat_string!(stock.id, "(", name, ")_", kind.title(), ".xlsx"),
    };

    dir.join(file_name)
}

/// 公告期限以台灣時間為準
fn taiwan_today() -> NaiveDate {
    match FixedOffset::east_opt(8 * 60 * 60) {
        Some(tz) => Utc::now().with_timezone(&tz).date_naive(),
        None => Local::now().date_naive(),
    }
}
