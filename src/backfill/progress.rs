use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc,
};

use crate::{calculation::period::Period, declare::{Stock, StatementKind}, logging};

/// 單一工作項目(股票 × 報表 × 期別)的結果
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// 已下載並存檔
    Fetched,
    /// 工作表或活頁簿已存在
    Skipped,
    /// 下載、解析或存檔失敗，下次執行會再嘗試
    Failed,
}

/// 完成一個工作項目後回報的內容
#[derive(Debug)]
pub struct Unit<'a> {
    pub stock: &'a Stock,
    pub kind: StatementKind,
    /// 基本資料沒有期別
    pub period: Option<Period>,
    pub outcome: Outcome,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

impl Progress {
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }

        self.completed as f64 * 100.0 / self.total as f64
    }
}

/// 一次執行的統計
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Summary {
    pub total: usize,
    pub fetched: usize,
    pub skipped: usize,
    pub failed: usize,
    /// 中途被要求停止
    pub cancelled: bool,
}

/// 進度的接收端
pub trait ProgressObserver: Send + Sync {
    fn on_unit(&self, unit: &Unit<'_>, progress: Progress);
    fn on_finish(&self, summary: &Summary);
}

/// 將進度印在主控台，並寫入日誌檔
#[derive(Debug, Default)]
pub struct LogProgress;

impl ProgressObserver for LogProgress {
    fn on_unit(&self, unit: &Unit<'_>, progress: Progress) {
        let period = unit.period.map(|p| p.sheet_name()).unwrap_or_default();
        let msg = format!(
            "[{:>6.2}%] {}/{} {} {} {} {:?}",
            progress.percent(),
            progress.completed,
            progress.total,
            unit.stock,
            unit.kind,
            period,
            unit.outcome
        );

        if unit.outcome != Outcome::Skipped {
            logging::info_file_async(msg.clone());
        }

        logging::info_console(msg);
    }

    fn on_finish(&self, summary: &Summary) {
        let msg = format!(
            "{} 共 {} 項，下載 {} 項，略過 {} 項，失敗 {} 項",
            if summary.cancelled { "已中止" } else { "建立完成。" },
            summary.total,
            summary.fetched,
            summary.skipped,
            summary.failed
        );

        logging::info_file_async(msg.clone());
        logging::info_console(msg);
    }
}

/// 執行中累計的數量
#[derive(Debug, Default)]
pub(super) struct Tally {
    total: usize,
    fetched: AtomicUsize,
    skipped: AtomicUsize,
    failed: AtomicUsize,
    /// 有公司在處理完所有項目前就停止
    interrupted: AtomicBool,
}

impl Tally {
    pub(super) fn new(total: usize) -> Self {
        Tally {
            total,
            ..Default::default()
        }
    }

    pub(super) fn record(&self, outcome: Outcome) -> Progress {
        let counter = match outcome {
            Outcome::Fetched => &self.fetched,
            Outcome::Skipped => &self.skipped,
            Outcome::Failed => &self.failed,
        };
        counter.fetch_add(1, Ordering::SeqCst);

        Progress {
            completed: self.completed(),
            total: self.total,
        }
    }

    fn completed(&self) -> usize {
        self.fetched.load(Ordering::SeqCst)
            + self.skipped.load(Ordering::SeqCst)
            + self.failed.load(Ordering::SeqCst)
    }

    pub(super) fn interrupt(&self) {
        self.interrupted.store(true, Ordering::SeqCst);
    }

    pub(super) fn summary(&self) -> Summary {
        Summary {
            total: self.total,
            fetched: self.fetched.load(Ordering::SeqCst),
            skipped: self.skipped.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
            cancelled: self.interrupted.load(Ordering::SeqCst),
        }
    }
}

/// 要求在兩個工作項目之間停止
#[derive(Debug, Default, Clone)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
