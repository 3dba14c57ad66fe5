use thiserror::Error;

/// 爬取過程中需要被呼叫端區分處理的錯誤
#[derive(Debug, Error)]
pub enum CrawlError {
    /// 區間設定錯誤，例如起始大於結束
    #[error("invalid range: {0}")]
    InvalidRange(String),
    /// 未知的報表類型，屬設定錯誤，不重試
    #[error("unknown statement type: {0}")]
    UnknownStatementType(String),
    /// 網路或逾時錯誤，單一工作項目失敗後略過
    #[error("failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },
    /// 頁面中沒有可擷取的資料列，也不是查無資料的公告(例如流量管制頁)
    #[error("no rows found at {url}")]
    NoData { url: String },
    /// 使用者取消執行
    #[error("configuration cancelled by user")]
    ConfigurationCancelled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let why = CrawlError::Fetch {
            url: "GET:https://isin.twse.com.tw/isin/C_public.jsp?strMode=2".to_string(),
            reason: "timeout".to_string(),
        };
        assert_eq!(
            why.to_string(),
            "failed to fetch GET:https://isin.twse.com.tw/isin/C_public.jsp?strMode=2: timeout"
        );
        assert_eq!(
            CrawlError::UnknownStatementType("income".to_string()).to_string(),
            "unknown statement type: income"
        );
    }
}
