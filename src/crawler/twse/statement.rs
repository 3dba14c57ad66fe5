use std::str::FromStr;

use anyhow::Result;
use scraper::Html;

use crate::{
    calculation::period::Period,
    crawler::{twse, Method, PageRequest},
    declare::{Stock, StatementKind},
    error::CrawlError,
    util::http::element,
};

/// 公開資訊觀測站 ajax 頁面共用的查詢參數
const AJAX_COMMON: &str =
    "encodeURIComponent=1&step=1&firstin=1&off=1&queryName=co_id&inpuType=co_id&TYPEK=all&isnew=false";

/// 公開資訊觀測站表示該期沒有申報資料的訊息
const NO_FILING_NOTICES: [&str; 4] = ["查無需求資料", "查無所需資料", "查無資料", "無應編製合併財報"];

/// 頁面沒有表格時，判斷是否為「查無資料」一類的公告頁
///
/// 回傳找到的訊息；流量管制或錯誤頁回傳 `None`。
pub fn no_filing_notice(html: &str) -> Option<&'static str> {
    NO_FILING_NOTICES
        .iter()
        .copied()
        .find(|notice| html.contains(notice))
}

/// 季別參數的格式
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SeasonFormat {
    /// 02
    Padded,
    /// 2，舊版 server-java 頁面使用
    Stripped,
}

/// 一種報表的下載與擷取方式
///
/// `payload_template` 內可用的欄位︰`{co_id}`、`{roc_year}`、`{ad_year}`、`{season}`。
#[derive(Debug)]
pub struct StatementSpec {
    pub kind: StatementKind,
    pub path: &'static str,
    pub method: Method,
    pub payload_template: &'static str,
    pub row_query: &'static str,
    pub cell_query: &'static str,
    /// 每列只取前幾個儲存格
    pub max_cells: Option<usize>,
    pub season_format: SeasonFormat,
}

static BASIC_INFO: StatementSpec = StatementSpec {
    kind: StatementKind::BasicInfo,
    path: "mops/web/ajax_t05st03",
    method: Method::Post,
    payload_template: "{common}&co_id={co_id}",
    row_query: "table.hasBorder tr",
    cell_query: "th, td",
    max_cells: None,
    season_format: SeasonFormat::Padded,
};

static BALANCE_SHEET: StatementSpec = StatementSpec {
    kind: StatementKind::BalanceSheet,
    path: "mops/web/ajax_t164sb03",
    method: Method::Post,
    payload_template: "{common}&co_id={co_id}&year={roc_year}&season={season}",
    row_query: "table.hasBorder tr",
    cell_query: "td",
    max_cells: Some(2),
    season_format: SeasonFormat::Padded,
};

static COMPREHENSIVE_INCOME: StatementSpec = StatementSpec {
    kind: StatementKind::ComprehensiveIncome,
    path: "mops/web/ajax_t164sb04",
    method: Method::Post,
    payload_template: "{common}&co_id={co_id}&year={roc_year}&season={season}",
    row_query: "table.hasBorder tr",
    cell_query: "td",
    max_cells: Some(2),
    season_format: SeasonFormat::Padded,
};

static CASH_FLOW: StatementSpec = StatementSpec {
    kind: StatementKind::CashFlow,
    path: "mops/web/ajax_t164sb05",
    method: Method::Post,
    payload_template: "{common}&co_id={co_id}&year={roc_year}&season={season}",
    row_query: "table.hasBorder tr",
    cell_query: "td",
    max_cells: Some(2),
    season_format: SeasonFormat::Padded,
};

static EQUITY_CHANGES: StatementSpec = StatementSpec {
    kind: StatementKind::EquityChanges,
    path: "mops/web/ajax_t164sb06",
    method: Method::Post,
    payload_template: "{common}&co_id={co_id}&year={roc_year}&season={season}",
    row_query: "table.hasBorder tr",
    cell_query: "td",
    max_cells: None,
    season_format: SeasonFormat::Padded,
};

static FINANCIAL_NOTES: StatementSpec = StatementSpec {
    kind: StatementKind::FinancialNotes,
    path: "server-java/t164sb01",
    method: Method::Get,
    payload_template: "step=3&CO_ID={co_id}&SYEAR={ad_year}&SSEASON={season}&REPORT_ID=C",
    row_query: "table.main_table tr, table.hasBorder tr",
    cell_query: "td",
    max_cells: None,
    season_format: SeasonFormat::Stripped,
};

static DIVIDEND_DISTRIBUTION: StatementSpec = StatementSpec {
    kind: StatementKind::DividendDistribution,
    path: "mops/web/ajax_t05st09_2",
    method: Method::Post,
    payload_template: "{common}&co_id={co_id}&year={roc_year}&season={season}&qryType=1",
    row_query: "table.hasBorder tr",
    cell_query: "td",
    max_cells: None,
    season_format: SeasonFormat::Padded,
};

static ACCOUNTING_REPORT: StatementSpec = StatementSpec {
    kind: StatementKind::AccountingReport,
    path: "server-java/t164sb01",
    method: Method::Get,
    payload_template: "step=1&CO_ID={co_id}&SYEAR={ad_year}&SSEASON={season}&REPORT_ID=C",
    row_query: "table.main_table tr, table.hasBorder tr",
    cell_query: "td",
    max_cells: None,
    season_format: SeasonFormat::Stripped,
};

static FINANCIAL_ANALYSIS: StatementSpec = StatementSpec {
    kind: StatementKind::FinancialAnalysis,
    path: "mops/web/ajax_t05st22",
    method: Method::Post,
    payload_template: "{common}&co_id={co_id}&year={roc_year}&ifrs=Y",
    row_query: "table.hasBorder tr",
    cell_query: "th, td",
    max_cells: None,
    season_format: SeasonFormat::Padded,
};

/// 依標籤取得報表設定，未知的標籤屬設定錯誤
pub fn spec(label: &str) -> Result<&'static StatementSpec, CrawlError> {
    StatementKind::from_str(label.trim())
        .map(spec_of)
        .map_err(|_| CrawlError::UnknownStatementType(label.to_string()))
}

/// 將設定檔中的標籤清單轉成報表種類，遇到未知標籤即失敗
pub fn parse_kinds<S: AsRef<str>>(labels: &[S]) -> Result<Vec<StatementKind>, CrawlError> {
    let mut kinds = Vec::with_capacity(labels.len());

    for label in labels {
        let kind = spec(label.as_ref())?.kind;
        if !kinds.contains(&kind) {
            kinds.push(kind);
        }
    }

    Ok(kinds)
}

pub fn spec_of(kind: StatementKind) -> &'static StatementSpec {
    match kind {
        StatementKind::BasicInfo => &BASIC_INFO,
        StatementKind::BalanceSheet => &BALANCE_SHEET,
        StatementKind::ComprehensiveIncome => &COMPREHENSIVE_INCOME,
        StatementKind::CashFlow => &CASH_FLOW,
        StatementKind::EquityChanges => &EQUITY_CHANGES,
        StatementKind::FinancialNotes => &FINANCIAL_NOTES,
        StatementKind::DividendDistribution => &DIVIDEND_DISTRIBUTION,
        StatementKind::AccountingReport => &ACCOUNTING_REPORT,
        StatementKind::FinancialAnalysis => &FINANCIAL_ANALYSIS,
    }
}

impl StatementKind {
    pub fn spec(&self) -> &'static StatementSpec {
        spec_of(*self)
    }
}

impl StatementSpec {
    pub fn endpoint_url(&self) -> String {
        twse::mops_url(self.path)
    }

    /// 代入股票與期別後的查詢參數，基本資料沒有期別
    pub fn payload(&self, stock: &Stock, period: Option<&Period>) -> String {
        let mut payload = self
            .payload_template
            .replace("{common}", AJAX_COMMON)
            .replace("{co_id}", &urlencoding::encode(&stock.id));

        if let Some(period) = period {
            let season = match self.season_format {
                SeasonFormat::Padded => period.season.padded(),
                SeasonFormat::Stripped => period.season.stripped(),
            };

            payload = payload
                .replace("{roc_year}", &period.roc_year.to_string())
                .replace("{ad_year}", &period.ad_year.to_string())
                .replace("{season}", &season);
        }

        payload
    }

    /// GET 將參數放在網址上，POST 則作為表單內容
    pub fn request(&self, stock: &Stock, period: Option<&Period>) -> PageRequest {
        let payload = self.payload(stock, period);

        match self.method {
            Method::Get => PageRequest::get(format!("{}?{}", self.endpoint_url(), payload)),
            Method::Post => PageRequest::post(self.endpoint_url(), payload),
        }
    }

    /// 擷取表格中每一列的儲存格文字
    pub fn extract_rows(&self, html: &str) -> Result<Vec<Vec<String>>> {
        let document = Html::parse_document(html);
        element::select_rows(&document, self.row_query, self.cell_query, self.max_cells)
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use crate::declare::Season;

    use super::*;

    #[test]
    fn test_every_kind_has_spec() {
        for kind in StatementKind::iter() {
            assert_eq!(kind.spec().kind, kind);
            assert_eq!(spec(kind.label()).unwrap().kind, kind);
        }
    }

    #[test]
    fn test_unknown_label() {
        match spec("income-statement") {
            Err(CrawlError::UnknownStatementType(label)) => assert_eq!(label, "income-statement"),
            other => panic!("unexpected {:?}", other),
        }

        assert!(matches!(
            parse_kinds(&["balance-sheet", "bogus"]),
            Err(CrawlError::UnknownStatementType(_))
        ));
    }

    #[test]
    fn test_parse_kinds_dedup() {
        let kinds = parse_kinds(&["cash-flow", "basic-info", "cash-flow"]).unwrap();
        assert_eq!(kinds, vec![StatementKind::CashFlow, StatementKind::BasicInfo]);
    }

    #[test]
    fn test_post_payload() {
        let stock = Stock::new("2330", "台積電");
        let period = Period::new(2021, Season::Q2);
        let request = StatementKind::BalanceSheet.spec().request(&stock, Some(&period));

        assert_eq!(request.method, Method::Post);
        assert_eq!(request.url, "https://mops.twse.com.tw/mops/web/ajax_t164sb03");
        let body = request.body.unwrap();
        assert!(body.ends_with("&co_id=2330&year=110&season=02"), "{}", body);
        assert!(body.starts_with("encodeURIComponent=1&step=1"), "{}", body);
    }

    #[test]
    fn test_legacy_payload_strips_season() {
        let stock = Stock::new("1101", "台泥");
        let period = Period::new(2018, Season::Q3);
        let request = StatementKind::FinancialNotes.spec().request(&stock, Some(&period));

        assert_eq!(request.method, Method::Get);
        assert_eq!(
            request.url,
            "https://mops.twse.com.tw/server-java/t164sb01?step=3&CO_ID=1101&SYEAR=2018&SSEASON=3&REPORT_ID=C"
        );
        assert!(request.body.is_none());
    }

    #[test]
    fn test_financial_analysis_uses_roc_year() {
        let stock = Stock::new("2330", "台積電");
        let period = Period::annual(110);
        let payload = StatementKind::FinancialAnalysis
            .spec()
            .payload(&stock, Some(&period));

        assert!(payload.contains("&year=110&"), "{}", payload);
        assert!(!payload.contains("season"), "{}", payload);
    }

    #[test]
    fn test_no_filing_notice() {
        assert_eq!(
            no_filing_notice("<h3>資料庫中查無需求資料 !</h3>"),
            Some("查無需求資料")
        );
        assert_eq!(no_filing_notice("<center>查無資料</center>"), Some("查無資料"));
        assert_eq!(
            no_filing_notice("<h4>FOR SECURITY REASONS, THIS PAGE CAN NOT BE ACCESSED!</h4>"),
            None
        );
    }

    #[test]
    fn test_extract_rows() {
        let html = r#"<table class="hasBorder">
            <tr><th>代號</th><th>會計項目</th></tr>
            <tr><td>1100</td><td>現金及約當現金</td><td>1,234</td></tr>
            <tr><td>1170</td><td>應收帳款淨額</td><td>567</td></tr>
        </table>"#;
        let rows = StatementKind::BalanceSheet.spec().extract_rows(html).unwrap();

        assert_eq!(
            rows,
            vec![
                vec!["1100".to_string(), "現金及約當現金".to_string()],
                vec!["1170".to_string(), "應收帳款淨額".to_string()],
            ]
        );
    }
}
