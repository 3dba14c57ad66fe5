use anyhow::{anyhow, Result};
use scraper::Html;
use tokio_retry::{
    strategy::{jitter, ExponentialBackoff},
    Retry,
};

use crate::{
    crawler::{twse, Encoding, Fetcher, PageRequest},
    declare::Stock,
    logging,
    util::http::element,
};

/// 只收錄這個分類下的有價證券
const REQUIRED_CATEGORY: &str = "股票";

/// 上市有價證券的國際證券辨識號碼一覽表(Big5)
pub fn listing_request() -> PageRequest {
    PageRequest::get(format!(
        "https://isin.{host}/isin/C_public.jsp?strMode=2",
        host = twse::HOST
    ))
    .with_encoding(Encoding::Big5)
}

/// 取得上市公司代號/名稱列表，失敗時以指數退避重試
pub async fn visit(fetcher: &dyn Fetcher) -> Result<Vec<Stock>> {
    let request = listing_request();
    let strategy = ExponentialBackoff::from_millis(500)
        .map(jitter) // add jitter to delays
        .take(3); // limit to 3 retries
    let html = Retry::spawn(strategy, || fetcher.download(&request))
        .await
        .map_err(|why| anyhow!("Failed to download the company listing because {:?}", why))?;
    let stocks = parse(&html)?;

    logging::info_file_async(format!("上市公司共 {} 家", stocks.len()));

    Ok(stocks)
}

/// 解析一覽表，分類列只有一個儲存格，其後的資料列第一格為「代號　名稱」
pub fn parse(html: &str) -> Result<Vec<Stock>> {
    let document = Html::parse_document(html);
    let selector = element::selector("table.h4 tr")?;
    let mut result = Vec::with_capacity(1024);
    let mut is_required_category = false;

    for tr in document.select(&selector) {
        let cells = element::child_elements(&tr);

        if cells.len() == 1 {
            is_required_category = element::text_of(&cells[0]) == REQUIRED_CATEGORY;
            continue;
        }

        if !is_required_category || cells.len() < 2 {
            continue;
        }

        let code_and_name = cells[0].text().collect::<String>();
        let mut split = code_and_name.trim().splitn(2, '\u{3000}');
        let (id, name) = match (split.next(), split.next()) {
            (Some(id), Some(name)) => (id.trim(), name.trim()),
            // 名稱和代碼有缺
            _ => continue,
        };

        if !is_stock_id(id) || name.is_empty() {
            continue;
        }

        result.push(Stock::new(id, name));
    }

    Ok(result)
}

/// 股票代號固定為四碼英數字
fn is_stock_id(id: &str) -> bool {
    id.len() == 4 && id.chars().all(|c| c.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = "<html><body>
        <table class='h4' align=center cellSpacing=3 cellPadding=2 width=750 border=0>
        <tr align=center><td bgcolor=#D5FFD5>有價證券代號及名稱 </td><td bgcolor=#D5FFD5>國際證券辨識號碼(ISIN Code)</td><td bgcolor=#D5FFD5>上市日</td></tr>
        <tr><td bgcolor=#FAFAD2 colspan=7 ><B> 股票 <B> </td></tr>
        <tr><td bgcolor=#FAFAD2>1101\u{3000}台泥</td><td bgcolor=#FAFAD2>TW0001101004</td><td bgcolor=#FAFAD2>1962/02/09</td></tr>
        <tr><td bgcolor=#FAFAD2>2330\u{3000}台積電</td><td bgcolor=#FAFAD2>TW0002330008</td><td bgcolor=#FAFAD2>1994/09/05</td></tr>
        <tr><td bgcolor=#FAFAD2>11011\u{3000}台泥甲特</td><td bgcolor=#FAFAD2>TW0001101004</td><td bgcolor=#FAFAD2>1962/02/09</td></tr>
        <tr><td bgcolor=#FAFAD2 colspan=7 ><B> 上市認購(售)權證 <B> </td></tr>
        <tr><td bgcolor=#FAFAD2>0300\u{3000}某權證</td><td bgcolor=#FAFAD2>TW00003000</td><td bgcolor=#FAFAD2>2021/01/01</td></tr>
        </table></body></html>";

    #[test]
    fn test_parse() {
        let stocks = parse(LISTING).unwrap();
        assert_eq!(
            stocks,
            vec![Stock::new("1101", "台泥"), Stock::new("2330", "台積電")]
        );
    }

    #[test]
    fn test_is_stock_id() {
        assert!(is_stock_id("2330"));
        assert!(is_stock_id("00A1"));
        assert!(!is_stock_id("11011"));
        assert!(!is_stock_id("23 0"));
    }

    #[tokio::test]
    #[ignore]
    async fn test_visit() {
        dotenv::dotenv().ok();
        logging::debug_file_async("開始 visit".to_string());

        match visit(&crate::crawler::HttpFetcher).await {
            Ok(list) => logging::debug_file_async(format!("data:{:#?}", list)),
            Err(why) => logging::debug_file_async(format!("Failed to visit because: {:?}", why)),
        }

        logging::debug_file_async("結束 visit".to_string());
    }
}
