use crate::declare::Stock;

const LOWEST_ID: &str = "0000";
const HIGHEST_ID: &str = "9999";

/// 保留代號落在 [start_id, finish_id] 之間的股票，順序不變
///
/// 代號以字串比較(保留前導零的排序)，留空代表不設限。
pub fn filter_by_range(stocks: &[Stock], start_id: &str, finish_id: &str) -> Vec<Stock> {
    let start = bound_or(start_id, LOWEST_ID);
    let finish = bound_or(finish_id, HIGHEST_ID);

    stocks
        .iter()
        .filter(|stock| stock.id.as_str() >= start && stock.id.as_str() <= finish)
        .cloned()
        .collect()
}

fn bound_or<'a>(bound: &'a str, default: &'a str) -> &'a str {
    let bound = bound.trim();
    if bound.is_empty() {
        default
    } else {
        bound
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stocks() -> Vec<Stock> {
        vec![
            Stock::new("1101", "台泥"),
            Stock::new("2330", "台積電"),
            Stock::new("0050", "元大台灣50"),
            Stock::new("2317", "鴻海"),
            Stock::new("9958", "世紀鋼"),
        ]
    }

    #[test]
    fn test_full_range_is_unchanged() {
        let all = stocks();
        assert_eq!(filter_by_range(&all, "0000", "9999"), all);
        assert_eq!(filter_by_range(&all, "", ""), all);
    }

    #[test]
    fn test_single_id() {
        let result = filter_by_range(&stocks(), "2330", "2330");
        assert_eq!(result, vec![Stock::new("2330", "台積電")]);
    }

    #[test]
    fn test_lexicographic_range() {
        let ids: Vec<String> = filter_by_range(&stocks(), "0050", "2317")
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, vec!["1101", "0050", "2317"]);

        assert!(filter_by_range(&stocks(), "2400", "2500").is_empty());
    }
}
