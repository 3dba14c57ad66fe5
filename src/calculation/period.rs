use std::fmt;

use chrono::{Datelike, NaiveDate};

use crate::{declare::Season, error::CrawlError, util::datetime};

/// 財報期別，`roc_year` 永遠等於 `ad_year - 1911`
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Period {
    /// 民國年
    pub roc_year: i32,
    /// 西元年
    pub ad_year: i32,
    pub season: Season,
}

impl Period {
    pub fn new(ad_year: i32, season: Season) -> Self {
        Period {
            roc_year: datetime::to_roc_year(ad_year),
            ad_year,
            season,
        }
    }

    pub fn from_roc_year(roc_year: i32, season: Season) -> Self {
        Self::new(datetime::to_gregorian_year(roc_year), season)
    }

    /// 財務分析使用的年度虛擬期別(季別 00)
    pub fn annual(roc_year: i32) -> Self {
        Self::from_roc_year(roc_year, Season::Annual)
    }

    /// 工作表名稱，例︰2021_02
    pub fn sheet_name(&self) -> String {
        format!("{}_{}", self.ad_year, self.season)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sheet_name())
    }
}

/// 季報的法定公告期限，年度虛擬期別沒有期限
///
/// Q1 5/15、Q2 8/14、Q3 11/14、Q4 為隔年 3/31
pub fn deadline(ad_year: i32, season: Season) -> Option<NaiveDate> {
    match season {
        Season::Annual => None,
        Season::Q1 => NaiveDate::from_ymd_opt(ad_year, 5, 15),
        Season::Q2 => NaiveDate::from_ymd_opt(ad_year, 8, 14),
        Season::Q3 => NaiveDate::from_ymd_opt(ad_year, 11, 14),
        Season::Q4 => NaiveDate::from_ymd_opt(ad_year + 1, 3, 31),
    }
}

/// 截至 `now` 已過公告期限的季度，由近至遠排列
///
/// 從今年往回推到 `earliest_ad_year`(含)，每年依 Q4、Q3、Q2、Q1 的順序檢查。
pub fn compute_available_periods(now: NaiveDate, earliest_ad_year: i32) -> Vec<Period> {
    let current_year = now.year();
    let capacity = (current_year - earliest_ad_year + 1).max(0) as usize * 4;
    let mut periods = Vec::with_capacity(capacity);

    for ad_year in (earliest_ad_year..=current_year).rev() {
        for season in Season::descending() {
            if deadline(ad_year, season).is_some_and(|d| now > d) {
                periods.push(Period::new(ad_year, season));
            }
        }
    }

    periods
}

/// 依 1 起算、頭尾皆含的序號取出部分期別
///
/// 起始留空視為 1，結束留空視為全部；結束超過長度時以長度為準。
pub fn slice(periods: &[Period], start: &str, end: &str) -> Result<Vec<Period>, CrawlError> {
    let start_index = parse_bound(start)?.unwrap_or(1);
    let end_bound = parse_bound(end)?;

    if start_index == 0 || end_bound == Some(0) {
        return Err(CrawlError::InvalidRange(format!(
            "season index starts from 1 (start:'{}', end:'{}')",
            start, end
        )));
    }

    if let Some(end_index) = end_bound {
        if start_index > end_index {
            return Err(CrawlError::InvalidRange(format!(
                "start {} is greater than end {}",
                start_index, end_index
            )));
        }
    }

    if periods.is_empty() {
        return Ok(Vec::new());
    }

    let end_index = end_bound.unwrap_or(periods.len()).min(periods.len());
    if start_index > end_index {
        return Err(CrawlError::InvalidRange(format!(
            "start {} is greater than the {} available periods",
            start_index, end_index
        )));
    }

    Ok(periods[start_index - 1..end_index].to_vec())
}

fn parse_bound(bound: &str) -> Result<Option<usize>, CrawlError> {
    let bound = bound.trim();
    if bound.is_empty() {
        return Ok(None);
    }

    bound
        .parse::<usize>()
        .map(Some)
        .map_err(|why| CrawlError::InvalidRange(format!("'{}' is not an index: {}", bound, why)))
}

/// 期別中出現過的民國年，保留第一次出現的順序
pub fn distinct_years(periods: &[Period]) -> Vec<i32> {
    let mut years: Vec<i32> = Vec::with_capacity(periods.len() / 4 + 1);

    for period in periods {
        if !years.contains(&period.roc_year) {
            years.push(period.roc_year);
        }
    }

    years
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_compute_available_periods_reference_date() {
        let periods = compute_available_periods(date(2021, 9, 1), 2013);
        let head: Vec<(i32, Season)> = periods.iter().take(4).map(|p| (p.ad_year, p.season)).collect();

        assert_eq!(
            head,
            vec![
                (2021, Season::Q2),
                (2021, Season::Q1),
                (2020, Season::Q4),
                (2020, Season::Q3)
            ]
        );
        assert_eq!(periods.last().map(|p| (p.ad_year, p.season)), Some((2013, Season::Q1)));
    }

    #[test]
    fn test_deadline_is_exclusive() {
        // 公告期限當天還不算可取得
        let periods = compute_available_periods(date(2021, 8, 14), 2021);
        assert_eq!(periods.first().map(|p| p.season), Some(Season::Q1));

        let periods = compute_available_periods(date(2021, 8, 15), 2021);
        assert_eq!(periods.first().map(|p| p.season), Some(Season::Q2));
    }

    #[test]
    fn test_q4_deadline_is_next_year() {
        let periods = compute_available_periods(date(2021, 3, 31), 2020);
        assert_eq!(periods.first().map(|p| (p.ad_year, p.season)), Some((2020, Season::Q3)));

        let periods = compute_available_periods(date(2021, 4, 1), 2020);
        assert_eq!(periods.first().map(|p| (p.ad_year, p.season)), Some((2020, Season::Q4)));
    }

    #[test]
    fn test_never_includes_future_deadline() {
        let mut now = date(2019, 1, 1);
        let last = date(2022, 12, 31);

        while now <= last {
            for p in compute_available_periods(now, 2015) {
                let d = deadline(p.ad_year, p.season).unwrap();
                assert!(now > d, "{} is not available on {}", p, now);
                assert_eq!(p.roc_year, p.ad_year - 1911);
            }
            now = now.succ_opt().unwrap();
        }
    }

    #[test]
    fn test_earliest_year_after_now() {
        assert!(compute_available_periods(date(2012, 6, 1), 2013).is_empty());
    }

    #[test]
    fn test_slice() {
        let periods = compute_available_periods(date(2021, 9, 1), 2019);

        assert_eq!(slice(&periods, "", "").unwrap(), periods);
        assert_eq!(slice(&periods, "2", "2").unwrap(), vec![periods[1]]);
        assert_eq!(slice(&periods, "", "3").unwrap(), periods[..3].to_vec());
        assert_eq!(slice(&periods, "3", "").unwrap(), periods[2..].to_vec());
        assert_eq!(slice(&periods, "1", "999").unwrap(), periods);
    }

    #[test]
    fn test_slice_invalid() {
        let periods = compute_available_periods(date(2021, 9, 1), 2019);

        assert!(matches!(slice(&periods, "3", "2"), Err(CrawlError::InvalidRange(_))));
        assert!(matches!(slice(&periods, "0", ""), Err(CrawlError::InvalidRange(_))));
        assert!(matches!(slice(&periods, "a", ""), Err(CrawlError::InvalidRange(_))));
        assert!(matches!(slice(&periods, "99", ""), Err(CrawlError::InvalidRange(_))));
        assert!(slice(&[], "", "").unwrap().is_empty());
    }

    #[test]
    fn test_distinct_years() {
        let periods = compute_available_periods(date(2021, 9, 1), 2019);
        assert_eq!(distinct_years(&periods), vec![110, 109, 108]);
        assert!(distinct_years(&[]).is_empty());
    }

    #[test]
    fn test_period() {
        let p = Period::annual(110);
        assert_eq!(p.ad_year, 2021);
        assert_eq!(p.sheet_name(), "2021_00");
        assert_eq!(Period::new(2020, Season::Q4).to_string(), "2020_04");
        assert_eq!(Period::new(2020, Season::Q4).roc_year, 109);
    }
}
