/// 民國紀年與西元紀年的差距
const ROC_OFFSET: i32 = 1911;

/// Convert ROC year to Gregorian year.
pub fn to_gregorian_year(year: i32) -> i32 {
    year + ROC_OFFSET
}

/// Convert Gregorian year to ROC year.
pub fn to_roc_year(year: i32) -> i32 {
    year - ROC_OFFSET
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_year_conversion() {
        assert_eq!(to_gregorian_year(110), 2021);
        assert_eq!(to_roc_year(2021), 110);
        assert_eq!(to_roc_year(to_gregorian_year(102)), 102);
    }
}
