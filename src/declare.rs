use std::fmt;

use strum_macros::{AsRefStr, EnumIter, EnumString};

/// 季度，`Annual` 為年度資料使用的虛擬季別 00
#[derive(PartialEq, Eq, Hash, Debug, Copy, Clone, PartialOrd, Ord)]
#[repr(u32)]
pub enum Season {
    /// 年度 00
    Annual = 0,
    /// 第一季 01
    Q1 = 1,
    /// 第二季 02
    Q2 = 2,
    /// 第三季 03
    Q3 = 3,
    /// 第四季 04
    Q4 = 4,
}

impl Season {
    pub fn serial(&self) -> u32 {
        *self as u32
    }

    /// 兩位數補零的季別，例︰02
    pub fn padded(&self) -> String {
        format!("{:02}", self.serial())
    }

    /// 去除前導零的季別，例︰2
    pub fn stripped(&self) -> String {
        self.serial().to_string()
    }

    /// 由近至遠的季度順序
    pub fn descending() -> impl Iterator<Item = Self> {
        [Self::Q4, Self::Q3, Self::Q2, Self::Q1].iter().copied()
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.padded())
    }
}

/// 報表類型
#[derive(PartialEq, Eq, Hash, Debug, Copy, Clone, EnumIter, EnumString, AsRefStr)]
#[strum(serialize_all = "kebab-case")]
pub enum StatementKind {
    /// 基本資料
    BasicInfo,
    /// 資產負債表
    BalanceSheet,
    /// 綜合損益表
    ComprehensiveIncome,
    /// 現金流量表
    CashFlow,
    /// 權益變動表
    EquityChanges,
    /// 財務報告附註
    FinancialNotes,
    /// 股利分派情形
    DividendDistribution,
    /// 會計師查核報告
    AccountingReport,
    /// 財務分析
    FinancialAnalysis,
}

impl StatementKind {
    /// 設定檔與記錄使用的標籤，例︰balance-sheet
    pub fn label(&self) -> &str {
        self.as_ref()
    }

    /// 活頁簿檔名使用的中文名稱
    pub fn title(&self) -> &'static str {
        match self {
            StatementKind::BasicInfo => "基本資料",
            StatementKind::BalanceSheet => "資產負債表",
            StatementKind::ComprehensiveIncome => "綜合損益表",
            StatementKind::CashFlow => "現金流量表",
            StatementKind::EquityChanges => "權益變動表",
            StatementKind::FinancialNotes => "財務報告附註",
            StatementKind::DividendDistribution => "股利分派情形",
            StatementKind::AccountingReport => "會計師查核報告",
            StatementKind::FinancialAnalysis => "財務分析",
        }
    }

    /// 以季為單位公告的報表
    pub fn is_quarterly(&self) -> bool {
        !matches!(
            self,
            StatementKind::BasicInfo | StatementKind::FinancialAnalysis
        )
    }

    pub fn quarterly() -> impl Iterator<Item = Self> {
        [
            Self::BalanceSheet,
            Self::ComprehensiveIncome,
            Self::CashFlow,
            Self::EquityChanges,
            Self::FinancialNotes,
            Self::DividendDistribution,
            Self::AccountingReport,
        ]
        .iter()
        .copied()
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// 上市公司
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Stock {
    /// 股票代號，固定四碼
    pub id: String,
    pub name: String,
}

impl Stock {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Stock {
            id: id.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for Stock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.id, self.name)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn test_season_format() {
        assert_eq!(Season::Q2.to_string(), "02");
        assert_eq!(Season::Annual.padded(), "00");
        assert_eq!(Season::Q3.stripped(), "3");
        assert_eq!(Season::Q4.serial(), 4);
        assert_eq!(
            Season::descending().collect::<Vec<_>>(),
            vec![Season::Q4, Season::Q3, Season::Q2, Season::Q1]
        );
    }

    #[test]
    fn test_statement_kind_labels() {
        assert_eq!(StatementKind::BalanceSheet.label(), "balance-sheet");
        assert_eq!(
            StatementKind::from_str("financial-analysis").ok(),
            Some(StatementKind::FinancialAnalysis)
        );
        assert!(StatementKind::from_str("income-statement").is_err());
        assert_eq!(StatementKind::iter().count(), 9);
        assert_eq!(StatementKind::quarterly().count(), 7);
        assert!(StatementKind::quarterly().all(|k| k.is_quarterly()));
    }
}
