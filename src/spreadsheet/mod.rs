use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context, Result};
use calamine::{open_workbook_auto, Data, Reader};
use rust_xlsxwriter::Workbook as XlsxWorkbook;

/// 新活頁簿的預設工作表名稱
pub const DEFAULT_SHEET: &str = "Sheet1";

/// 要寫入工作表的資料︰整張表、單一列或單一儲存格
#[derive(Debug, Clone, PartialEq)]
pub enum Rows {
    Table(Vec<Vec<String>>),
    Row(Vec<String>),
    Cell(String),
}

impl From<Vec<Vec<String>>> for Rows {
    fn from(rows: Vec<Vec<String>>) -> Self {
        Rows::Table(rows)
    }
}

impl From<Vec<String>> for Rows {
    fn from(row: Vec<String>) -> Self {
        Rows::Row(row)
    }
}

impl From<String> for Rows {
    fn from(cell: String) -> Self {
        Rows::Cell(cell)
    }
}

impl From<&str> for Rows {
    fn from(cell: &str) -> Self {
        Rows::Cell(cell.to_string())
    }
}

#[derive(Debug, Clone)]
struct Sheet {
    name: String,
    rows: Vec<Vec<String>>,
}

impl Sheet {
    fn new(name: &str) -> Self {
        Sheet {
            name: name.to_string(),
            rows: Vec::new(),
        }
    }
}

/// 只保存文字內容的活頁簿
///
/// 既有檔案以 calamine 讀入，存檔時以 rust_xlsxwriter 整本重寫。
#[derive(Debug)]
pub struct Book {
    path: PathBuf,
    sheets: Vec<Sheet>,
    active: Option<usize>,
}

impl Book {
    /// 開啟活頁簿，檔案不存在時建立一本空的(尚未寫入磁碟)
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if !Self::exists(&path) {
            return Ok(Book {
                path,
                sheets: Vec::new(),
                active: None,
            });
        }

        let sheets = read_sheets(&path)?;
        let active = if sheets.is_empty() { None } else { Some(0) };

        Ok(Book {
            path,
            sheets,
            active,
        })
    }

    /// 活頁簿檔案是否存在
    pub fn exists(path: impl AsRef<Path>) -> bool {
        path.as_ref().is_file()
    }

    pub fn sheet_exists(&self, name: &str) -> bool {
        self.sheets.iter().any(|s| s.name == name)
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }

    /// 開啟工作表，不存在則先建立，並設為作用中的工作表
    pub fn open_sheet(&mut self, name: &str) {
        self.activate(name);
    }

    fn activate(&mut self, name: &str) -> usize {
        let index = match self.sheets.iter().position(|s| s.name == name) {
            Some(index) => index,
            None => {
                self.sheets.push(Sheet::new(name));
                self.sheets.len() - 1
            }
        };

        self.active = Some(index);
        index
    }

    /// 移除工作表，用於存檔失敗時還原記憶體中的內容
    pub fn remove_sheet(&mut self, name: &str) -> bool {
        let index = match self.sheets.iter().position(|s| s.name == name) {
            Some(index) => index,
            None => return false,
        };

        self.sheets.remove(index);
        self.active = match self.active {
            Some(active) if active == index => None,
            Some(active) if active > index => Some(active - 1),
            other => other,
        };

        true
    }

    /// 附加到作用中工作表的最後，沒有作用中工作表時使用預設工作表
    pub fn append(&mut self, rows: impl Into<Rows>) {
        let index = match self.active {
            Some(index) => index,
            None => self.activate(DEFAULT_SHEET),
        };

        let sheet = &mut self.sheets[index];
        match rows.into() {
            Rows::Table(table) => sheet.rows.extend(table),
            Rows::Row(row) => sheet.rows.push(row),
            Rows::Cell(cell) => sheet.rows.push(vec![cell]),
        }
    }

    /// 作用中工作表的內容
    pub fn active_rows(&self) -> Option<&[Vec<String>]> {
        self.active
            .and_then(|i| self.sheets.get(i))
            .map(|s| s.rows.as_slice())
    }

    /// 寫入磁碟，先寫暫存檔再改名，避免中斷時留下損毀的檔案
    pub fn save(&self) -> Result<()> {
        let mut workbook = XlsxWorkbook::new();

        if self.sheets.is_empty() {
            workbook
                .add_worksheet()
                .set_name(DEFAULT_SHEET)
                .map_err(|why| anyhow!("sheet name error: {:?}", why))?;
        }

        for sheet in &self.sheets {
            let worksheet = workbook.add_worksheet();
            worksheet
                .set_name(&sheet.name)
                .map_err(|why| anyhow!("sheet name error({}): {:?}", sheet.name, why))?;

            for (row, cells) in sheet.rows.iter().enumerate() {
                for (col, value) in cells.iter().enumerate() {
                    if value.is_empty() {
                        continue;
                    }

                    worksheet
                        .write_string(row as u32, col as u16, value)
                        .map_err(|why| {
                            anyhow!("Failed to write {}!{}:{} because {:?}", sheet.name, row, col, why)
                        })?;
                }
            }
        }

        let bytes = workbook
            .save_to_buffer()
            .map_err(|why| anyhow!("Failed to serialize workbook because {:?}", why))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("create directory {}", parent.display()))?;
            }
        }

        let temp_path = self.path.with_extension("xlsx.tmp");
        fs::write(&temp_path, &bytes)
            .with_context(|| format!("write {}", temp_path.display()))?;
        if let Err(why) = fs::rename(&temp_path, &self.path) {
            let _ = fs::remove_file(&temp_path);
            return Err(why).with_context(|| {
                format!("rename {} to {}", temp_path.display(), self.path.display())
            });
        }

        Ok(())
    }
}

fn read_sheets(path: &Path) -> Result<Vec<Sheet>> {
    let mut workbook =
        open_workbook_auto(path).with_context(|| format!("open workbook {}", path.display()))?;
    let sheet_names = workbook.sheet_names().to_owned();
    let mut sheets = Vec::with_capacity(sheet_names.len());

    for sheet_name in sheet_names {
        let range = workbook
            .worksheet_range(&sheet_name)
            .with_context(|| format!("read worksheet range {}", sheet_name))?;
        let mut sheet = Sheet::new(&sheet_name);
        let (row_offset, col_offset) = range.start().unwrap_or((0, 0));

        sheet
            .rows
            .extend((0..row_offset).map(|_| Vec::<String>::new()));

        for row in range.rows() {
            let mut cells = vec![String::new(); col_offset as usize];
            cells.extend(row.iter().map(cell_text));

            while cells.last().is_some_and(|c| c.is_empty()) {
                cells.pop();
            }

            sheet.rows.push(cells);
        }

        sheets.push(sheet);
    }

    Ok(sheets)
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_open_missing_book() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("2330(台積電)_資產負債表.xlsx");

        assert!(!Book::exists(&path));
        let book = Book::open(&path).unwrap();
        assert!(book.sheet_names().is_empty());
        assert!(!book.sheet_exists("2021_02"));
        assert!(!Book::exists(&path));
    }

    #[test]
    fn test_save_and_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("books").join("2330(台積電)_資產負債表.xlsx");

        let mut book = Book::open(&path).unwrap();
        book.open_sheet("2021_02");
        book.append(vec![row(&["現金及約當現金", "1,234"]), row(&["應收帳款", ""])]);
        book.append(row(&["資產總計", "9,999"]));
        book.append("備註");
        book.save().unwrap();

        assert!(Book::exists(&path));
        assert!(!path.with_extension("xlsx.tmp").exists());

        let mut reopened = Book::open(&path).unwrap();
        assert!(reopened.sheet_exists("2021_02"));
        assert_eq!(
            reopened.active_rows().unwrap(),
            &[
                row(&["現金及約當現金", "1,234"]),
                row(&["應收帳款"]),
                row(&["資產總計", "9,999"]),
                row(&["備註"]),
            ]
        );

        reopened.open_sheet("2021_01");
        reopened.append(row(&["現金及約當現金", "1,000"]));
        reopened.save().unwrap();

        let again = Book::open(&path).unwrap();
        assert_eq!(again.sheet_names(), vec!["2021_02", "2021_01"]);
    }

    #[test]
    fn test_append_without_sheet_uses_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("2330(台積電).xlsx");

        let mut book = Book::open(&path).unwrap();
        book.append(vec![row(&["公司名稱", "台灣積體電路製造股份有限公司"])]);
        book.save().unwrap();

        let reopened = Book::open(&path).unwrap();
        assert_eq!(reopened.sheet_names(), vec![DEFAULT_SHEET]);
    }

    #[test]
    fn test_remove_sheet() {
        let mut book = Book::open("not-saved.xlsx").unwrap();
        book.open_sheet("2021_02");
        book.open_sheet("2021_01");
        book.append("1");

        assert!(book.remove_sheet("2021_02"));
        assert!(!book.remove_sheet("2020_04"));
        assert_eq!(book.sheet_names(), vec!["2021_01"]);
        assert_eq!(book.active_rows().unwrap(), &[row(&["1"])]);

        assert!(book.remove_sheet("2021_01"));
        assert!(book.active_rows().is_none());
    }

    #[test]
    fn test_append_after_remove_uses_default_sheet() {
        let mut book = Book::open("not-saved.xlsx").unwrap();
        book.open_sheet(DEFAULT_SHEET);
        book.open_sheet("2021_02");
        book.open_sheet("2021_01");
        book.open_sheet("2021_02");
        book.remove_sheet("2021_02");
        book.append("v");

        assert_eq!(book.sheet_names(), vec![DEFAULT_SHEET, "2021_01"]);
        assert_eq!(book.active_rows().unwrap(), &[row(&["v"])]);
        book.open_sheet("2021_01");
        assert!(book.active_rows().unwrap().is_empty());
    }

    #[test]
    fn test_save_onto_directory_fails_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("2330(台積電)_現金流量表.xlsx");
        fs::create_dir_all(&path).unwrap();

        let mut book = Book::open(&path).unwrap();
        book.open_sheet("2021_02");
        book.append("1");

        assert!(book.save().is_err());
        assert!(!path.with_extension("xlsx.tmp").exists());
    }

    #[test]
    fn test_open_sheet_activates_existing() {
        let mut book = Book::open("not-saved.xlsx").unwrap();
        book.open_sheet("a");
        book.append("1");
        book.open_sheet("b");
        book.open_sheet("a");
        book.append("2");

        assert_eq!(book.sheet_names(), vec!["a", "b"]);
        assert_eq!(book.active_rows().unwrap(), &[row(&["1"]), row(&["2"])]);
    }
}
