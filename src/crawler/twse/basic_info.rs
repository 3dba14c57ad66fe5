use anyhow::Result;
use hashbrown::HashMap;
use scraper::{ElementRef, Html};

use crate::{declare::StatementKind, util::http::element};

/// 依出現順序保存的欄位名稱與值，重複的欄位以後出現的值為準
#[derive(Debug, Default)]
struct Fields {
    entries: Vec<(String, String)>,
    index: HashMap<String, usize>,
}

impl Fields {
    fn set(&mut self, key: &str, value: &str) {
        if key.is_empty() {
            return;
        }

        match self.index.get(key) {
            Some(&i) => self.entries[i].1 = value.to_string(),
            None => {
                self.index.insert(key.to_string(), self.entries.len());
                self.entries.push((key.to_string(), value.to_string()));
            }
        }
    }

    fn into_rows(self) -> Vec<Vec<String>> {
        self.entries.into_iter().map(|(k, v)| vec![k, v]).collect()
    }
}

/// 將公司基本資料頁轉成 [欄位, 值] 的列
///
/// 一般列為 th/td 交錯，th 為欄位名稱，緊接的 td 為值；少數以文字開頭的列另外處理。
pub fn extract(html: &str) -> Result<Vec<Vec<String>>> {
    let document = Html::parse_document(html);
    let row_selector = element::selector(StatementKind::BasicInfo.spec().row_query)?;
    let mut fields = Fields::default();

    for tr in document.select(&row_selector) {
        let cells: Vec<ElementRef<'_>> = element::child_elements(&tr)
            .into_iter()
            .filter(|c| matches!(element::tag_name(c), "th" | "td"))
            .collect();
        let texts: Vec<String> = cells.iter().map(element::text_of).collect();
        let text = |i: usize| texts.get(i).map(String::as_str).unwrap_or("");

        match text(0) {
            "本公司" => {
                fields.set(text(2), text(1));
                fields.set(text(5), text(4));
            }
            "本公司採" => fields.set("會計年度月制(現)", text(1)),
            "本公司於" => {
                fields.set("會計年度月制(前)", text(3));
                fields.set("會計年度月制轉換", text(1));
            }
            "編製財務報告類型" => {
                fields.set(text(0), &checked_option(text(1)));
                continue;
            }
            _ => {}
        }

        // 除了財報類型外，其餘列(包含上面的特殊列)都再依 th/td 配對
        let mut title = String::new();
        for (cell, value) in cells.iter().zip(texts.iter()) {
            match element::tag_name(cell) {
                "th" => {
                    title.clone_from(value);
                    fields.set(&title, "");
                }
                "td" if !title.is_empty() => fields.set(&title, value),
                _ => {}
            }
        }
    }

    Ok(fields.into_rows())
}

/// "○個別 ●合併" => "合併"
fn checked_option(text: &str) -> String {
    match text.split_once('●') {
        Some((_, rest)) => rest
            .chars()
            .take_while(|c| *c != '○' && !c.is_whitespace())
            .collect(),
        None => text.to_string(),
    }
}
