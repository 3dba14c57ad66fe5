use anyhow::{anyhow, Result};
use scraper::{ElementRef, Html, Selector};

use crate::util::text;

/// Parses a CSS selector, turning the borrowed parse error into an owned one.
pub fn selector(css_selector: &str) -> Result<Selector> {
    Selector::parse(css_selector)
        .map_err(|why| anyhow!("Failed to Selector::parse({}) because: {:?}", css_selector, why))
}

/// 節點的標籤名稱，例︰th、td
pub fn tag_name<'a>(element: &ElementRef<'a>) -> &'a str {
    element.value().name()
}

/// 節點內所有文字，去除前後空白並合併連續空白
pub fn text_of(element: &ElementRef<'_>) -> String {
    text::collapse_whitespace(&element.text().collect::<String>())
}

/// 直接子節點中的元素(略過文字節點)
pub fn child_elements<'a>(element: &ElementRef<'a>) -> Vec<ElementRef<'a>> {
    element.children().filter_map(ElementRef::wrap).collect()
}

/// Extracts the text of each cell in every row matched by `row_selector`.
///
/// Cells are looked up inside each row with `cell_selector`; when `max_cells`
/// is set only the leading cells are kept. Rows without any matching cell
/// (header rows, spacer rows) are skipped.
///
/// # Example
///
/// ```ignore
/// let html = r#"<table class="hasBorder"><tr><th>會計項目</th></tr><tr><td>現金</td><td>100</td></tr></table>"#;
/// let document = Html::parse_document(html);
/// let rows = select_rows(&document, "table.hasBorder tr", "td", None)?;
/// assert_eq!(rows, vec![vec!["現金".to_string(), "100".to_string()]]);
/// ```
pub fn select_rows(
    document: &Html,
    row_selector: &str,
    cell_selector: &str,
    max_cells: Option<usize>,
) -> Result<Vec<Vec<String>>> {
    let row_selector = selector(row_selector)?;
    let cell_selector = selector(cell_selector)?;
    let take = max_cells.unwrap_or(usize::MAX);
    let mut rows = Vec::with_capacity(128);

    for tr in document.select(&row_selector) {
        let cells: Vec<String> = tr
            .select(&cell_selector)
            .take(take)
            .map(|cell| text_of(&cell))
            .collect();

        if cells.is_empty() {
            continue;
        }

        rows.push(cells);
    }

    Ok(rows)
}
