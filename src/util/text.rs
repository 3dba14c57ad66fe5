use anyhow::{anyhow, Result};
use once_cell::sync::Lazy;
use regex::Regex;

/// 連續的空白、換行、全形空白與 &nbsp;
static WHITESPACE: Lazy<Result<Regex, regex::Error>> =
    Lazy::new(|| Regex::new(r"[\s\u{00a0}\u{3000}]+"));

/// Windows 與 Unix 檔名都不允許的字元
const FILE_NAME_ESCAPE_CHAR: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// Converts a Big5 encoded byte slice to a UTF-8 `String`.
///
/// Undecodable sequences are replaced; an error is returned only when the whole
/// input fails to produce any text.
pub fn big5_2_utf8(data: &[u8]) -> Result<String> {
    let (text, _, had_errors) = encoding_rs::BIG5.decode(data);

    if had_errors && text.trim().is_empty() {
        return Err(anyhow!("Failed to decode {} bytes as BIG5", data.len()));
    }

    Ok(text.into_owned())
}

/// 去除前後空白並把中間連續的空白合併成一個半形空白
pub fn collapse_whitespace(s: &str) -> String {
    match WHITESPACE.as_ref() {
        Ok(re) => re.replace_all(s.trim(), " ").trim().to_string(),
        Err(_) => s.split_whitespace().collect::<Vec<_>>().join(" "),
    }
}

/// 將不能出現在檔名中的字元換成底線
pub fn file_name_safe(s: &str) -> String {
    s.trim()
        .chars()
        .map(|c| {
            if FILE_NAME_ESCAPE_CHAR.contains(&c) || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect()
}
