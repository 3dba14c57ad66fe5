/// 公司基本資料
pub mod basic_info;
/// 上市公司名單
pub mod company;
/// 財務報表種類與表格擷取
pub mod statement;

const HOST: &str = "twse.com.tw";

/// 公開資訊觀測站
fn mops_url(path: &str) -> String {
    format!("https://mops.{host}/{path}", host = HOST)
}
