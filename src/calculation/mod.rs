/// 可公告季度、民國/西元年度換算與區間切片
pub mod period;
/// 依股票代號區間篩選
pub mod stock_range;
