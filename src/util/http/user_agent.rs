//! 隨機產生桌面瀏覽器的 User-Agent，公開資訊觀測站的頁面只針對桌面版排版

const FIREFOX_VERSIONS: [&str; 12] = [
    "133.0", "132.0", "131.0", "130.0", "129.0", "128.0", "127.0", "126.0", "125.0", "124.0",
    "123.0", "122.0",
];

const CHROME_VERSIONS: [&str; 16] = [
    "133.0.6943.60", "133.0.6943.88", "132.0.6834.83", "132.0.6834.110", "131.0.6778.85",
    "131.0.6778.108", "130.0.6723.92", "130.0.6723.117", "129.0.6668.70", "129.0.6668.89",
    "128.0.6613.120", "128.0.6613.138", "127.0.6533.88", "127.0.6533.119", "126.0.6478.126",
    "126.0.6478.182",
];

const EDGE_VERSIONS: [&str; 10] = [
    "133.0.3048.56", "133.0.3048.46", "132.0.2957.55", "132.0.2957.63", "131.0.2903.86",
    "131.0.2903.112", "130.0.2849.68", "130.0.2849.80", "129.0.2792.52", "129.0.2792.65",
];

const DESKTOP_OS: [&str; 12] = [
    // Windows 比例較高
    "Windows NT 10.0; Win64; x64",
    "Windows NT 10.0; Win64; x64",
    "Windows NT 10.0; Win64; x64",
    "Windows NT 10.0; Win64; x64",
    "Windows NT 10.0; WOW64",
    "Windows NT 6.1; Win64; x64",
    "Macintosh; Intel Mac OS X 10_15_7",
    "Macintosh; Intel Mac OS X 13_6_9",
    "Macintosh; Intel Mac OS X 14_7_1",
    "X11; Linux x86_64",
    "X11; Ubuntu; Linux x86_64",
    "X11; CrOS x86_64 15917.22.0",
];

fn pick<'a>(items: &[&'a str]) -> &'a str {
    items[rand::random_range(0..items.len())]
}

fn gen_firefox_ua() -> String {
    let version = pick(&FIREFOX_VERSIONS);
    format!(
        "Mozilla/5.0 ({}; rv:{}) Gecko/20100101 Firefox/{}",
        pick(&DESKTOP_OS),
        version,
        version
    )
}

fn gen_chrome_ua() -> String {
    format!(
        "Mozilla/5.0 ({}) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/{} Safari/537.36",
        pick(&DESKTOP_OS),
        pick(&CHROME_VERSIONS)
    )
}

fn gen_edge_ua() -> String {
    let version = pick(&EDGE_VERSIONS);
    let major = version.split('.').next().unwrap_or("133");
    // Edge 只出現在 Windows 與 macOS
    let os = pick(&DESKTOP_OS[..9]);

    format!(
        "Mozilla/5.0 ({}) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/{}.0.0.0 Safari/537.36 Edg/{}",
        os, major, version
    )
}

/// 依市佔比例隨機挑選一種瀏覽器的 User-Agent
pub fn gen_random_ua() -> String {
    match rand::random_range(0..10u32) {
        0..=5 => gen_chrome_ua(),
        6..=7 => gen_edge_ua(),
        _ => gen_firefox_ua(),
    }
}
