use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // youtube.com (www / m / music 子域) 与 youtu.be，协议可省略
    static ref SUPPORTED_HOST: Regex = Regex::new(
        r"(?i)^(https?://)?((www|m|music)\.)?(youtube\.com|youtu\.be)(/|$)"
    )
    .unwrap();
}

/// 判断输入是否为可预览的链接
pub fn is_supported_url(input: &str) -> bool {
    let input = input.trim();
    !input.is_empty() && SUPPORTED_HOST.is_match(input)
}
