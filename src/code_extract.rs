//! 验证码提取 - 从短信内容中用正则启发式找出数字验证码
//!
//! 只在关键词附近取 4-8 位数字，避免把订单号、电话号当成验证码。
//! 找不到时返回 None，调用方按普通短信处理。

use regex::Regex;

/// 从短信内容中提取验证码
pub fn extract_code(content: &str) -> Option<String> {
    // 关键词锚定的模式，按可信度排列。
    // 尾部的 (?:[^0-9]|$) 保证数字串完整，9 位以上的长数字不会被截成验证码。
    let patterns = [
        // 中文：验证码 123456 / 校验码：123456 / 动态码是 123456
        r"(?:验证码|校验码|动态码|动态密码|取件码)[^0-9]{0,8}([0-9]{4,8})(?:[^0-9]|$)",
        // 英文：verification code 123456 / your code is 123456 / OTP: 123456
        r"(?i)(?:verification code|security code|one-time code|otp|code)[^0-9]{0,8}([0-9]{4,8})(?:[^0-9]|$)",
        // 宽松中文兜底：……码 123456
        r"码[:：\s]*([0-9]{4,8})(?:[^0-9]|$)",
    ];

    for pattern in patterns {
        if let Ok(re) = Regex::new(pattern) {
            if let Some(caps) = re.captures(content) {
                if let Some(m) = caps.get(1) {
                    return Some(m.as_str().to_string());
                }
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_english_code() {
        assert_eq!(
            extract_code("Your code is 847291"),
            Some("847291".to_string())
        );
        assert_eq!(
            extract_code("Verification code: 1234"),
            Some("1234".to_string())
        );
        assert_eq!(extract_code("Your OTP is 55667788"), Some("55667788".to_string()));
    }

    #[test]
    fn test_extract_chinese_code() {
        assert_eq!(
            extract_code("【淘宝】验证码 123456，请勿泄露给他人"),
            Some("123456".to_string())
        );
        assert_eq!(
            extract_code("您的校验码：9876，5分钟内有效"),
            Some("9876".to_string())
        );
        assert_eq!(
            extract_code("取件码 8421，请到丰巢柜取件"),
            Some("8421".to_string())
        );
    }

    #[test]
    fn test_no_code_returns_none() {
        assert_eq!(extract_code("你好，今晚一起吃饭吗"), None);
        assert_eq!(extract_code("Meeting moved to 3pm tomorrow"), None);
        assert_eq!(extract_code(""), None);
    }

    #[test]
    fn test_digits_without_keyword_not_extracted() {
        // 纯数字没有关键词锚定，不应当被当成验证码
        assert_eq!(extract_code("订单 20240815 已发货"), None);
    }

    #[test]
    fn test_code_length_bounds() {
        // 少于 4 位或多于 8 位的数字串不算验证码
        assert_eq!(extract_code("验证码 123"), None);
        assert_eq!(extract_code("code 123456789"), None);
    }

    #[test]
    fn test_first_match_wins() {
        assert_eq!(
            extract_code("验证码 111222，备用码 333444"),
            Some("111222".to_string())
        );
    }
}
