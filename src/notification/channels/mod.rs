//! 具体渠道实现

pub mod bark;
pub mod dingtalk;
pub mod feishu;
pub mod wecom;

pub use bark::BarkChannel;
pub use dingtalk::DingtalkChannel;
pub use feishu::FeishuChannel;
pub use wecom::WecomChannel;

use chrono::{FixedOffset, Utc};

/// 外发请求统一的 User-Agent
pub(crate) const USER_AGENT: &str = "SMS-Forwarder/1.0";

/// 推送卡片里展示的本地时间（东八区）
pub(crate) fn local_time_label() -> String {
    let cst = FixedOffset::east_opt(8 * 3600).expect("fixed +08:00 offset");
    Utc::now()
        .with_timezone(&cst)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_time_label_format() {
        let label = local_time_label();
        // 2026-08-06 12:34:56
        assert_eq!(label.len(), 19);
        assert_eq!(&label[4..5], "-");
        assert_eq!(&label[13..14], ":");
    }
}
