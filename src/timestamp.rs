//! 时间戳新鲜度校验 - 拒绝过期和超前的请求
//!
//! 转发请求必须携带毫秒时间戳，离当前时间太远的一律拒绝，
//! 防止被截获的请求在限流窗口外重放。

/// 允许的最大过去偏移（5 分钟）
const MAX_AGE_MS: i64 = 5 * 60 * 1000;

/// 允许的最大未来偏移（1 分钟，容忍设备时钟漂移）
const MAX_FUTURE_MS: i64 = 60 * 1000;

/// 校验结论
#[derive(Debug, Clone, PartialEq)]
pub struct TimestampVerdict {
    pub valid: bool,
    pub error: Option<String>,
}

impl TimestampVerdict {
    fn ok() -> Self {
        Self {
            valid: true,
            error: None,
        }
    }

    fn rejected(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            error: Some(message.into()),
        }
    }
}

/// 当前 Unix 毫秒时间戳
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// 校验毫秒时间戳是否落在允许窗口内
pub fn validate_timestamp(timestamp_ms: i64, now_ms: i64) -> TimestampVerdict {
    if timestamp_ms <= 0 {
        return TimestampVerdict::rejected("Missing or invalid timestamp");
    }
    if now_ms - timestamp_ms > MAX_AGE_MS {
        return TimestampVerdict::rejected("Timestamp expired");
    }
    if timestamp_ms - now_ms > MAX_FUTURE_MS {
        return TimestampVerdict::rejected("Timestamp too far in the future");
    }
    TimestampVerdict::ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000_000;

    #[test]
    fn test_current_timestamp_is_valid() {
        assert!(validate_timestamp(NOW, NOW).valid);
    }

    #[test]
    fn test_recent_past_is_valid() {
        // 4 分钟前，仍在窗口内
        assert!(validate_timestamp(NOW - 4 * 60 * 1000, NOW).valid);
    }

    #[test]
    fn test_expired_timestamp_rejected() {
        let verdict = validate_timestamp(NOW - 6 * 60 * 1000, NOW);
        assert!(!verdict.valid);
        assert_eq!(verdict.error.as_deref(), Some("Timestamp expired"));
    }

    #[test]
    fn test_future_within_drift_is_valid() {
        assert!(validate_timestamp(NOW + 30 * 1000, NOW).valid);
    }

    #[test]
    fn test_far_future_rejected() {
        let verdict = validate_timestamp(NOW + 2 * 60 * 1000, NOW);
        assert!(!verdict.valid);
        assert_eq!(
            verdict.error.as_deref(),
            Some("Timestamp too far in the future")
        );
    }

    #[test]
    fn test_zero_and_negative_rejected() {
        assert!(!validate_timestamp(0, NOW).valid);
        assert!(!validate_timestamp(-1, NOW).valid);
    }
}
