//! 通用工具函数

use chrono::Utc;
use uuid::Uuid;

/// 生成新的 UUID v7（时间有序）
pub fn new_id() -> Uuid {
    Uuid::now_v7()
}

/// 当前 Unix 时间戳（秒）
pub fn unix_timestamp() -> u64 {
    Utc::now().timestamp().max(0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_id_is_time_ordered() {
        let a = new_id();
        let b = new_id();
        assert!(a <= b);
    }

    #[test]
    fn test_unix_timestamp_is_recent() {
        // 2024-01-01T00:00:00Z
        assert!(unix_timestamp() > 1_704_067_200);
    }
}
