/// 按时间倒序排列：新记录的 key 更小
pub fn sentiment_key(timestamp_ms: i64, record_id: &str) -> String {
    let ts = timestamp_ms.max(0) as u64;
    let reverse_ts = u64::MAX - ts;
    format!("{:020}:{}", reverse_ts, record_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentiment_key_orders_by_time_desc() {
        let k_new = sentiment_key(2000, "r2");
        let k_old = sentiment_key(1000, "r1");
        assert!(k_new < k_old);
    }

    #[test]
    fn negative_timestamps_clamp_to_oldest() {
        assert_eq!(sentiment_key(-5, "x"), sentiment_key(0, "x"));
    }
}
