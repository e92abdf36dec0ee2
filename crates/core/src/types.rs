//! Shared types and time helpers.

/// Loosely typed advertisement payload: string keys mapped to JSON values
/// (strings, numbers, booleans, nested maps or null).
///
/// `serde_json::Map` keeps its keys sorted, so serializing the same map
/// always yields the same bytes. Advertisement signature verification
/// depends on that canonical ordering.
pub type AdvMap = serde_json::Map<String, serde_json::Value>;

/// Get current timestamp as Unix epoch milliseconds
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_millis() as u64
}

/// Get current timestamp as Unix epoch seconds
pub fn now_secs() -> u64 {
    now_ms() / 1000
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_adv_map_serialization_is_sorted() {
        let mut map = AdvMap::new();
        map.insert("zebra".to_string(), Value::from(1));
        map.insert("alpha".to_string(), Value::from(2));
        map.insert("mango".to_string(), Value::from(3));

        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"alpha":2,"mango":3,"zebra":1}"#);
    }

    #[test]
    fn test_now_ms_is_monotonic_enough() {
        let a = now_ms();
        let b = now_ms();
        assert!(b >= a);
        // sanity: after 2020
        assert!(a > 1_577_836_800_000);
    }
}
