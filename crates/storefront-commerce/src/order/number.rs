//! Order number generation.

use chrono::{DateTime, Utc};
use rand::Rng;

const BASE36: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// `ORD-<last 8 digits of the ms timestamp>-<5 random base36 chars>`.
pub fn generate_order_number(at: DateTime<Utc>) -> String {
    let millis = at.timestamp_millis().rem_euclid(100_000_000);
    let mut rng = rand::thread_rng();
    let suffix: String = (0..5)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect();
    format!("ORD-{:08}-{}", millis, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_order_number_format() {
        let at = Utc.timestamp_millis_opt(1_718_000_123_456).unwrap();
        let number = generate_order_number(at);

        let parts: Vec<&str> = number.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "ORD");
        assert_eq!(parts[1], "00123456");
        assert_eq!(parts[2].len(), 5);
        assert!(parts[2]
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }

    #[test]
    fn test_order_numbers_differ() {
        let at = Utc::now();
        let numbers: std::collections::HashSet<String> =
            (0..50).map(|_| generate_order_number(at)).collect();
        assert!(numbers.len() > 1);
    }
}
