use uuid::Uuid;

/// Futures rejects `newClientOrderId` longer than this.
const MAX_CLIENT_ORDER_ID_LEN: usize = 36;
const MAX_PREFIX_LEN: usize = 8;

/// Unique client order ID of the form `{prefix}_{hex}`.
///
/// The prefix is clipped to 8 chars so the result always fits the exchange limit.
pub fn generate_client_order_id(prefix: &str) -> String {
    let prefix: String = prefix
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .take(MAX_PREFIX_LEN)
        .collect();
    let hex = Uuid::new_v4().as_simple().to_string();
    let room = MAX_CLIENT_ORDER_ID_LEN - prefix.len() - 1;
    format!("{}_{}", prefix, &hex[..room.min(hex.len())])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique_and_prefixed() {
        let a = generate_client_order_id("twap");
        let b = generate_client_order_id("twap");
        assert_ne!(a, b);
        assert!(a.starts_with("twap_"));
    }

    #[test]
    fn test_long_prefix_is_clipped_to_limit() {
        let id = generate_client_order_id("a_very_long_strategy_name");
        assert!(id.len() <= MAX_CLIENT_ORDER_ID_LEN, "{} too long", id);
        assert!(id.starts_with("averylon_"));
    }
}
