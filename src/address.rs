/// 默认追踪的钱包地址
pub const WALLET_ADDRESSES: &[&str] = &["CuwxHwz42cNivJqWGBk6HcVvfGq47868Mo6zi4u6z9vC"];

/// 默认追踪的代币 (USDC, USDT)
pub const TOKEN_ADDRESSES: &[&str] = &[
    "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v",
    "Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8BenwNYB",
];

/// Format check only: base58 addresses render as 43 or 44 characters.
/// No charset or curve validation happens here.
pub fn is_valid_solana_address(address: &str) -> bool {
    matches!(address.chars().count(), 43 | 44)
}

/// First eight characters, used to name per-address output files.
pub fn short(address: &str) -> &str {
    match address.char_indices().nth(8) {
        Some((idx, _)) => &address[..idx],
        None => address,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_length_check() {
        for len in 0..64 {
            let address = "1".repeat(len);
            assert_eq!(
                is_valid_solana_address(&address),
                len == 43 || len == 44,
                "length {}",
                len
            );
        }
        assert!(!is_valid_solana_address("abc"));
    }

    #[test]
    fn test_default_lists_are_valid() {
        assert!(WALLET_ADDRESSES.iter().all(|a| is_valid_solana_address(a)));
        assert!(TOKEN_ADDRESSES.iter().all(|a| is_valid_solana_address(a)));
    }

    #[test]
    fn test_short() {
        assert_eq!(short("CuwxHwz42cNivJqWGBk6HcVvfGq47868Mo6zi4u6z9vC"), "CuwxHwz4");
        assert_eq!(short("abc"), "abc");
    }
}
