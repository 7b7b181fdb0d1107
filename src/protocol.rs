use std::collections::HashSet;

// Raydium / Pump / Jito 相关地址
pub const RAYDIUM_AMM_V4: &str = "675kPX9MHTjS2zt1qfr1NYHuzeLXfQM9H24wFSUt1Mp8";
pub const RAYDIUM_LIQUIDITY_POOL: &str = "58oQChx4yWmvKdwLLZzBi4ChoCc2fqCUWBkwMihLYQo2";
pub const PUMP_BONDING_CURVE_AUTHORITY: &str = "PumpbondingCurveAuthority11111111111111111";
pub const PUMP_FEE_ACCOUNT: &str = "PumpFeeAccount111111111111111111111111111";
pub const JITO_TIP_ACCOUNT: &str = "JitoTipAccount11111111111111111111111111111";

const BUILTIN: &[&str] = &[
    RAYDIUM_AMM_V4,
    RAYDIUM_LIQUIDITY_POOL,
    PUMP_BONDING_CURVE_AUTHORITY,
    PUMP_FEE_ACCOUNT,
    JITO_TIP_ACCOUNT,
];

/// Addresses that are never reported as a transfer counterparty
/// (AMM pools, fee collectors, tip accounts).
#[derive(Debug, Clone, Default)]
pub struct ProtocolAddressSet {
    addresses: HashSet<String>,
}

impl ProtocolAddressSet {
    pub fn new<I, S>(addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ProtocolAddressSet {
            addresses: addresses.into_iter().map(Into::into).collect(),
        }
    }

    pub fn builtin() -> Self {
        Self::new(BUILTIN.iter().copied())
    }

    pub fn extend<I, S>(&mut self, addresses: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.addresses.extend(addresses.into_iter().map(Into::into));
    }

    pub fn contains(&self, address: &str) -> bool {
        self.addresses.contains(address)
    }

    /// `None` never matches.
    pub fn contains_opt(&self, address: Option<&str>) -> bool {
        address.map_or(false, |a| self.contains(a))
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }
}
