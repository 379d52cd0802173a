use crate::error::FeedError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Tradable asset tracked by the dashboard.
///
/// The set is closed and fixed for the process lifetime. Feed keys outside of it are
/// "not for us" and get ignored by the consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Asset {
    Btc,
    Eth,
    Dot,
    Ena,
}

impl Asset {
    /// Every tracked asset, in display order.
    pub const ALL: [Asset; 4] = [Asset::Btc, Asset::Eth, Asset::Dot, Asset::Ena];

    /// Symbol used on the wire and in the UI (e.g. "BTC").
    pub fn as_str(&self) -> &'static str {
        match self {
            Asset::Btc => "BTC",
            Asset::Eth => "ETH",
            Asset::Dot => "DOT",
            Asset::Ena => "ENA",
        }
    }

    /// Exact wire symbol lookup. Feed keys are case-sensitive, so "btc" is not BTC.
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|asset| asset.as_str() == symbol)
    }

    /// Binance spot pair quoted in USDT.
    pub fn binance_symbol(&self) -> &'static str {
        match self {
            Asset::Btc => "BTCUSDT",
            Asset::Eth => "ETHUSDT",
            Asset::Dot => "DOTUSDT",
            Asset::Ena => "ENAUSDT",
        }
    }

    /// Position within [`Asset::ALL`].
    pub fn index(&self) -> usize {
        Self::ALL
            .iter()
            .position(|asset| asset == self)
            .unwrap_or_default()
    }

    /// Next asset in display order, wrapping around.
    pub fn next(&self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    /// Previous asset in display order, wrapping around.
    pub fn prev(&self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

/// Lenient parse for configuration input: trims and ignores case.
impl FromStr for Asset {
    type Err = FeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "BTC" => Ok(Asset::Btc),
            "ETH" => Ok(Asset::Eth),
            "DOT" => Ok(Asset::Dot),
            "ENA" => Ok(Asset::Ena),
            _ => Err(FeedError::UnknownAsset(s.to_string())),
        }
    }
}

impl std::fmt::Display for Asset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
