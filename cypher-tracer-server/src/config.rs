use std::{net::SocketAddr, time::Duration};
use tracing::warn;

const DEFAULT_ADDR: &str = "0.0.0.0:8000";
const DEFAULT_BINANCE_REST_URL: &str = "https://api.binance.com";

/// Feed server settings, read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Listener address (env: WS_ADDR, default: 0.0.0.0:8000)
    pub addr: SocketAddr,
    /// Broadcast channel capacity (env: WS_BUFFER_SIZE, default: 10,000)
    pub buffer_size: usize,
    /// Binance REST base url (env: BINANCE_REST_URL)
    pub binance_rest_url: String,
    /// Price poll period (env: PRICE_POLL_SECS, default: 1)
    pub price_poll: Duration,
    /// Trend prediction period (env: TREND_INTERVAL_SECS, default: 5)
    pub trend_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            buffer_size: 10_000,
            binance_rest_url: DEFAULT_BINANCE_REST_URL.to_string(),
            price_poll: Duration::from_secs(1),
            trend_interval: Duration::from_secs(5),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let addr = match lookup("WS_ADDR") {
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                warn!(value = %raw, default = DEFAULT_ADDR, "invalid WS_ADDR, using default");
                defaults.addr
            }),
            None => defaults.addr,
        };

        let binance_rest_url = lookup("BINANCE_REST_URL")
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or(defaults.binance_rest_url);

        let secs = |key: &str, default: Duration| {
            lookup(key)
                .and_then(|raw| raw.trim().parse::<u64>().ok())
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(default)
        };

        Self {
            addr,
            buffer_size: lookup("WS_BUFFER_SIZE")
                .and_then(|raw| raw.trim().parse::<usize>().ok())
                .filter(|size| *size > 0)
                .unwrap_or(defaults.buffer_size),
            binance_rest_url,
            price_poll: secs("PRICE_POLL_SECS", defaults.price_poll),
            trend_interval: secs("TREND_INTERVAL_SECS", defaults.trend_interval),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_from_lookup() {
        struct TestCase {
            vars: Vec<(&'static str, &'static str)>,
            expected: ServerConfig,
        }

        let tests = vec![
            TestCase {
                // TC0: defaults
                vars: vec![],
                expected: ServerConfig::default(),
            },
            TestCase {
                // TC1: overrides
                vars: vec![
                    ("WS_ADDR", "127.0.0.1:9100"),
                    ("WS_BUFFER_SIZE", "256"),
                    ("BINANCE_REST_URL", "http://localhost:3000/"),
                    ("PRICE_POLL_SECS", "2"),
                    ("TREND_INTERVAL_SECS", "10"),
                ],
                expected: ServerConfig {
                    addr: "127.0.0.1:9100".parse().unwrap(),
                    buffer_size: 256,
                    binance_rest_url: "http://localhost:3000".to_string(),
                    price_poll: Duration::from_secs(2),
                    trend_interval: Duration::from_secs(10),
                },
            },
            TestCase {
                // TC2: garbage and zero values fall back
                vars: vec![
                    ("WS_ADDR", "localhost"),
                    ("WS_BUFFER_SIZE", "0"),
                    ("PRICE_POLL_SECS", "0"),
                    ("TREND_INTERVAL_SECS", "often"),
                ],
                expected: ServerConfig::default(),
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let vars: HashMap<&str, &str> = test.vars.into_iter().collect();
            let actual =
                ServerConfig::from_lookup(|key| vars.get(key).map(|value| value.to_string()));
            assert_eq!(actual, test.expected, "TC{} failed", index);
        }
    }
}
