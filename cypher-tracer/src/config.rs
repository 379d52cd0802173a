use crate::{
    asset::Asset,
    timeframe::Timeframe,
    websocket::{
        DEFAULT_FRAME_BUFFER, DEFAULT_PING_INTERVAL, DEFAULT_RECONNECT_DELAY, WebSocketConfig,
    },
};
use std::{fmt::Display, str::FromStr, time::Duration};
use tracing::warn;

const DEFAULT_WS_URL: &str = "ws://127.0.0.1:8000/ws";

/// Dashboard settings resolved from the environment.
///
/// | Variable             | Default                  |
/// |----------------------|--------------------------|
/// | `WS_URL`             | `ws://127.0.0.1:8000/ws` |
/// | `SELECTED_ASSET`     | `DOT`                    |
/// | `SELECTED_TIMEFRAME` | `2s`                     |
/// | `WS_PING_SECS`       | `30`                     |
/// | `WS_RECONNECT_SECS`  | `2`                      |
/// | `WS_BUFFER_SIZE`     | `1000`                   |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardConfig {
    pub ws_url: String,
    pub asset: Asset,
    pub timeframe: Timeframe,
    pub ping_interval: Duration,
    pub reconnect_delay: Duration,
    pub channel_buffer_size: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            ws_url: DEFAULT_WS_URL.to_string(),
            asset: Asset::Dot,
            timeframe: Timeframe::TwoSeconds,
            ping_interval: DEFAULT_PING_INTERVAL,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            channel_buffer_size: DEFAULT_FRAME_BUFFER,
        }
    }
}

impl DashboardConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve every setting through `lookup`, falling back to defaults on absent or
    /// unparseable values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let ws_url = lookup("WS_URL")
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| DEFAULT_WS_URL.to_string());

        Self {
            ws_url,
            asset: parse_or(&lookup, "SELECTED_ASSET", Asset::Dot),
            timeframe: parse_or(&lookup, "SELECTED_TIMEFRAME", Timeframe::TwoSeconds),
            ping_interval: Duration::from_secs(parse_or(
                &lookup,
                "WS_PING_SECS",
                DEFAULT_PING_INTERVAL.as_secs(),
            )),
            reconnect_delay: Duration::from_secs(parse_or(
                &lookup,
                "WS_RECONNECT_SECS",
                DEFAULT_RECONNECT_DELAY.as_secs(),
            )),
            channel_buffer_size: parse_or(&lookup, "WS_BUFFER_SIZE", DEFAULT_FRAME_BUFFER).max(1),
        }
    }

    pub fn websocket(&self) -> WebSocketConfig {
        WebSocketConfig::new(self.ws_url.clone())
            .with_ping_interval(self.ping_interval)
            .with_reconnect_delay(self.reconnect_delay)
            .with_frame_buffer(self.channel_buffer_size)
    }
}

impl From<&DashboardConfig> for WebSocketConfig {
    fn from(config: &DashboardConfig) -> Self {
        config.websocket()
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        None => default,
        Some(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(error) => {
                warn!(key, value = %raw, %error, "invalid setting, using default");
                default
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup<'a>(vars: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        let vars: HashMap<&str, &str> = vars.iter().copied().collect();
        move |key| vars.get(key).map(|value| value.to_string())
    }

    #[test]
    fn test_from_lookup() {
        struct TestCase {
            vars: Vec<(&'static str, &'static str)>,
            expected: DashboardConfig,
        }

        let tests = vec![
            TestCase {
                // TC0: nothing set
                vars: vec![],
                expected: DashboardConfig::default(),
            },
            TestCase {
                // TC1: everything set
                vars: vec![
                    ("WS_URL", "ws://feed.local:9000/ws"),
                    ("SELECTED_ASSET", "eth"),
                    ("SELECTED_TIMEFRAME", "15m"),
                    ("WS_PING_SECS", "10"),
                    ("WS_RECONNECT_SECS", "5"),
                    ("WS_BUFFER_SIZE", "64"),
                ],
                expected: DashboardConfig {
                    ws_url: "ws://feed.local:9000/ws".to_string(),
                    asset: Asset::Eth,
                    timeframe: Timeframe::FifteenMinutes,
                    ping_interval: Duration::from_secs(10),
                    reconnect_delay: Duration::from_secs(5),
                    channel_buffer_size: 64,
                },
            },
            TestCase {
                // TC2: invalid values fall back individually
                vars: vec![
                    ("SELECTED_ASSET", "DOGE"),
                    ("SELECTED_TIMEFRAME", "1h"),
                    ("WS_PING_SECS", "soon"),
                ],
                expected: DashboardConfig {
                    timeframe: Timeframe::OneHour,
                    ..DashboardConfig::default()
                },
            },
            TestCase {
                // TC3: blank url and zero buffer
                vars: vec![("WS_URL", "  "), ("WS_BUFFER_SIZE", "0")],
                expected: DashboardConfig {
                    channel_buffer_size: 1,
                    ..DashboardConfig::default()
                },
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let actual = DashboardConfig::from_lookup(lookup(&test.vars));
            assert_eq!(actual, test.expected, "TC{} failed", index);
        }
    }

    #[test]
    fn test_websocket_config_conversion() {
        let config = DashboardConfig {
            ws_url: "ws://localhost:8000/ws".to_string(),
            reconnect_delay: Duration::from_secs(7),
            ..DashboardConfig::default()
        };

        let websocket = WebSocketConfig::from(&config);
        assert_eq!(websocket.url, "ws://localhost:8000/ws");
        assert_eq!(websocket.ping_interval, Duration::from_secs(30));
        assert_eq!(websocket.reconnect_delay, Duration::from_secs(7));
        assert_eq!(websocket.frame_buffer, 1_000);
    }
}
