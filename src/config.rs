use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ConfigError;
use crate::watcher::{WatchConfig, LISTING_URL};

static DURATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:(?:\d+(?:\.\d*)?|\.\d+)(?:ns|us|µs|μs|ms|s|m|h))+$").expect("duration regex")
});
static DURATION_PART_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d+(?:\.\d*)?|\.\d+)(ns|us|µs|μs|ms|s|m|h)").expect("duration part regex")
});

/// Process configuration read from the environment.
#[derive(Clone)]
pub struct Config {
    pub token: String,
    pub chat_id: i64,
    pub check_interval: Duration,
    pub listing_url: String,
    pub suppress_baseline: bool,
}

impl Config {
    /// Load configuration from environment variables, honouring a `.env` file if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<L>(lookup: L) -> Result<Self, ConfigError>
    where
        L: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .ok_or(ConfigError::Missing(name))
        };

        let token = required("TOKEN")?;
        let chat_id = required("CHAT_ID")?
            .parse::<i64>()
            .map_err(|err| ConfigError::Invalid {
                name: "CHAT_ID",
                reason: err.to_string(),
            })?;
        let check_interval =
            parse_duration(&required("CHECK_INTERVAL")?).map_err(|reason| ConfigError::Invalid {
                name: "CHECK_INTERVAL",
                reason,
            })?;

        let listing_url = lookup("LISTING_URL")
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| LISTING_URL.to_string());
        reqwest::Url::parse(&listing_url).map_err(|err| ConfigError::Invalid {
            name: "LISTING_URL",
            reason: err.to_string(),
        })?;

        let suppress_baseline = match lookup("SUPPRESS_BASELINE") {
            Some(value) if !value.trim().is_empty() => {
                parse_flag(&value).ok_or_else(|| ConfigError::Invalid {
                    name: "SUPPRESS_BASELINE",
                    reason: format!("expected true or false, got {value:?}"),
                })?
            }
            _ => true,
        };

        Ok(Self {
            token,
            chat_id,
            check_interval,
            listing_url,
            suppress_baseline,
        })
    }

    pub fn watch_config(&self) -> WatchConfig {
        let mut config = WatchConfig::new(self.check_interval);
        config.listing_url = self.listing_url.clone();
        config.suppress_baseline = self.suppress_baseline;
        config
    }
}

/// Parses durations written the Go way: `90s`, `5m`, `1h30m`, `1.5h`, `250ms`.
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let input = input.trim();
    if !DURATION_RE.is_match(input) {
        return Err(format!("unrecognized duration {input:?}"));
    }

    let out_of_range = || format!("duration {input:?} is out of range");
    let mut nanos: u128 = 0;
    for caps in DURATION_PART_RE.captures_iter(input) {
        let unit: u128 = match &caps[2] {
            "ns" => 1,
            "us" | "µs" | "μs" => 1_000,
            "ms" => 1_000_000,
            "s" => 1_000_000_000,
            "m" => 60_000_000_000,
            "h" => 3_600_000_000_000,
            other => return Err(format!("unknown unit {other:?}")),
        };

        let (whole, fraction) = caps[1].split_once('.').unwrap_or((&caps[1], ""));
        let whole: u128 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| out_of_range())?
        };

        // Digits past nanosecond precision never matter, even for hours.
        let fraction = &fraction[..fraction.len().min(18)];
        let mut scaled: u128 = 0;
        if !fraction.is_empty() {
            let digits: u128 = fraction.parse().map_err(|_| out_of_range())?;
            scaled = digits * unit / 10u128.pow(fraction.len() as u32);
        }

        nanos = whole
            .checked_mul(unit)
            .and_then(|value| value.checked_add(scaled))
            .and_then(|value| value.checked_add(nanos))
            .ok_or_else(out_of_range)?;
    }

    let nanos = u64::try_from(nanos).map_err(|_| out_of_range())?;
    let duration = Duration::from_nanos(nanos);
    if duration.is_zero() {
        return Err("duration must be positive".to_string());
    }
    Ok(duration)
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn parses_go_style_durations() {
        assert_eq!(parse_duration("90s"), Ok(Duration::from_secs(90)));
        assert_eq!(parse_duration("5m"), Ok(Duration::from_secs(300)));
        assert_eq!(parse_duration("1h30m"), Ok(Duration::from_secs(5400)));
        assert_eq!(parse_duration("250ms"), Ok(Duration::from_millis(250)));
        assert_eq!(parse_duration("1.5h"), Ok(Duration::from_secs(5400)));
        assert_eq!(parse_duration("1.25s"), Ok(Duration::from_millis(1250)));
        assert_eq!(parse_duration(".5m"), Ok(Duration::from_secs(30)));
    }

    #[test]
    fn rejects_malformed_durations() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("60").is_err());
        assert!(parse_duration("five minutes").is_err());
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("-5m").is_err());
    }

    #[test]
    fn loads_full_configuration() {
        let config = Config::from_lookup(lookup(&[
            ("TOKEN", "123:abc"),
            ("CHAT_ID", "-100200300"),
            ("CHECK_INTERVAL", "2m"),
            ("SUPPRESS_BASELINE", "false"),
        ]))
        .expect("valid config");

        assert_eq!(config.token, "123:abc");
        assert_eq!(config.chat_id, -100200300);
        assert_eq!(config.check_interval, Duration::from_secs(120));
        assert_eq!(config.listing_url, LISTING_URL);
        assert!(!config.suppress_baseline);

        let watch = config.watch_config();
        assert_eq!(watch.interval, Duration::from_secs(120));
        assert!(!watch.suppress_baseline);
    }

    #[test]
    fn baseline_suppression_defaults_on() {
        let config = Config::from_lookup(lookup(&[
            ("TOKEN", "123:abc"),
            ("CHAT_ID", "42"),
            ("CHECK_INTERVAL", "30s"),
        ]))
        .expect("valid config");
        assert!(config.suppress_baseline);
    }

    #[test]
    fn reports_missing_and_invalid_values() {
        let missing = Config::from_lookup(lookup(&[("CHAT_ID", "1"), ("CHECK_INTERVAL", "1m")]));
        assert!(matches!(missing, Err(ConfigError::Missing("TOKEN"))));

        let bad_chat = Config::from_lookup(lookup(&[
            ("TOKEN", "t"),
            ("CHAT_ID", "general"),
            ("CHECK_INTERVAL", "1m"),
        ]));
        assert!(matches!(
            bad_chat,
            Err(ConfigError::Invalid { name: "CHAT_ID", .. })
        ));

        let bad_interval = Config::from_lookup(lookup(&[
            ("TOKEN", "t"),
            ("CHAT_ID", "1"),
            ("CHECK_INTERVAL", "soon"),
        ]));
        assert!(matches!(
            bad_interval,
            Err(ConfigError::Invalid { name: "CHECK_INTERVAL", .. })
        ));
    }
}
