//! Startup configuration.
//!
//! Loaded once from a JSON document, typically embedded with
//! `include_str!`. Strings borrow from the document. Every timing field is
//! optional.
//!
//! ```json
//! {
//!   "lines": [
//!     { "label": "Blue", "line": 4 },
//!     { "label": "Yellow", "line": 5 }
//!   ],
//!   "clear_pair": [4, 5],
//!   "broker": "192.168.1.10:1883",
//!   "client_id": "nursery-logger",
//!   "topic": "nursery/events"
//! }
//! ```

use heapless::Vec;
use serde::Deserialize;

use crate::forward::DEFAULT_RECONNECT_INTERVAL_MS;
use crate::input::{InputLine, Level};
use crate::trigger::DEFAULT_CLEAR_INTERVAL_MS;

/// Most input lines a configuration may declare.
pub const MAX_LINES: usize = 8;
/// Longest input label.
pub const MAX_LABEL_LEN: usize = 24;
/// Longest topic.
pub const MAX_TOPIC_LEN: usize = 64;

/// Configuration problems, reported before anything starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Not valid JSON, a wrong type, or more than [`MAX_LINES`] lines.
    Parse,
    /// The line table is empty.
    NoLines,
    /// Two lines share this id.
    DuplicateLine(u8),
    /// A label is empty or longer than [`MAX_LABEL_LEN`].
    BadLabel,
    /// `clear_pair` does not name two distinct lines.
    BadClearPair,
    /// `clear_pair` names a line id missing from the table.
    UnknownClearLine(u8),
    /// The topic is empty, too long or contains a wildcard.
    BadTopic,
    /// The client id is empty or longer than 23 bytes.
    BadClientId,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ConfigError::Parse => f.write_str("configuration is not valid JSON"),
            ConfigError::NoLines => f.write_str("no input lines configured"),
            ConfigError::DuplicateLine(id) => write!(f, "line {} configured twice", id),
            ConfigError::BadLabel => f.write_str("invalid line label"),
            ConfigError::BadClearPair => f.write_str("clear_pair must name two distinct lines"),
            ConfigError::UnknownClearLine(id) => write!(f, "clear_pair line {} is not configured", id),
            ConfigError::BadTopic => f.write_str("invalid topic"),
            ConfigError::BadClientId => f.write_str("invalid client id"),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ConfigError {
    fn format(&self, f: defmt::Formatter) {
        match self {
            ConfigError::Parse => defmt::write!(f, "Parse"),
            ConfigError::NoLines => defmt::write!(f, "NoLines"),
            ConfigError::DuplicateLine(id) => defmt::write!(f, "DuplicateLine({})", id),
            ConfigError::BadLabel => defmt::write!(f, "BadLabel"),
            ConfigError::BadClearPair => defmt::write!(f, "BadClearPair"),
            ConfigError::UnknownClearLine(id) => defmt::write!(f, "UnknownClearLine({})", id),
            ConfigError::BadTopic => defmt::write!(f, "BadTopic"),
            ConfigError::BadClientId => defmt::write!(f, "BadClientId"),
        }
    }
}

/// One input line as configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct LineConfig<'a> {
    /// Label written to the log.
    pub label: &'a str,
    /// Hardware line id.
    pub line: u8,
    /// Pressed reads high. Defaults to active low (pull-up wiring).
    #[serde(default)]
    pub active_high: bool,
}

#[derive(Deserialize)]
struct Document<'a> {
    #[serde(borrow)]
    lines: Vec<LineConfig<'a>, MAX_LINES>,
    clear_pair: Vec<u8, 2>,
    broker: &'a str,
    #[serde(default, borrow)]
    client_id: Option<&'a str>,
    topic: &'a str,
    #[serde(default)]
    keep_alive_s: Option<u16>,
    #[serde(default)]
    reconnect_interval_ms: Option<u64>,
    #[serde(default)]
    clear_interval_ms: Option<u64>,
    #[serde(default)]
    clock_wait_ms: Option<u32>,
    #[serde(default)]
    tick_interval_ms: Option<u64>,
    #[serde(default, borrow)]
    http_bind: Option<&'a str>,
    #[serde(default, borrow)]
    log_dir: Option<&'a str>,
}

/// Everything the agent needs to start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentConfig<'a> {
    /// Input line table, in polling order.
    pub lines: Vec<LineConfig<'a>, MAX_LINES>,
    /// Line ids whose simultaneous press clears the logs.
    pub clear_pair: (u8, u8),
    /// MQTT broker, `host:port`.
    pub broker: &'a str,
    /// MQTT client identifier.
    pub client_id: &'a str,
    /// Topic every log line is published on.
    pub topic: &'a str,
    /// MQTT keep-alive.
    pub keep_alive_s: u16,
    /// Pause between channel connection attempts.
    pub reconnect_interval_ms: u64,
    /// Minimum spacing between two bulk clears.
    pub clear_interval_ms: u64,
    /// How long the clock may take to answer.
    pub clock_wait_ms: u32,
    /// Scheduler tick, which is also the debounce window.
    pub tick_interval_ms: u64,
    /// Address the log browser listens on.
    pub http_bind: &'a str,
    /// Directory holding the log files on hosted targets.
    pub log_dir: &'a str,
}

impl<'a> AgentConfig<'a> {
    /// Default MQTT client id.
    pub const DEFAULT_CLIENT_ID: &'static str = "presslog";
    /// Default MQTT keep-alive.
    pub const DEFAULT_KEEP_ALIVE_S: u16 = 60;
    /// Default clock wait.
    pub const DEFAULT_CLOCK_WAIT_MS: u32 = 1000;
    /// Default tick.
    pub const DEFAULT_TICK_INTERVAL_MS: u64 = 100;
    /// Default listen address.
    pub const DEFAULT_HTTP_BIND: &'static str = "0.0.0.0:80";
    /// Default log directory.
    pub const DEFAULT_LOG_DIR: &'static str = "logs";

    /// Parse and validate a JSON document.
    pub fn from_json(json: &'a str) -> Result<Self, ConfigError> {
        let (doc, _) =
            serde_json_core::from_str::<Document<'a>>(json).map_err(|_| ConfigError::Parse)?;
        let clear_pair = match doc.clear_pair[..] {
            [a, b] => (a, b),
            _ => return Err(ConfigError::BadClearPair),
        };
        let config = Self {
            lines: doc.lines,
            clear_pair,
            broker: doc.broker,
            client_id: doc.client_id.unwrap_or(Self::DEFAULT_CLIENT_ID),
            topic: doc.topic,
            keep_alive_s: doc.keep_alive_s.unwrap_or(Self::DEFAULT_KEEP_ALIVE_S),
            reconnect_interval_ms: doc
                .reconnect_interval_ms
                .unwrap_or(DEFAULT_RECONNECT_INTERVAL_MS),
            clear_interval_ms: doc.clear_interval_ms.unwrap_or(DEFAULT_CLEAR_INTERVAL_MS),
            clock_wait_ms: doc.clock_wait_ms.unwrap_or(Self::DEFAULT_CLOCK_WAIT_MS),
            tick_interval_ms: doc.tick_interval_ms.unwrap_or(Self::DEFAULT_TICK_INTERVAL_MS),
            http_bind: doc.http_bind.unwrap_or(Self::DEFAULT_HTTP_BIND),
            log_dir: doc.log_dir.unwrap_or(Self::DEFAULT_LOG_DIR),
        };
        config.validate()?;
        Ok(config)
    }

    /// Check the invariants [`from_json`](Self::from_json) enforces.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lines.is_empty() {
            return Err(ConfigError::NoLines);
        }
        for (i, line) in self.lines.iter().enumerate() {
            if line.label.is_empty() || line.label.len() > MAX_LABEL_LEN {
                return Err(ConfigError::BadLabel);
            }
            if self.lines[..i].iter().any(|other| other.line == line.line) {
                return Err(ConfigError::DuplicateLine(line.line));
            }
        }

        let (a, b) = self.clear_pair;
        if a == b {
            return Err(ConfigError::BadClearPair);
        }
        for id in [a, b] {
            if !self.lines.iter().any(|line| line.line == id) {
                return Err(ConfigError::UnknownClearLine(id));
            }
        }

        if self.topic.is_empty()
            || self.topic.len() > MAX_TOPIC_LEN
            || self.topic.contains(&['+', '#'][..])
        {
            return Err(ConfigError::BadTopic);
        }
        if self.client_id.is_empty() || self.client_id.len() > 23 {
            return Err(ConfigError::BadClientId);
        }
        Ok(())
    }

    /// Label of line `id`.
    pub fn label_of(&self, id: u8) -> Option<&'a str> {
        self.lines.iter().find(|l| l.line == id).map(|l| l.label)
    }

    /// Directory store rooted at [`log_dir`](Self::log_dir).
    #[cfg(feature = "std")]
    pub fn dir_store(&self) -> crate::storage::DirStore {
        crate::storage::DirStore::new(self.log_dir)
    }
}

impl AgentConfig<'static> {
    /// The line table as monitor descriptors.
    pub fn input_lines(&self) -> Vec<InputLine, MAX_LINES> {
        self.lines
            .iter()
            .map(|l| InputLine {
                name: l.label,
                line_id: l.line,
                active: if l.active_high { Level::High } else { Level::Low },
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"{
        "lines": [
            {"label": "Blue", "line": 4},
            {"label": "Yellow", "line": 5, "active_high": true}
        ],
        "clear_pair": [4, 5],
        "broker": "10.0.0.2:1883",
        "topic": "nursery/events"
    }"#;

    #[test]
    fn test_defaults_fill_in() {
        let config = AgentConfig::from_json(MINIMAL).unwrap();
        assert_eq!(config.lines.len(), 2);
        assert_eq!(config.clear_pair, (4, 5));
        assert_eq!(config.client_id, "presslog");
        assert_eq!(config.reconnect_interval_ms, 5000);
        assert_eq!(config.clear_interval_ms, 2000);
        assert_eq!(config.clock_wait_ms, 1000);
        assert_eq!(config.tick_interval_ms, 100);
        assert_eq!(config.label_of(5), Some("Yellow"));

        let lines = config.input_lines();
        assert_eq!(lines[0].active, Level::Low);
        assert_eq!(lines[1].active, Level::High);
    }

    #[test]
    fn test_overrides() {
        let json = r#"{"lines":[{"label":"A","line":1},{"label":"B","line":2}],
            "clear_pair":[2,1],"broker":"b:1","topic":"t","client_id":"dev-7",
            "reconnect_interval_ms":750,"clear_interval_ms":3000,"http_bind":"127.0.0.1:8080"}"#;
        let config = AgentConfig::from_json(json).unwrap();
        assert_eq!(config.client_id, "dev-7");
        assert_eq!(config.reconnect_interval_ms, 750);
        assert_eq!(config.clear_interval_ms, 3000);
        assert_eq!(config.http_bind, "127.0.0.1:8080");
    }

    #[test]
    fn test_rejections() {
        let cases = [
            ("{", ConfigError::Parse),
            (
                r#"{"lines":[],"clear_pair":[1,2],"broker":"b:1","topic":"t"}"#,
                ConfigError::NoLines,
            ),
            (
                r#"{"lines":[{"label":"A","line":1},{"label":"B","line":1}],"clear_pair":[1,2],"broker":"b:1","topic":"t"}"#,
                ConfigError::DuplicateLine(1),
            ),
            (
                r#"{"lines":[{"label":"A","line":1},{"label":"B","line":2}],"clear_pair":[1,9],"broker":"b:1","topic":"t"}"#,
                ConfigError::UnknownClearLine(9),
            ),
            (
                r#"{"lines":[{"label":"A","line":1},{"label":"B","line":2}],"clear_pair":[1],"broker":"b:1","topic":"t"}"#,
                ConfigError::BadClearPair,
            ),
            (
                r#"{"lines":[{"label":"A","line":1},{"label":"B","line":2}],"clear_pair":[1,2],"broker":"b:1","topic":""}"#,
                ConfigError::BadTopic,
            ),
            (
                r#"{"lines":[{"label":"","line":1},{"label":"B","line":2}],"clear_pair":[1,2],"broker":"b:1","topic":"t"}"#,
                ConfigError::BadLabel,
            ),
        ];
        for (json, expected) in cases {
            assert_eq!(AgentConfig::from_json(json), Err(expected), "{json}");
        }
    }
}
