//! Host environment configuration
//!
//! Everything the board reads from its surroundings. Every field has a
//! default so partial configuration files are fine.

use super::alert::{AlertPolicy, DEFAULT_STRIP_CODES};
use super::render::BoardKind;
use super::status::{EndOfDay, Vocabulary};
use crate::link::backoff::ReconnectPolicy;
use crate::link::client::{LinkConfig, DEFAULT_EVENT_QUEUE_SIZE};
use crate::link::endpoint::{Endpoint, EndpointError, Fallback, PageLocation};
use crate::link::liveness::LivenessPolicy;
use crate::link::proto::Ident;

use chrono::NaiveDateTime;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("invalid end of day {hour}:{minute:02}")]
    InvalidEndOfDay { hour: u32, minute: u32 },

    #[error("invalid link setting: {0}")]
    InvalidLink(&'static str),

    #[error(transparent)]
    Endpoint(#[from] EndpointError),
}

/// Link timings, in milliseconds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LinkSettings {
    pub reconnect_initial_ms: u64,
    pub reconnect_factor: f64,
    pub reconnect_max_ms: u64,
    pub heartbeat_interval_ms: u64,
    pub heartbeat_timeout_ms: u64,
    pub poll_interval_ms: u64,
    pub event_queue: usize,
}

impl Default for LinkSettings {
    fn default() -> LinkSettings {
        LinkSettings {
            reconnect_initial_ms: 2000,
            reconnect_factor: 1.25,
            reconnect_max_ms: 10000,
            heartbeat_interval_ms: 30000,
            heartbeat_timeout_ms: 10000,
            poll_interval_ms: 100,
            event_queue: DEFAULT_EVENT_QUEUE_SIZE,
        }
    }
}

impl LinkSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.reconnect_initial_ms == 0 {
            return Err(ConfigError::InvalidLink("reconnect_initial_ms must be positive"));
        }
        if !(self.reconnect_factor >= 1.0) || !self.reconnect_factor.is_finite() {
            return Err(ConfigError::InvalidLink("reconnect_factor must be at least 1"));
        }
        if self.reconnect_max_ms < self.reconnect_initial_ms {
            return Err(ConfigError::InvalidLink(
                "reconnect_max_ms must not be below reconnect_initial_ms",
            ));
        }
        if self.heartbeat_timeout_ms == 0 || self.heartbeat_interval_ms == 0 {
            return Err(ConfigError::InvalidLink("heartbeat timings must be positive"));
        }
        if self.heartbeat_timeout_ms >= self.heartbeat_interval_ms {
            return Err(ConfigError::InvalidLink(
                "heartbeat_timeout_ms must be below heartbeat_interval_ms",
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidLink("poll_interval_ms must be positive"));
        }
        Ok(())
    }

    pub fn link_config(&self) -> LinkConfig {
        LinkConfig {
            reconnect: ReconnectPolicy {
                initial: Duration::from_millis(self.reconnect_initial_ms),
                factor: self.reconnect_factor,
                max: Duration::from_millis(self.reconnect_max_ms),
            },
            liveness: LivenessPolicy {
                interval: Duration::from_millis(self.heartbeat_interval_ms),
                timeout: Duration::from_millis(self.heartbeat_timeout_ms),
            },
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            event_queue: self.event_queue,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    pub board: BoardKind,
    pub end_of_day: EndOfDay,
    pub page: PageLocation,
    pub fallback: Fallback,
    pub path: String,
    /// Viewer may author announcements.
    pub admin: bool,
    pub alert_codes: Vec<String>,
    /// Seat-map cells of the afternoon board.
    pub spaces: Vec<Ident>,
    pub link: LinkSettings,
}

impl Default for BoardConfig {
    fn default() -> BoardConfig {
        BoardConfig {
            board: BoardKind::default(),
            end_of_day: EndOfDay::default(),
            page: PageLocation::default(),
            fallback: Fallback::default(),
            path: "/bus/".to_string(),
            admin: false,
            alert_codes: DEFAULT_STRIP_CODES.iter().map(|c| c.to_string()).collect(),
            spaces: Vec::new(),
            link: LinkSettings::default(),
        }
    }
}

impl BoardConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.end_of_day.time().is_none() {
            return Err(ConfigError::InvalidEndOfDay {
                hour: self.end_of_day.hour,
                minute: self.end_of_day.minute,
            });
        }
        self.link.validate()?;
        self.endpoint()?;
        Ok(())
    }

    pub fn endpoint(&self) -> Result<Endpoint, EndpointError> {
        Endpoint::resolve(&self.page, &self.fallback, &self.path)
    }

    pub fn vocabulary(&self, now: NaiveDateTime) -> Vocabulary {
        Vocabulary::for_session(&self.end_of_day, now)
    }

    pub fn alert_policy(&self) -> AlertPolicy {
        AlertPolicy::new(self.alert_codes.iter().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = BoardConfig::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.endpoint().unwrap().url(), "ws://localhost:8080/bus/");
        let link = config.link.link_config();
        assert_eq!(link.reconnect.initial, Duration::from_millis(2000));
        assert_eq!(link.liveness.timeout, Duration::from_millis(10000));
        assert_eq!(config.alert_policy(), AlertPolicy::default());
    }

    #[test]
    fn partial_json_config() {
        let config: BoardConfig = serde_json::from_str(
            r#"{"board": "afternoon", "end_of_day": {"hour": 15, "minute": 5},
                "page": {"protocol": "https:", "host": "ion.example.org"},
                "spaces": ["A1", 2], "link": {"reconnect_max_ms": 5000}}"#,
        )
        .unwrap();
        assert_eq!(config.board, BoardKind::Afternoon);
        assert_eq!(config.spaces, vec![Ident::from("A1"), Ident::Num(2)]);
        assert_eq!(config.link.reconnect_max_ms, 5000);
        assert_eq!(config.link.reconnect_initial_ms, 2000);
        assert_eq!(config.endpoint().unwrap().url(), "wss://ion.example.org/bus/");
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn invalid_settings() {
        let mut config = BoardConfig::default();
        config.end_of_day = EndOfDay {
            hour: 15,
            minute: 60,
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidEndOfDay {
                hour: 15,
                minute: 60
            })
        );
        let mut config = BoardConfig::default();
        config.link.reconnect_factor = 0.5;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidLink(_))));
        let mut config = BoardConfig::default();
        config.fallback.host = String::new();
        assert_eq!(
            config.validate(),
            Err(ConfigError::Endpoint(EndpointError::MissingHost))
        );
    }
}
