use std::{fs, path::Path, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sega_pad::{Button, ButtonMask, TICKS_PER_CYCLE};
use crate::virtual_pad::PadKind;

pub const DEFAULT_POLL_RATE_HZ: u32 = 240;
pub const DEFAULT_TICK_RATE_HZ: u32 = 100_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read board file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse board file: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("invalid rates: {0}")]
    InvalidRate(String),
    #[error("script step {index} at {after_ms} ms comes before the previous step")]
    ScriptOrder { index: usize, after_ms: u64 },
}

/// Board description loaded from `board.yml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BoardConfig {
    /// Rate of the "begin cycle" event.
    pub poll_rate_hz: u32,
    /// Rate of the strobe tick.
    pub tick_rate_hz: u32,
    pub pad: PadKind,
    /// Buttons the virtual pad holds over time.
    pub script: Vec<ScriptStep>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptStep {
    pub after_ms: u64,
    #[serde(default)]
    pub hold: Vec<Button>,
}

impl ScriptStep {
    pub fn mask(&self) -> ButtonMask {
        self.hold.iter().copied().collect()
    }

    pub fn offset(&self) -> Duration {
        Duration::from_millis(self.after_ms)
    }
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            poll_rate_hz: DEFAULT_POLL_RATE_HZ,
            tick_rate_hz: DEFAULT_TICK_RATE_HZ,
            pad: PadKind::default(),
            script: Vec::new(),
        }
    }
}

impl BoardConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&text)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_rate_hz == 0 || self.tick_rate_hz == 0 {
            return Err(ConfigError::InvalidRate(format!(
                "poll {} Hz and tick {} Hz must both be non-zero",
                self.poll_rate_hz, self.tick_rate_hz
            )));
        }

        // A whole cycle has to finish before the next poll event arrives.
        let needed = u64::from(self.poll_rate_hz) * u64::from(TICKS_PER_CYCLE);
        if u64::from(self.tick_rate_hz) < needed {
            return Err(ConfigError::InvalidRate(format!(
                "tick {} Hz cannot fit {} ticks into one {} Hz poll period (need at least {} Hz)",
                self.tick_rate_hz, TICKS_PER_CYCLE, self.poll_rate_hz, needed
            )));
        }

        for (index, pair) in self.script.windows(2).enumerate() {
            if pair[1].after_ms < pair[0].after_ms {
                return Err(ConfigError::ScriptOrder {
                    index: index + 1,
                    after_ms: pair[1].after_ms,
                });
            }
        }

        Ok(())
    }

    pub fn poll_period(&self) -> Duration {
        period_from_hz(self.poll_rate_hz)
    }

    pub fn tick_period(&self) -> Duration {
        period_from_hz(self.tick_rate_hz)
    }
}

fn period_from_hz(hz: u32) -> Duration {
    Duration::from_nanos(1_000_000_000 / u64::from(hz.max(1)))
}
