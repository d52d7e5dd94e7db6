#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the rode counter.
//!
//! `Config` and sub-structs are deserialized from TOML and validated before
//! the tracker is built. All values are fixed for the process lifetime.
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Pins {
    pub encoder_a: u8,
    pub encoder_b: u8,
    pub reset_button: Option<u8>,
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct EncoderCfg {
    /// Encoder pulses per meter of chain deployed.
    pub ticks_per_meter: u32,
    /// Total chain on the drum, used for capacity reporting.
    pub chain_length_m: f32,
}

impl Default for EncoderCfg {
    fn default() -> Self {
        Self {
            ticks_per_meter: 106,
            chain_length_m: 50.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PersistenceCfg {
    /// Byte offset of the count slot inside the backing store.
    pub address: u64,
    /// Quiet time after the last transition before a flush is due (ms).
    pub quiescence_ms: u64,
    /// Backing file for the count slot.
    pub file: String,
}

impl Default for PersistenceCfg {
    fn default() -> Self {
        Self {
            address: 0,
            quiescence_ms: 5000,
            file: "rode_count.bin".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TelemetryCfg {
    /// Signal K style path identifying the value downstream.
    pub path: String,
    pub unit: String,
    pub description: String,
}

impl Default for TelemetryCfg {
    fn default() -> Self {
        Self {
            path: "navigation.anchor.rodeDeployed".to_string(),
            unit: "m".to_string(),
            description: "Anchor Chain Deployed".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct TickCfg {
    /// Tick loop rate in Hz.
    pub rate_hz: u32,
}

impl Default for TickCfg {
    fn default() -> Self {
        Self { rate_hz: 100 }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Config {
    pub pins: Pins,
    #[serde(default)]
    pub encoder: EncoderCfg,
    #[serde(default)]
    pub persistence: PersistenceCfg,
    #[serde(default)]
    pub telemetry: TelemetryCfg,
    #[serde(default)]
    pub tick: TickCfg,
    #[serde(default)]
    pub logging: Logging,
}

impl Config {
    /// Validate ranges that the TOML schema alone cannot express.
    pub fn validate(&self) -> eyre::Result<()> {
        if self.encoder.ticks_per_meter == 0 {
            eyre::bail!("ticks_per_meter must be > 0");
        }
        if !self.encoder.chain_length_m.is_finite() || self.encoder.chain_length_m <= 0.0 {
            eyre::bail!("chain_length_m must be finite and > 0");
        }
        if self.tick.rate_hz == 0 {
            eyre::bail!("rate_hz must be > 0");
        }
        if self.telemetry.path.is_empty() {
            eyre::bail!("telemetry path must not be empty");
        }
        if self.persistence.file.is_empty() {
            eyre::bail!("persistence file must not be empty");
        }
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging rotation must be one of never|daily|hourly");
        }
        Ok(())
    }
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}
