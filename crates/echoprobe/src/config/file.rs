use crate::config::{AddressFamilyConfig, LogFormat, LogSpanEvents};
use anyhow::Context;
use serde::{Deserialize, Deserializer};
use std::net::IpAddr;
use std::path::Path;
use std::time::Duration;

/// Read the config from the given path.
pub fn read_config_file<P: AsRef<Path>>(path: P) -> anyhow::Result<ConfigFile> {
    let contents = std::fs::read_to_string(path.as_ref())
        .with_context(|| format!("config file not found: {}", path.as_ref().display()))?;
    parse_config(&contents)
}

/// Parse the toml contents of a config file.
pub fn parse_config(contents: &str) -> anyhow::Result<ConfigFile> {
    Ok(toml::from_str(contents)?)
}

#[derive(Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ConfigFile {
    pub ping: Option<ConfigPing>,
    pub output: Option<ConfigOutput>,
    pub log: Option<ConfigLog>,
}

#[derive(Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ConfigPing {
    pub count: Option<usize>,
    #[serde(default, deserialize_with = "humantime_deser")]
    pub interval: Option<Duration>,
    #[serde(default, deserialize_with = "humantime_deser")]
    pub timeout: Option<Duration>,
    #[serde(default, deserialize_with = "humantime_deser")]
    pub deadline: Option<Duration>,
    pub size: Option<u16>,
    pub payload_pattern: Option<u8>,
    pub ttl: Option<u8>,
    pub source_addr: Option<IpAddr>,
    pub udp: Option<bool>,
    pub addr_family: Option<AddressFamilyConfig>,
}

#[derive(Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ConfigOutput {
    pub json: Option<bool>,
    pub debug: Option<bool>,
}

#[derive(Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ConfigLog {
    pub log_format: Option<LogFormat>,
    pub log_filter: Option<String>,
    pub log_span_events: Option<LogSpanEvents>,
}

fn humantime_deser<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)?
        .map(|value| humantime::parse_duration(&value).map_err(serde::de::Error::custom))
        .transpose()
}
