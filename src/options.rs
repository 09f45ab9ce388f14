use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{Error, Result};

/// Configuration for a new [`crate::trie::Tree`].
#[derive(Debug, Clone)]
pub struct Options {
    pub database_type: String,
    pub description: BTreeMap<String, String>,
    pub languages: Vec<String>,
    pub ip_version: u16,
    pub record_size: u8,
    pub build_epoch: i64,
    pub disable_ipv4_aliasing: bool,
    pub include_reserved_networks: bool,
}

impl Options {
    pub fn new() -> Self {
        Options::default()
    }

    pub fn database_type(mut self, database_type: impl Into<String>) -> Self {
        self.database_type = database_type.into();
        self
    }

    pub fn description(mut self, language: impl Into<String>, text: impl Into<String>) -> Self {
        self.description.insert(language.into(), text.into());
        self
    }

    pub fn languages(mut self, languages: Vec<String>) -> Self {
        self.languages = languages;
        self
    }

    pub fn ip_version(mut self, ip_version: u16) -> Self {
        self.ip_version = ip_version;
        self
    }

    pub fn record_size(mut self, record_size: u8) -> Self {
        self.record_size = record_size;
        self
    }

    pub fn build_epoch(mut self, build_epoch: i64) -> Self {
        self.build_epoch = build_epoch;
        self
    }

    pub fn disable_ipv4_aliasing(mut self, disable: bool) -> Self {
        self.disable_ipv4_aliasing = disable;
        self
    }

    pub fn include_reserved_networks(mut self, include: bool) -> Self {
        self.include_reserved_networks = include;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if !matches!(self.record_size, 24 | 28 | 32) {
            return Err(Error::Config(format!(
                "record_size must be 24, 28, or 32, got {}",
                self.record_size
            )));
        }
        if !matches!(self.ip_version, 4 | 6) {
            return Err(Error::Config(format!("ip_version must be 4 or 6, got {}", self.ip_version)));
        }
        if self.ip_version == 4 && !self.disable_ipv4_aliasing {
            return Err(Error::Config(
                "disable_ipv4_aliasing must be true for an ip_version 4 database".into(),
            ));
        }
        Ok(())
    }
}

impl Default for Options {
    fn default() -> Self {
        Options {
            database_type: "Unnamed".to_owned(),
            description: BTreeMap::new(),
            languages: Vec::new(),
            ip_version: 6,
            record_size: 28,
            build_epoch: current_unix_time(),
            disable_ipv4_aliasing: false,
            include_reserved_networks: false,
        }
    }
}

fn current_unix_time() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs() as i64).unwrap_or(0)
}
