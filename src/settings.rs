// SPDX-FileCopyrightText: 2025 Robin Vobruba <hoijui.quaero@gmail.com>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::{path::PathBuf, sync::Arc};

use config::{Config, ConfigError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use typed_builder::TypedBuilder;
use url::Url;

use crate::{
    census::{self, CensusClient},
    tools,
};

pub const CONFIG_FILE: &str = "config.yml";
pub const ENV_PREFIX: &str = "CENSUS_SCRAPER";
pub const DEFAULT_DATA_DIR: &str = "data";

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to load the basic/low-level configuration data: {0}")]
    Config(#[from] ConfigError),
    #[error("No census API URL configured; set 'census.api_url' in config.yml, or CENSUS_SCRAPER_CENSUS__API_URL")]
    MissingApiUrl,
    #[error("Failed to create the census API client: {0}")]
    ClientCreation(#[from] reqwest::Error),
}

const fn default_timeout() -> u64 {
    census::DEFAULT_TIMEOUT
}

const fn default_retries() -> u32 {
    census::DEFAULT_RETRIES
}

fn default_user_agent() -> String {
    tools::DEFAULT_USER_AGENT.to_owned()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(DEFAULT_DATA_DIR)
}

/// How to reach the census API.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CensusConfig {
    /// The GraphQL endpoint.
    #[serde(default)]
    pub api_url: Option<Url>,
    /// Total timeout per request in milliseconds (ms)
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    #[serde(default = "default_retries")]
    pub retries: u32,
    /// Minimal time between two requests in milliseconds (ms)
    #[serde(default)]
    pub request_interval: Option<u64>,
}

impl Default for CensusConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            timeout: default_timeout(),
            retries: default_retries(),
            request_interval: None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TypedBuilder)]
pub struct Settings {
    #[serde(default = "default_user_agent")]
    #[builder(default = default_user_agent())]
    pub user_agent: String,
    /// Where snapshots are read from and written to.
    #[serde(default = "default_data_dir")]
    #[builder(default = default_data_dir())]
    pub data_dir: PathBuf,
    #[serde(default)]
    #[builder(default)]
    pub census: CensusConfig,
}

impl Settings {
    /// Creates the client for the census API.
    ///
    /// # Errors
    ///
    /// - no API URL is configured
    /// - the HTTP client fails to build
    pub fn census_client(&self) -> Result<CensusClient, SettingsError> {
        let api_url = self
            .census
            .api_url
            .clone()
            .ok_or(SettingsError::MissingApiUrl)?;
        let downloader = census::create_downloader(
            self.census.retries,
            self.census.timeout,
            &self.user_agent,
        )?;
        let client = CensusClient::new(api_url, Arc::new(downloader));
        Ok(match self.census.request_interval {
            Some(interval) => client.with_request_interval(interval),
            None => client,
        })
    }
}

fn from_config(settings_loader: &Config) -> Result<Settings, SettingsError> {
    let settings = settings_loader.clone().try_deserialize::<Settings>()?;
    tracing::debug!("{settings:#?}");
    Ok(settings)
}

/// # Errors
///
/// - the config loader fails to build
/// - settings failed to load and deserialize
pub fn load() -> Result<Settings, SettingsError> {
    let settings_loader = Config::builder()
        // Add in `./config.yml`, if present
        .add_source(config::File::with_name(CONFIG_FILE).required(false))
        // Add in settings from the environment (with a prefix of CENSUS_SCRAPER)
        // Eg.. `CENSUS_SCRAPER_CENSUS__RETRIES=2 ./target/app` would set `census.retries`
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    from_config(&settings_loader)
}
