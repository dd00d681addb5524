// SPDX-FileCopyrightText: 2025 Robin Vobruba <hoijui.quaero@gmail.com>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use thiserror::Error;

use crate::model::place::{Place, PlaceType};

pub mod client;
pub mod model;

pub use client::CensusClient;

pub const DEFAULT_RETRIES: u32 = 0;
/// Total timeout per request in milliseconds (ms)
pub const DEFAULT_TIMEOUT: u64 = 30_000;

/// Thrown when a single lookup against the census API failed.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Census API request timed out: '{0}'")]
    Timeout(#[source] reqwest::Error),
    #[error("Network/Internet download failed: '{0}'")]
    DownloadError(#[source] reqwest::Error),
    #[error("Network/Internet download failed: '{0}'")]
    DownloadMiddlewareError(#[source] reqwest_middleware::Error),
    #[error("Failed to deserialize a fetched JSON result to our Rust model of the expected type: {0}")]
    DeserializeFailed(#[source] serde_json::Error, String),
    #[error("Census API returned error(s): {0}")]
    ApiMsg(String),
    #[error("No place named '{name}' (code: {code:?}) found in the census API")]
    PlaceNotFound { name: String, code: Option<String> },
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err)
        } else {
            Self::DownloadError(err)
        }
    }
}

impl From<reqwest_middleware::Error> for Error {
    fn from(err: reqwest_middleware::Error) -> Self {
        match err {
            reqwest_middleware::Error::Reqwest(reqwest_err) => reqwest_err.into(),
            reqwest_middleware::Error::Middleware(_) => Self::DownloadMiddlewareError(err),
        }
    }
}

impl Error {
    /// Whether the remote call did not complete at all,
    /// as opposed to completing with an unusable answer.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::DownloadError(_) | Self::DownloadMiddlewareError(_) => true,
            Self::DeserializeFailed(_, _) | Self::ApiMsg(_) | Self::PlaceNotFound { .. } => false,
        }
    }
}

/// What to look up, and how to narrow down the results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupQuery {
    /// The search word sent to the API.
    pub name: String,
    /// Keep only places of this type.
    pub place_type: Option<PlaceType>,
    /// Keep only the place with exactly this code;
    /// takes precedence over [`Self::exact_name_match`].
    pub code: Option<String>,
    /// Keep only places whose name matches [`Self::name`] case-insensitively.
    pub exact_name_match: bool,
}

impl LookupQuery {
    #[must_use]
    pub fn new<N: Into<String>>(name: N) -> Self {
        Self {
            name: name.into(),
            place_type: None,
            code: None,
            exact_name_match: true,
        }
    }

    #[must_use]
    pub const fn place_type(mut self, place_type: PlaceType) -> Self {
        self.place_type = Some(place_type);
        self
    }

    #[must_use]
    pub fn code<C: Into<String>>(mut self, code: C) -> Self {
        self.code = Some(code.into());
        self
    }

    #[must_use]
    pub const fn exact_name_match(mut self, exact: bool) -> Self {
        self.exact_name_match = exact;
        self
    }

    /// Applies the type, code and name filters of this query.
    #[must_use]
    pub fn matches(&self, place: &Place) -> bool {
        if let Some(place_type) = self.place_type {
            if !place.is_of_type(place_type) {
                return false;
            }
        }
        if let Some(code) = &self.code {
            return &place.code == code;
        }
        !self.exact_name_match || place.is_named(&self.name)
    }

    #[must_use]
    pub fn filter(&self, places: Vec<Place>) -> Vec<Place> {
        places
            .into_iter()
            .filter(|place| self.matches(place))
            .collect()
    }

    pub(crate) fn not_found(&self) -> Error {
        Error::PlaceNotFound {
            name: self.name.clone(),
            code: self.code.clone(),
        }
    }
}

/// Something that can look up places by name,
/// returning each match with its immediate children.
///
/// Implementations do not retry;
/// a failed lookup is reported as such to the caller.
#[async_trait(?Send)]
pub trait PlaceLookup {
    async fn lookup(&self, query: &LookupQuery) -> Result<Vec<Place>, Error>;

    /// Looks up the single place the query is aimed at,
    /// failing if there is none.
    async fn lookup_one(&self, query: &LookupQuery) -> Result<Place, Error> {
        self.lookup(query)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| query.not_found())
    }
}

fn create_headers(user_agent: &str) -> header::HeaderMap {
    let mut headers = header::HeaderMap::new();
    if let Ok(user_agent_val) = user_agent.parse() {
        headers.insert(header::USER_AGENT, user_agent_val);
    } else {
        tracing::warn!("Ignoring invalid user agent: '{user_agent}'");
    }
    headers.insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("application/json"),
    );
    headers
}

/// Creates a new [`reqwest::Client`] with the supplied retry and timeout settings.
/// @param retries Number of retries for a single fetch
/// @param timeout Total timeout per request in milliseconds (ms)
pub fn create_downloader(
    retries: u32,
    timeout: u64,
    user_agent: &str,
) -> Result<ClientWithMiddleware, reqwest::Error> {
    let client = Client::builder()
        .timeout(Duration::from_millis(timeout))
        .default_headers(create_headers(user_agent))
        .build()?;
    let mut builder = ClientBuilder::new(client);
    if retries > 0 {
        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(retries);
        builder = builder.with(RetryTransientMiddleware::new_with_policy(retry_policy));
    }
    Ok(builder.build())
}
