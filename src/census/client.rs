// SPDX-FileCopyrightText: 2025 Robin Vobruba <hoijui.quaero@gmail.com>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use reqwest_middleware::ClientWithMiddleware;
use tracing::instrument;
use url::Url;

use super::{
    model::{Request, Response},
    Error, LookupQuery, PlaceLookup,
};
use crate::model::place::Place;

pub type RL = governor::RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::QuantaClock,
    governor::middleware::NoOpMiddleware<governor::clock::QuantaInstant>,
>;

/// Looks up places through the GraphQL API of the census data service.
pub struct CensusClient {
    api_url: Url,
    downloader: Arc<ClientWithMiddleware>,
    /// Paces requests, if configured.
    rate_limiter: Option<Arc<RL>>,
}

impl std::fmt::Debug for CensusClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CensusClient")
            .field("api_url", &self.api_url.as_str())
            .field("rate_limited", &self.rate_limiter.is_some())
            .finish_non_exhaustive()
    }
}

impl CensusClient {
    #[must_use]
    pub const fn new(api_url: Url, downloader: Arc<ClientWithMiddleware>) -> Self {
        Self {
            api_url,
            downloader,
            rate_limiter: None,
        }
    }

    /// Allows at most one request per `request_interval` milliseconds.
    /// An interval of zero disables pacing.
    #[must_use]
    pub fn with_request_interval(mut self, request_interval: u64) -> Self {
        self.rate_limiter = Quota::with_period(Duration::from_millis(request_interval))
            .map(|quota| Arc::new(RateLimiter::direct(quota)));
        self
    }

    #[must_use]
    pub const fn api_url(&self) -> &Url {
        &self.api_url
    }

    async fn fetch_as_text(&self, name: &str) -> Result<String, Error> {
        if let Some(rate_limiter) = &self.rate_limiter {
            rate_limiter.until_ready().await;
        }
        Ok(self
            .downloader
            .post(self.api_url.clone())
            .json(&Request::places_by_name(name))
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?)
    }

    fn parse_api_response(content: String) -> Result<Vec<Place>, Error> {
        let response = match serde_json::from_str::<Response>(&content) {
            Ok(response) => response,
            Err(serde_err) => {
                tracing::debug!("Failed to parse census API response:\n{content}");
                return Err(Error::DeserializeFailed(serde_err, content));
            }
        };
        response.into_places().map_err(Error::ApiMsg)
    }
}

#[async_trait(?Send)]
impl PlaceLookup for CensusClient {
    #[instrument(skip(self), fields(name = %query.name))]
    async fn lookup(&self, query: &LookupQuery) -> Result<Vec<Place>, Error> {
        tracing::trace!("Looking up {query:?} ...");
        let res_raw_text = self.fetch_as_text(&query.name).await?;
        let places = query.filter(Self::parse_api_response(res_raw_text)?);
        tracing::trace!("Lookup of '{}' matched {} place(s)", query.name, places.len());
        Ok(places)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::place::PlaceType;
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::{TcpListener, TcpStream},
    };

    #[test]
    fn test_parse_api_response() {
        let raw = r#"{ "data": { "placesByName": [
            { "code": "ZA_FS", "name": "Free State", "type": { "name": "province" }, "children": [] }
        ] } }"#;
        let places = CensusClient::parse_api_response(raw.to_owned()).unwrap();
        assert!(places[0].is_of_type(PlaceType::Province));
    }

    #[test]
    fn test_parse_api_response_garbage() {
        let res = CensusClient::parse_api_response("<html>Gateway Timeout</html>".to_owned());
        assert!(matches!(res, Err(Error::DeserializeFailed(_, raw)) if raw.contains("Gateway")));
    }

    #[test]
    fn test_parse_api_response_errors() {
        let raw = r#"{ "errors": [ { "message": "Variable $name is required" } ] }"#;
        let res = CensusClient::parse_api_response(raw.to_owned());
        assert!(matches!(res, Err(Error::ApiMsg(msg)) if msg.contains("$name")));
    }

    /// Serves a single connection on a local port.
    /// With a `response`, the request is read in full and answered;
    /// without one, the connection is held open and never answered.
    async fn serve_once(response: Option<String>) -> Url {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let Some(response) = response else {
                tokio::time::sleep(Duration::from_secs(5)).await;
                return;
            };
            read_request(&mut socket).await;
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        });
        Url::parse(&format!("http://{addr}/graphql")).unwrap()
    }

    /// Reads the request head and as much body as its `Content-Length` announces.
    async fn read_request(socket: &mut TcpStream) {
        let mut received = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let read = socket.read(&mut buf).await.unwrap();
            if read == 0 {
                return;
            }
            received.extend_from_slice(&buf[..read]);
            let text = String::from_utf8_lossy(&received);
            if let Some(head_end) = text.find("\r\n\r\n") {
                let body_len = text[..head_end]
                    .lines()
                    .filter_map(|line| line.split_once(':'))
                    .find(|(key, _)| key.eq_ignore_ascii_case("content-length"))
                    .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if received.len() >= head_end + 4 + body_len {
                    return;
                }
            }
        }
    }

    fn http_response(status: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        )
    }

    fn client(url: Url, timeout: u64) -> CensusClient {
        let downloader = crate::census::create_downloader(0, timeout, "test-agent").unwrap();
        CensusClient::new(url, Arc::new(downloader))
    }

    #[tokio::test]
    async fn test_lookup_filters_served_places() {
        let body = r#"{ "data": { "placesByName": [
            { "code": "7", "name": "Gauteng", "type": { "name": "province" }, "children": [
                { "code": "EKU", "name": "Ekurhuleni", "type": { "name": "metro" }, "children": [] },
                { "code": "DC42", "name": "Sedibeng", "type": { "name": "district" }, "children": [] }
            ] },
            { "code": "79800", "name": "Gauteng", "type": { "name": "mainplace" }, "children": [] },
            { "code": "GT", "name": "Gauteng Central", "type": { "name": "province" }, "children": [] }
        ] } }"#;
        let url = serve_once(Some(http_response("200 OK", body))).await;
        let query = LookupQuery::new("Gauteng").place_type(PlaceType::Province);
        let places = client(url, 2000).lookup(&query).await.unwrap();
        assert_eq!(places.len(), 1);
        assert_eq!(places[0].code, "7");
        let children: Vec<&str> = places[0].children.iter().map(|c| c.code.as_str()).collect();
        assert_eq!(children, ["EKU", "DC42"]);
    }

    #[tokio::test]
    async fn test_lookup_times_out_on_silent_server() {
        let url = serve_once(None).await;
        let query = LookupQuery::new("Gauteng").place_type(PlaceType::Province);
        let res = client(url, 50).lookup(&query).await;
        assert!(matches!(&res, Err(Error::Timeout(_))), "{res:?}");
        assert!(res.unwrap_err().is_transport());
    }

    #[tokio::test]
    async fn test_lookup_http_error_is_transport() {
        let url = serve_once(Some(http_response("502 Bad Gateway", "{}"))).await;
        let query = LookupQuery::new("Gauteng").place_type(PlaceType::Province);
        let res = client(url, 2000).lookup(&query).await;
        assert!(matches!(&res, Err(Error::DownloadError(_))), "{res:?}");
        assert!(res.unwrap_err().is_transport());
    }

    #[test]
    fn test_request_interval_zero_disables_pacing() {
        let downloader =
            Arc::new(crate::census::create_downloader(0, 1000, "test-agent").unwrap());
        let url = Url::parse("http://localhost:1/graphql").unwrap();
        let client = CensusClient::new(url.clone(), Arc::clone(&downloader)).with_request_interval(0);
        assert!(client.rate_limiter.is_none());
        let client = CensusClient::new(url, downloader).with_request_interval(250);
        assert!(client.rate_limiter.is_some());
    }
}
