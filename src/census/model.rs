// SPDX-FileCopyrightText: 2025 Robin Vobruba <hoijui.quaero@gmail.com>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use serde::{Deserialize, Serialize};

use crate::model::place::Place;

/// Returns a place and its immediate children, by name.
pub const PLACES_BY_NAME_QUERY: &str = "
query ($name: String!) {
    placesByName: places(name: $name) {
        code
        name
        type { name }
        children {
            code
            name
            type { name }
        }
    }
}";

#[derive(Serialize, Debug)]
pub struct Variables<'a> {
    pub name: &'a str,
}

#[derive(Serialize, Debug)]
pub struct Request<'a> {
    pub query: &'static str,
    pub variables: Variables<'a>,
}

impl<'a> Request<'a> {
    #[must_use]
    pub const fn places_by_name(name: &'a str) -> Self {
        Self {
            query: PLACES_BY_NAME_QUERY,
            variables: Variables { name },
        }
    }
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Data {
    #[serde(default)]
    pub places_by_name: Option<Vec<Place>>,
}

#[derive(Deserialize, Debug)]
pub struct ApiError {
    pub message: String,
}

#[derive(Deserialize, Debug)]
pub struct Response {
    #[serde(default)]
    pub data: Option<Data>,
    #[serde(default)]
    pub errors: Vec<ApiError>,
}

impl Response {
    /// The returned places, or the joined error messages
    /// if the API returned no data.
    pub fn into_places(self) -> Result<Vec<Place>, String> {
        match self.data.and_then(|data| data.places_by_name) {
            Some(places) => {
                if !self.errors.is_empty() {
                    tracing::warn!(
                        "Census API returned data together with {} error(s)",
                        self.errors.len()
                    );
                }
                Ok(places)
            }
            None if self.errors.is_empty() => Ok(Vec::new()),
            None => Err(self
                .errors
                .into_iter()
                .map(|err| err.message)
                .collect::<Vec<_>>()
                .join("; ")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::place::PlaceType;

    #[test]
    fn test_request_body() {
        let body = serde_json::to_value(Request::places_by_name("Gauteng")).unwrap();
        assert_eq!(body["variables"]["name"], "Gauteng");
        assert!(body["query"].as_str().unwrap().contains("placesByName"));
    }

    #[test]
    fn test_response_with_data() {
        let raw = r#"{ "data": { "placesByName": [
            { "code": "DC42", "name": "Sedibeng", "type": { "name": "district" },
              "children": [ { "code": "GT421", "name": "Emfuleni", "type": { "name": "local" } } ] }
        ] } }"#;
        let places = serde_json::from_str::<Response>(raw)
            .unwrap()
            .into_places()
            .unwrap();
        assert_eq!(places.len(), 1);
        assert!(places[0].is_of_type(PlaceType::District));
        assert_eq!(places[0].children[0].code, "GT421");
    }

    #[test]
    fn test_response_with_errors_only() {
        let raw = r#"{ "data": null, "errors": [ { "message": "boom" }, { "message": "bang" } ] }"#;
        let res = serde_json::from_str::<Response>(raw).unwrap().into_places();
        assert_eq!(res, Err("boom; bang".to_owned()));
    }
}
