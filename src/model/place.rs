// SPDX-FileCopyrightText: 2025 Robin Vobruba <hoijui.quaero@gmail.com>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// Type of a place, as named by the census API.
///
/// Children of a province are of type [`Self::Metro`] and [`Self::District`],
/// children of a district are [`Self::Local`],
/// children of metros and locals are [`Self::MainPlace`],
/// and children of a main place are [`Self::SubPlace`].
#[derive(
    Serialize,
    Deserialize,
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    AsRefStr,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PlaceType {
    Province,
    Metro,
    /// A grouping of local municipalities.
    /// We never retain these; their children go straight into the province.
    District,
    Local,
    #[serde(rename = "mainplace")]
    #[strum(serialize = "mainplace")]
    MainPlace,
    #[serde(rename = "subplace")]
    #[strum(serialize = "subplace")]
    SubPlace,
    #[serde(rename = "smallarea")]
    #[strum(serialize = "smallarea")]
    SmallArea,
    /// Any type name we do not know about.
    #[serde(other)]
    Other,
}

/// The `type { name }` object of the census API.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeRef {
    pub name: PlaceType,
}

/// A place as returned by a single census lookup,
/// together with its immediate children.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Place {
    pub code: String,
    pub name: String,
    #[serde(default, rename = "type")]
    pub r#type: Option<TypeRef>,
    #[serde(default)]
    pub children: Vec<Place>,
}

impl Place {
    #[must_use]
    pub fn new<C: Into<String>, N: Into<String>>(code: C, name: N, place_type: PlaceType) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            r#type: Some(TypeRef { name: place_type }),
            children: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_children(mut self, children: Vec<Self>) -> Self {
        self.children = children;
        self
    }

    #[must_use]
    pub fn place_type(&self) -> Option<PlaceType> {
        self.r#type.map(|type_ref| type_ref.name)
    }

    #[must_use]
    pub fn is_of_type(&self, place_type: PlaceType) -> bool {
        self.place_type() == Some(place_type)
    }

    /// Case-insensitive name comparison.
    #[must_use]
    pub fn is_named(&self, name: &str) -> bool {
        self.name.to_uppercase() == name.to_uppercase()
    }
}
