// SPDX-FileCopyrightText: 2025 Robin Vobruba <hoijui.quaero@gmail.com>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Documents of one collection, by document ID.
pub type Collection = BTreeMap<String, ImportNode>;

/// Sub-collections of a document, by their full, hierarchical path
/// (e.g. `provinces/ZA_GP/municipalities`).
pub type SubCollections = BTreeMap<String, Collection>;

/// A single document of the import file.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ImportNode {
    pub code: String,
    pub name: String,
    /// Absent only on leaves (sub-places).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_collection: Option<SubCollections>,
}

impl ImportNode {
    #[must_use]
    pub const fn leaf(code: String, name: String) -> Self {
        Self {
            code,
            name,
            sub_collection: None,
        }
    }

    /// Creates a document with a single (initially empty) sub-collection.
    #[must_use]
    pub fn branch(code: String, name: String, sub_collection_path: String) -> Self {
        Self {
            code,
            name,
            sub_collection: Some(BTreeMap::from([(sub_collection_path, Collection::new())])),
        }
    }

    /// The sub-collection at the given path, if any.
    #[must_use]
    pub fn sub(&self, path: &str) -> Option<&Collection> {
        self.sub_collection.as_ref().and_then(|subs| subs.get(path))
    }
}

/// The whole import file, as consumed by the document stores bulk-import.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct ImportDocument {
    pub provinces: Collection,
}
