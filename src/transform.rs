// SPDX-FileCopyrightText: 2025 Robin Vobruba <hoijui.quaero@gmail.com>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Turns a place tree into the nested collections document
//! that gets bulk-imported into the document store.
//!
//! Codes of municipalities, main places and sub-places are used as document IDs.
//! As they are mostly sequential, each one gets a short random prefix,
//! e.g. `a3Z_GT421`, which avoids write hotspots in the store.

use rand::{distr::Alphanumeric, rngs::ThreadRng, Rng};

use crate::model::{
    import::{Collection, ImportDocument, ImportNode},
    tree::{MainPlace, Municipality, Province},
};

/// Number of random characters in front of each rewritten code.
pub const PREFIX_LEN: usize = 3;

/// Supplies the random part of rewritten codes.
pub trait KeyGenerator {
    fn prefix(&mut self) -> String;

    /// Rewrites `code` into `{prefix}_{code}`.
    fn key(&mut self, code: &str) -> String {
        format!("{}_{code}", self.prefix())
    }
}

/// Draws [`PREFIX_LEN`] alphanumeric characters per prefix.
#[derive(Debug, Clone)]
pub struct RandomKeys<R> {
    rng: R,
}

impl<R: Rng> RandomKeys<R> {
    pub const fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl Default for RandomKeys<ThreadRng> {
    fn default() -> Self {
        Self::new(rand::rng())
    }
}

impl<R: Rng> KeyGenerator for RandomKeys<R> {
    fn prefix(&mut self) -> String {
        (&mut self.rng)
            .sample_iter(Alphanumeric)
            .take(PREFIX_LEN)
            .map(char::from)
            .collect()
    }
}

fn main_place_node(
    main_place: &mut MainPlace,
    parent_path: &str,
    keys: &mut impl KeyGenerator,
) -> ImportNode {
    main_place.code = keys.key(&main_place.code);
    let path = format!("{parent_path}/{}/subPlaces", main_place.code);
    let mut node = ImportNode::branch(main_place.code.clone(), main_place.name.clone(), path.clone());
    let sub_places = sub_collection(&mut node, &path);
    for sub_place in main_place.sub_places.as_mut_slice() {
        sub_place.code = keys.key(&sub_place.code);
        sub_places.insert(
            sub_place.code.clone(),
            ImportNode::leaf(sub_place.code.clone(), sub_place.name.clone()),
        );
    }
    node
}

fn municipality_node(
    municipality: &mut Municipality,
    parent_path: &str,
    keys: &mut impl KeyGenerator,
) -> ImportNode {
    municipality.code = keys.key(&municipality.code);
    let path = format!("{parent_path}/{}/mainPlaces", municipality.code);
    let mut node = ImportNode::branch(
        municipality.code.clone(),
        municipality.name.clone(),
        path.clone(),
    );
    let main_places = sub_collection(&mut node, &path);
    for main_place in municipality.main_places.as_mut_slice() {
        let child = main_place_node(main_place, &path, keys);
        main_places.insert(main_place.code.clone(), child);
    }
    node
}

fn province_node(province: &mut Province, keys: &mut impl KeyGenerator) -> ImportNode {
    let path = format!("provinces/{}/municipalities", province.code);
    let mut node = ImportNode::branch(province.code.clone(), province.name.clone(), path.clone());
    let municipalities = sub_collection(&mut node, &path);
    for municipality in province.municipalities.as_mut_slice() {
        let child = municipality_node(municipality, &path, keys);
        municipalities.insert(municipality.code.clone(), child);
    }
    node
}

fn sub_collection<'a>(node: &'a mut ImportNode, path: &str) -> &'a mut Collection {
    node.sub_collection
        .get_or_insert_with(Default::default)
        .entry(path.to_owned())
        .or_default()
}

/// Transforms the place tree into the import document.
///
/// Every code below province level is rewritten in place
/// (see [`KeyGenerator::key`]),
/// so the tree should not be used for anything else afterwards.
/// Children lists that were never fetched become empty collections;
/// this never fails on an incomplete tree.
pub fn transform(provinces: &mut [Province], keys: &mut impl KeyGenerator) -> ImportDocument {
    let mut document = ImportDocument::default();
    for province in provinces {
        let node = province_node(province, keys);
        document.provinces.insert(province.code.clone(), node);
    }
    document
}
