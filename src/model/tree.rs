// SPDX-FileCopyrightText: 2025 Robin Vobruba <hoijui.quaero@gmail.com>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::ops::AddAssign;

use super::place::Place;

/// The fetch state of the children of a node in the place tree.
///
/// On disc, only [`Self::Fetched`] is represented (as a JSON array);
/// both other states are written as an absent field,
/// and an absent field is read back as [`Self::Unfetched`].
/// This is what makes resuming safe:
/// a present array is proof that the node needs no further fetching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Children<T> {
    /// We have not yet tried to fetch the children (in this run).
    Unfetched,
    /// We tried to fetch the children in this run, and failed.
    /// Never persisted.
    Failed,
    /// The complete, ordered list of children.
    /// It may legitimately be empty.
    Fetched(Vec<T>),
}

impl<T> Default for Children<T> {
    fn default() -> Self {
        Self::Unfetched
    }
}

impl<T> Children<T> {
    #[must_use]
    pub const fn is_fetched(&self) -> bool {
        matches!(self, Self::Fetched(_))
    }

    #[must_use]
    pub const fn is_unfetched(&self) -> bool {
        matches!(self, Self::Unfetched)
    }

    /// Whether this is not persisted to disc.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        !self.is_fetched()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        match self {
            Self::Fetched(children) => children,
            Self::Unfetched | Self::Failed => &[],
        }
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        match self {
            Self::Fetched(children) => children,
            Self::Unfetched | Self::Failed => &mut [],
        }
    }
}

impl<T: Serialize> Serialize for Children<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Fetched(children) => children.serialize(serializer),
            Self::Unfetched | Self::Failed => serializer.serialize_none(),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Children<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Option::<Vec<T>>::deserialize(deserializer)?.map_or(Self::Unfetched, Self::Fetched))
    }
}

/// Leaf of the place tree.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SubPlace {
    pub code: String,
    pub name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MainPlace {
    pub code: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Children::is_pending")]
    pub sub_places: Children<SubPlace>,
}

/// A metro or local municipality.
///
/// Local municipalities that belong to a district
/// are stored directly under their province.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Municipality {
    pub code: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Children::is_pending")]
    pub main_places: Children<MainPlace>,
}

/// Root of a place tree; a snapshot is a list of these.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Province {
    pub code: String,
    pub name: String,
    /// Sorted by name, once fetched.
    #[serde(default, skip_serializing_if = "Children::is_pending")]
    pub municipalities: Children<Municipality>,
}

macro_rules! impl_node_new {
    ($type:ty, $children:ident) => {
        impl $type {
            #[must_use]
            pub fn new<C: Into<String>, N: Into<String>>(code: C, name: N) -> Self {
                Self {
                    code: code.into(),
                    name: name.into(),
                    $children: Children::Unfetched,
                }
            }
        }
    };
}

impl_node_new!(Province, municipalities);
impl_node_new!(Municipality, main_places);
impl_node_new!(MainPlace, sub_places);

impl SubPlace {
    #[must_use]
    pub fn new<C: Into<String>, N: Into<String>>(code: C, name: N) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
        }
    }
}

macro_rules! impl_from_place {
    ($type:ty) => {
        impl From<Place> for $type {
            fn from(place: Place) -> Self {
                Self::new(place.code, place.name)
            }
        }
    };
}

impl_from_place!(Municipality);
impl_from_place!(MainPlace);
impl_from_place!(SubPlace);

/// Number of children lists within a (sub-)tree
/// that are not yet fetched.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Outstanding {
    pub municipalities: usize,
    pub main_places: usize,
    pub sub_places: usize,
}

impl Outstanding {
    #[must_use]
    pub const fn total(&self) -> usize {
        self.municipalities + self.main_places + self.sub_places
    }

    #[must_use]
    pub const fn is_none(&self) -> bool {
        self.total() == 0
    }
}

impl AddAssign for Outstanding {
    fn add_assign(&mut self, other: Self) {
        self.municipalities += other.municipalities;
        self.main_places += other.main_places;
        self.sub_places += other.sub_places;
    }
}

impl Province {
    /// Counts the children lists still to be fetched below (and including) this province.
    ///
    /// Lists below an unfetched list are unknown,
    /// and thus not counted.
    #[must_use]
    pub fn outstanding(&self) -> Outstanding {
        let mut outstanding = Outstanding::default();
        if self.municipalities.is_pending() {
            outstanding.municipalities += 1;
        }
        for municipality in self.municipalities.as_slice() {
            if municipality.main_places.is_pending() {
                outstanding.main_places += 1;
            }
            outstanding.sub_places += municipality
                .main_places
                .as_slice()
                .iter()
                .filter(|main_place| main_place.sub_places.is_pending())
                .count();
        }
        outstanding
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.outstanding().is_none()
    }
}

/// Sums up [`Province::outstanding`] over a whole tree.
///
/// Seed provinces missing from the tree count as
/// one outstanding municipality list each.
#[must_use]
pub fn outstanding(provinces: &[Province]) -> Outstanding {
    let mut outstanding = Outstanding {
        municipalities: missing_seed(provinces).count(),
        ..Outstanding::default()
    };
    for province in provinces {
        outstanding += province.outstanding();
    }
    outstanding
}

/// The provinces every fresh tree starts out with.
pub const SEED_PROVINCES: [(&str, &str); 9] = [
    ("ZA_EC", "EASTERN CAPE"),
    ("ZA_FS", "FREE STATE"),
    ("ZA_GP", "GAUTENG"),
    ("ZA_NL", "KWAZULU-NATAL"),
    ("ZA_LP", "LIMPOPO"),
    ("ZA_MP", "MPUMALANGA"),
    ("ZA_NC", "NORTHERN CAPE"),
    ("ZA_NW", "NORTH WEST"),
    ("ZA_WC", "WESTERN CAPE"),
];

#[must_use]
pub fn seed() -> Vec<Province> {
    SEED_PROVINCES
        .iter()
        .map(|(code, name)| Province::new(*code, *name))
        .collect()
}

/// The seed provinces (code, name) not present in `provinces`,
/// matched by code.
pub fn missing_seed(
    provinces: &[Province],
) -> impl Iterator<Item = (&'static str, &'static str)> + '_ {
    SEED_PROVINCES
        .into_iter()
        .filter(|(code, _)| !provinces.iter().any(|province| province.code == *code))
}

/// Appends every seed province that is missing from `provinces`, as yet unfetched.
///
/// Returns the number of provinces added.
pub fn merge_seed(provinces: &mut Vec<Province>) -> usize {
    let missing: Vec<Province> = missing_seed(provinces)
        .map(|(code, name)| Province::new(code, name))
        .collect();
    let added = missing.len();
    provinces.extend(missing);
    added
}

/// Appends the provinces of `older` whose code is not yet in `provinces`.
///
/// Returns the number of provinces added.
pub fn merge_missing(provinces: &mut Vec<Province>, older: Vec<Province>) -> usize {
    let missing: Vec<Province> = older
        .into_iter()
        .filter(|old| !provinces.iter().any(|province| province.code == old.code))
        .collect();
    let added = missing.len();
    provinces.extend(missing);
    added
}
