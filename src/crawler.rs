// SPDX-FileCopyrightText: 2025 Robin Vobruba <hoijui.quaero@gmail.com>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Fills the gaps in a place tree, rank by rank,
//! with data looked up in the census API.
//!
//! Only nodes whose children are [`Children::Unfetched`] are looked up,
//! so a tree loaded from a snapshot is completed
//! without re-fetching anything already known.
//! Lookups are issued strictly one after the other.

use std::fmt;

use async_stream::stream;
use futures::stream::{LocalBoxStream, StreamExt};
use strum::Display;

use crate::{
    census::{self, LookupQuery, PlaceLookup},
    model::{
        place::{Place, PlaceType},
        tree::{Children, MainPlace, Municipality, Province, SubPlace},
    },
    snapshot::{self, SnapshotWriter},
};

/// A level of the place tree the crawler fetches children lists for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum Rank {
    /// Fetching the municipalities of a province,
    /// including the expansion of its districts.
    Municipality,
    /// Fetching the main places of a municipality.
    MainPlace,
    /// Fetching the sub-places of a main place.
    SubPlace,
}

/// A single lookup that failed during a crawl.
#[derive(Debug)]
pub struct FetchFailure {
    pub rank: Rank,
    /// Name of the place whose children we tried to fetch.
    pub name: String,
    pub code: String,
    pub error: census::Error,
}

impl FetchFailure {
    fn new(rank: Rank, name: &str, code: &str, error: census::Error) -> Self {
        Self {
            rank,
            name: name.to_owned(),
            code: code.to_owned(),
            error,
        }
    }

    fn log(&self, province: &str) {
        if self.error.is_transport() {
            tracing::warn!("{province}: {self}; worth a retry");
        } else {
            tracing::warn!("{province}: {self}");
        }
    }
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} lookup of {} ({}) failed: {}",
            self.rank, self.name, self.code, self.error
        )
    }
}

/// What happened while crawling a single province.
#[derive(Debug, Default)]
pub struct ProvinceOutcome {
    pub failures: Vec<FetchFailure>,
    /// Number of lookups issued.
    pub lookups: usize,
}

impl ProvinceOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    async fn fetch<L: PlaceLookup>(
        &mut self,
        lookup: &L,
        query: &LookupQuery,
    ) -> Result<Place, census::Error> {
        self.lookups += 1;
        lookup.lookup_one(query).await
    }
}

/// A province as left behind by the crawler,
/// complete or not.
#[derive(Debug)]
pub struct CrawledProvince {
    pub province: Province,
    pub outcome: ProvinceOutcome,
}

/// Summary of a whole crawl run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CrawlReport {
    pub provinces: usize,
    /// Names of the provinces with at least one failed lookup,
    /// in crawl order.
    pub failed_provinces: Vec<String>,
    pub failures: usize,
    pub lookups: usize,
}

impl CrawlReport {
    pub fn record(&mut self, province: &Province, outcome: &ProvinceOutcome) {
        self.provinces += 1;
        self.lookups += outcome.lookups;
        self.failures += outcome.failures.len();
        if !outcome.is_success() {
            self.failed_provinces.push(province.name.clone());
        }
    }

    /// Whether no lookup failed in this run.
    /// If so, the written snapshot holds the complete tree.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed_provinces.is_empty()
    }

    pub fn log(&self) {
        if self.is_success() {
            tracing::info!(
                "Writing of place data complete ({} provinces, {} lookups).",
                self.provinces,
                self.lookups
            );
        } else {
            tracing::warn!(
                "Done. Fetch errors ({}) occurred with these provinces: {}. Please re-run.",
                self.failures,
                self.failed_provinces.join(", ")
            );
        }
    }
}

fn sort_by_name(municipalities: &mut [Municipality]) {
    municipalities.sort_by_cached_key(|municipality| {
        (municipality.name.to_lowercase(), municipality.code.clone())
    });
}

pub struct Crawler<L> {
    lookup: L,
}

impl<L: PlaceLookup> Crawler<L> {
    pub const fn new(lookup: L) -> Self {
        Self { lookup }
    }

    pub const fn lookup(&self) -> &L {
        &self.lookup
    }

    /// Fetches the complete municipality list of a province.
    ///
    /// Districts are replaced by their children.
    /// If any of the lookups fails, nothing is returned,
    /// so the province never ends up with a partial list.
    async fn fetch_municipalities(
        &self,
        province: &Province,
        outcome: &mut ProvinceOutcome,
    ) -> Result<Vec<Municipality>, FetchFailure> {
        let query = LookupQuery::new(&province.name).place_type(PlaceType::Province);
        let province_place = outcome
            .fetch(&self.lookup, &query)
            .await
            .map_err(|err| {
                FetchFailure::new(Rank::Municipality, &province.name, &province.code, err)
            })?;

        let (districts, direct): (Vec<Place>, Vec<Place>) = province_place
            .children
            .into_iter()
            .partition(|child| child.is_of_type(PlaceType::District));
        let mut municipalities: Vec<Municipality> =
            direct.into_iter().map(Municipality::from).collect();

        for district in districts {
            tracing::debug!("   Expanding {} district ...", district.name);
            let query = LookupQuery::new(&district.name)
                .place_type(PlaceType::District)
                .code(&district.code);
            let district_place = outcome
                .fetch(&self.lookup, &query)
                .await
                .map_err(|err| {
                    FetchFailure::new(Rank::Municipality, &district.name, &district.code, err)
                })?;
            municipalities.extend(district_place.children.into_iter().map(Municipality::from));
        }

        sort_by_name(&mut municipalities);
        Ok(municipalities)
    }

    async fn fetch_main_places(
        &self,
        province: &str,
        municipality: &mut Municipality,
        outcome: &mut ProvinceOutcome,
    ) {
        tracing::debug!("   Processing {} municipality ...", municipality.name);
        let query = LookupQuery::new(&municipality.name).code(&municipality.code);
        municipality.main_places = match outcome.fetch(&self.lookup, &query).await {
            Ok(place) => Children::Fetched(place.children.into_iter().map(MainPlace::from).collect()),
            Err(err) => {
                let failure =
                    FetchFailure::new(Rank::MainPlace, &municipality.name, &municipality.code, err);
                failure.log(province);
                outcome.failures.push(failure);
                Children::Failed
            }
        };
    }

    async fn fetch_sub_places(
        &self,
        province: &str,
        main_place: &mut MainPlace,
        outcome: &mut ProvinceOutcome,
    ) {
        tracing::debug!("       Processing {} main place ...", main_place.name);
        let query = LookupQuery::new(&main_place.name)
            .place_type(PlaceType::MainPlace)
            .code(&main_place.code);
        main_place.sub_places = match outcome.fetch(&self.lookup, &query).await {
            Ok(place) => Children::Fetched(place.children.into_iter().map(SubPlace::from).collect()),
            Err(err) => {
                let failure =
                    FetchFailure::new(Rank::SubPlace, &main_place.name, &main_place.code, err);
                failure.log(province);
                outcome.failures.push(failure);
                Children::Failed
            }
        };
    }

    /// Fetches whatever is missing of a single province, in place.
    ///
    /// A failure at the municipality rank ends the crawl of the province.
    /// Failures at the lower ranks only mark the affected node,
    /// and its siblings are still attempted.
    pub async fn crawl_province(&self, province: &mut Province) -> ProvinceOutcome {
        tracing::info!("Processing {} ...", province.name);
        let mut outcome = ProvinceOutcome::default();

        if province.municipalities.is_unfetched() {
            match self.fetch_municipalities(province, &mut outcome).await {
                Ok(municipalities) => province.municipalities = Children::Fetched(municipalities),
                Err(failure) => {
                    failure.log(&province.name);
                    province.municipalities = Children::Failed;
                    outcome.failures.push(failure);
                    return outcome;
                }
            }
        }

        for municipality in province.municipalities.as_mut_slice() {
            if municipality.main_places.is_unfetched() {
                self.fetch_main_places(&province.name, municipality, &mut outcome)
                    .await;
            }
        }

        for municipality in province.municipalities.as_mut_slice() {
            for main_place in municipality.main_places.as_mut_slice() {
                if main_place.sub_places.is_unfetched() {
                    self.fetch_sub_places(&province.name, main_place, &mut outcome)
                        .await;
                }
            }
        }

        if !outcome.is_success() {
            tracing::warn!("Data outstanding for {}", province.name);
        }
        outcome
    }

    /// Crawls the provinces one after the other,
    /// yielding each as soon as it is done with.
    pub fn crawl(&self, provinces: Vec<Province>) -> LocalBoxStream<'_, CrawledProvince> {
        let crawler = self;
        stream! {
            for mut province in provinces {
                let outcome = crawler.crawl_province(&mut province).await;
                yield CrawledProvince { province, outcome };
            }
        }
        .boxed_local()
    }

    /// Crawls the provinces,
    /// appending each one to the snapshot as soon as it is done with.
    pub async fn crawl_into(
        &self,
        provinces: Vec<Province>,
        writer: &mut SnapshotWriter,
    ) -> Result<CrawlReport, snapshot::Error> {
        let mut report = CrawlReport::default();
        let mut crawled = self.crawl(provinces);
        while let Some(CrawledProvince { province, outcome }) = crawled.next().await {
            report.record(&province, &outcome);
            tracing::info!("Writing province {}", province.name);
            writer.append(&province).await?;
        }
        Ok(report)
    }
}
