//! Directory store seam consumed by the query capabilities.

use aiga_agent::Coordinates;
use async_trait::async_trait;

use crate::records::{DoctorRecord, HospitalRecord};

/// How tokens inside one multi-word term combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenMatch {
    /// Every token must appear in the field.
    #[default]
    All,
    /// Any token is enough.
    Any,
}

/// Geographic scope of a search.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchArea {
    /// Address must contain the place terms.
    Within(String),
    /// Bounding box around a point, nearest first.
    Near(Coordinates),
}

/// Filter set for doctor rows. Each term list holds alternatives; a row
/// matches a list when any entry matches.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DoctorQuery {
    pub diseases: Vec<String>,
    pub departments: Vec<String>,
    pub names: Vec<String>,
    pub hospitals: Vec<String>,
    pub token_match: TokenMatch,
    /// Disease and department clauses must both hit, instead of either.
    pub require_both: bool,
    pub area: Option<SearchArea>,
    pub limit: usize,
}

/// Filter set for hospital rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HospitalQuery {
    pub diseases: Vec<String>,
    pub departments: Vec<String>,
    pub token_match: TokenMatch,
    pub require_both: bool,
    pub area: Option<SearchArea>,
    pub limit: usize,
}

/// Read side of the medical directory.
///
/// The shipped implementation holds the dataset in memory; a database-backed
/// implementation slots in behind the same trait.
#[async_trait]
pub trait DirectoryStore: Send + Sync {
    async fn search_doctors(&self, query: &DoctorQuery) -> anyhow::Result<Vec<DoctorRecord>>;

    async fn search_hospitals(&self, query: &HospitalQuery) -> anyhow::Result<Vec<HospitalRecord>>;

    /// Coordinates for a place term, resolved against directory addresses.
    async fn locate(&self, place: &str) -> anyhow::Result<Option<Coordinates>>;

    /// Canonical hospital name behind a shorthand, when a row answers to it.
    async fn canonical_hospital(&self, name: &str) -> anyhow::Result<Option<String>>;

    /// Standard disease name for a raw term, when the directory knows one.
    async fn standard_disease(&self, name: &str) -> anyhow::Result<Option<String>>;
}
