//! In-memory reference implementation of the directory store.
//!
//! Matching is substring containment over the record text fields, with
//! token-level boolean handling for multi-word terms and a planar bounding
//! box for proximity scopes.

use std::cmp::Ordering;
use std::path::Path;

use aiga_agent::Coordinates;
use aiga_agent::agent::location::{expand_group_location, sido_long_form};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use crate::dictionary;
use crate::records::{DoctorRecord, HospitalRecord};
use crate::store::{DirectoryStore, DoctorQuery, HospitalQuery, SearchArea, TokenMatch};

/// Ranking weight applied to the patient plus public score sum.
const SCORE_WEIGHT: f64 = 0.3;
/// Half-side of the proximity bounding box, km.
const NEARBY_DISTANCE_KM: f64 = 50.0;
/// Kilometres per degree of latitude.
const KM_PER_LAT_DEGREE: f64 = 111.0;
/// Kilometres per degree of longitude at Korean latitudes.
const KM_PER_LON_DEGREE: f64 = 88.0;

/// Dataset file layout: two arrays of shaped records.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DirectoryData {
    #[serde(default)]
    pub doctors: Vec<DoctorRecord>,
    #[serde(default)]
    pub hospitals: Vec<HospitalRecord>,
}

/// Directory held fully in memory.
#[derive(Debug, Clone)]
pub struct InMemoryDirectory {
    doctors: Vec<DoctorRecord>,
    hospitals: Vec<HospitalRecord>,
    nearby_distance_km: f64,
}

impl Default for InMemoryDirectory {
    fn default() -> Self {
        Self::new(DirectoryData::default())
    }
}

impl InMemoryDirectory {
    pub fn new(data: DirectoryData) -> Self {
        Self {
            doctors: data.doctors,
            hospitals: data.hospitals,
            nearby_distance_km: NEARBY_DISTANCE_KM,
        }
    }

    /// Load the dataset from a JSON file with `doctors` and `hospitals` arrays.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("reading directory dataset {}", path.as_ref().display()))?;
        let data: DirectoryData =
            serde_json::from_str(&raw).context("parsing directory dataset")?;
        Ok(Self::new(data))
    }

    /// Override the proximity bounding-box radius.
    pub fn with_nearby_distance(mut self, km: f64) -> Self {
        self.nearby_distance_km = km;
        self
    }

    pub fn insert_doctor(&mut self, row: DoctorRecord) {
        self.doctors.push(row);
    }

    pub fn insert_hospital(&mut self, row: HospitalRecord) {
        self.hospitals.push(row);
    }

    pub fn doctor_count(&self) -> usize {
        self.doctors.len()
    }
}

/// One term against one field: all (or any) whitespace tokens contained.
/// An empty term never matches.
fn term_matches(field: &str, term: &str, mode: TokenMatch) -> bool {
    let tokens: Vec<&str> = term.split_whitespace().collect();
    if tokens.is_empty() {
        return false;
    }
    match mode {
        TokenMatch::All => tokens.iter().all(|t| field.contains(t)),
        TokenMatch::Any => tokens.iter().any(|t| field.contains(t)),
    }
}

fn any_term_matches(field: &str, terms: &[String], mode: TokenMatch) -> bool {
    terms.iter().any(|t| term_matches(field, t, mode))
}

/// Hospital field check through the alias expansion of each queried name.
fn hospital_field_matches(field: &str, names: &[String]) -> bool {
    names.iter().any(|name| {
        dictionary::hospital_aliases(name)
            .iter()
            .any(|alias| field.contains(alias))
    })
}

/// Address check for a place string. Every whitespace part must appear,
/// where a part may also match through its official si/do long form or
/// any member of a grouped region name.
fn address_matches(address: &str, place: &str) -> bool {
    let parts: Vec<&str> = place.split_whitespace().collect();
    if parts.is_empty() {
        return false;
    }
    parts.iter().all(|part| {
        if address.contains(part) {
            return true;
        }
        if let Some(long) = sido_long_form(part) {
            if address.contains(long) {
                return true;
            }
        }
        if let Some(members) = expand_group_location(part) {
            return members.iter().any(|member| {
                address.contains(member)
                    || sido_long_form(member).is_some_and(|long| address.contains(long))
            });
        }
        false
    })
}

fn within_box(lat: f64, lon: f64, center: &Coordinates, radius_km: f64) -> bool {
    let lat_range = radius_km / KM_PER_LAT_DEGREE;
    let lon_range = radius_km / KM_PER_LON_DEGREE;
    (lat - center.latitude).abs() <= lat_range && (lon - center.longitude).abs() <= lon_range
}

/// Squared planar distance in km, enough to order nearby rows.
fn distance_sq(lat: f64, lon: f64, center: &Coordinates) -> f64 {
    let dy = (lat - center.latitude) * KM_PER_LAT_DEGREE;
    let dx = (lon - center.longitude) * KM_PER_LON_DEGREE;
    dy * dy + dx * dx
}

fn cmp_f64(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

fn doctor_rank(row: &DoctorRecord) -> f64 {
    (row.doctor_score.patient_score + row.doctor_score.public_score) * SCORE_WEIGHT
}

fn area_matches(address: &str, lat: f64, lon: f64, area: Option<&SearchArea>, radius_km: f64) -> bool {
    match area {
        Some(SearchArea::Within(place)) => address_matches(address, place),
        Some(SearchArea::Near(center)) => within_box(lat, lon, center, radius_km),
        None => true,
    }
}

fn doctor_matches(row: &DoctorRecord, query: &DoctorQuery, radius_km: f64) -> bool {
    if !query.names.is_empty() && !query.names.iter().any(|n| row.name.contains(n.as_str())) {
        return false;
    }
    if !query.hospitals.is_empty() && !hospital_field_matches(&row.hospital, &query.hospitals) {
        return false;
    }

    let disease_hit =
        !query.diseases.is_empty() && any_term_matches(&row.specialties, &query.diseases, query.token_match);
    let department_hit = !query.departments.is_empty()
        && any_term_matches(&row.deptname, &query.departments, query.token_match);
    match (query.diseases.is_empty(), query.departments.is_empty()) {
        (true, true) => {}
        (false, true) => {
            if !disease_hit {
                return false;
            }
        }
        (true, false) => {
            if !department_hit {
                return false;
            }
        }
        (false, false) => {
            let hit = if query.require_both {
                disease_hit && department_hit
            } else {
                disease_hit || department_hit
            };
            if !hit {
                return false;
            }
        }
    }

    area_matches(&row.address, row.lat, row.lon, query.area.as_ref(), radius_km)
}

#[async_trait]
impl DirectoryStore for InMemoryDirectory {
    async fn search_doctors(&self, query: &DoctorQuery) -> Result<Vec<DoctorRecord>> {
        let mut rows: Vec<&DoctorRecord> = self
            .doctors
            .iter()
            .filter(|row| doctor_matches(row, query, self.nearby_distance_km))
            .collect();

        match &query.area {
            Some(SearchArea::Near(center)) => rows.sort_by(|a, b| {
                cmp_f64(
                    distance_sq(a.lat, a.lon, center),
                    distance_sq(b.lat, b.lon, center),
                )
            }),
            _ => rows.sort_by(|a, b| {
                cmp_f64(doctor_rank(b), doctor_rank(a)).then_with(|| a.name.cmp(&b.name))
            }),
        }

        Ok(rows.into_iter().take(query.limit).cloned().collect())
    }

    async fn search_hospitals(&self, query: &HospitalQuery) -> Result<Vec<HospitalRecord>> {
        // Pure area scans read the hospital table; disease/department scopes
        // derive hospitals from their matching doctors, busiest first.
        if query.diseases.is_empty() && query.departments.is_empty() {
            let mut rows: Vec<&HospitalRecord> = self
                .hospitals
                .iter()
                .filter(|h| {
                    area_matches(
                        &h.address,
                        h.lat,
                        h.lon,
                        query.area.as_ref(),
                        self.nearby_distance_km,
                    )
                })
                .collect();
            if let Some(SearchArea::Near(center)) = &query.area {
                rows.sort_by(|a, b| {
                    cmp_f64(
                        distance_sq(a.lat, a.lon, center),
                        distance_sq(b.lat, b.lon, center),
                    )
                });
            }
            return Ok(rows.into_iter().take(query.limit).cloned().collect());
        }

        let doctor_query = DoctorQuery {
            diseases: query.diseases.clone(),
            departments: query.departments.clone(),
            token_match: query.token_match,
            require_both: query.require_both,
            area: query.area.clone(),
            limit: usize::MAX,
            ..Default::default()
        };

        let mut groups: Vec<(HospitalRecord, usize)> = Vec::new();
        for row in self
            .doctors
            .iter()
            .filter(|r| doctor_matches(r, &doctor_query, self.nearby_distance_km))
        {
            match groups.iter_mut().find(|(h, _)| h.name == row.hospital) {
                Some((_, count)) => *count += 1,
                None => groups.push((row.hospital_record(), 1)),
            }
        }

        match &query.area {
            Some(SearchArea::Near(center)) => groups.sort_by(|(a, _), (b, _)| {
                cmp_f64(
                    distance_sq(a.lat, a.lon, center),
                    distance_sq(b.lat, b.lon, center),
                )
            }),
            _ => groups.sort_by(|(ha, ca), (hb, cb)| {
                cb.cmp(ca).then_with(|| ha.name.cmp(&hb.name))
            }),
        }

        Ok(groups
            .into_iter()
            .take(query.limit)
            .map(|(h, _)| h)
            .collect())
    }

    async fn locate(&self, place: &str) -> Result<Option<Coordinates>> {
        let mut lat_sum = 0.0;
        let mut lon_sum = 0.0;
        let mut count = 0usize;

        for h in &self.hospitals {
            if address_matches(&h.address, place) {
                lat_sum += h.lat;
                lon_sum += h.lon;
                count += 1;
            }
        }
        if count == 0 {
            for d in &self.doctors {
                if address_matches(&d.address, place) {
                    lat_sum += d.lat;
                    lon_sum += d.lon;
                    count += 1;
                }
            }
        }

        Ok((count > 0).then(|| Coordinates {
            latitude: lat_sum / count as f64,
            longitude: lon_sum / count as f64,
        }))
    }

    async fn canonical_hospital(&self, name: &str) -> Result<Option<String>> {
        let aliases = dictionary::hospital_aliases(name);
        if aliases.is_empty() {
            return Ok(None);
        }

        let candidates = self
            .hospitals
            .iter()
            .map(|h| h.name.as_str())
            .chain(self.doctors.iter().map(|d| d.hospital.as_str()));

        let mut best: Option<(f64, &str)> = None;
        for candidate in candidates {
            if !aliases.iter().any(|a| candidate.contains(a.as_str())) {
                continue;
            }
            let score = dictionary::name_similarity(name, candidate);
            let better = match best {
                Some((s, _)) => score > s,
                None => true,
            };
            if better {
                best = Some((score, candidate));
            }
        }

        Ok(best.map(|(_, canonical)| canonical.to_string()))
    }

    async fn standard_disease(&self, name: &str) -> Result<Option<String>> {
        Ok(dictionary::standard_disease(name).map(str::to_string))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{AiScore, DoctorScore};

    fn doctor(
        id: i64,
        name: &str,
        hospital: &str,
        dept: &str,
        specialties: &str,
        address: &str,
        lat: f64,
        lon: f64,
        patient_score: f64,
    ) -> DoctorRecord {
        DoctorRecord {
            doctor_id: id,
            name: name.to_string(),
            hospital: hospital.to_string(),
            deptname: dept.to_string(),
            specialties: specialties.to_string(),
            address: address.to_string(),
            lat,
            lon,
            hospital_hid: format!("H-{hospital}"),
            doctor_score: DoctorScore::new(5.0, patient_score, 5.0),
            ai_score: AiScore::from_ratios(0.9, 0.9, 0.9, 0.9),
            ..Default::default()
        }
    }

    fn hospital(name: &str, address: &str, lat: f64, lon: f64) -> HospitalRecord {
        HospitalRecord {
            name: name.to_string(),
            address: address.to_string(),
            lat,
            lon,
            hospital_id: format!("H-{name}"),
            ..Default::default()
        }
    }

    fn sample_directory() -> InMemoryDirectory {
        let mut dir = InMemoryDirectory::default();
        dir.insert_doctor(doctor(
            1,
            "김철수",
            "서울중앙병원",
            "순환기내과",
            "협심증 심근경색",
            "서울특별시 중구 세종대로 1",
            37.56,
            126.97,
            9.0,
        ));
        dir.insert_doctor(doctor(
            2,
            "이영희",
            "서울중앙병원",
            "안과",
            "녹내장 백내장",
            "서울특별시 중구 세종대로 1",
            37.56,
            126.97,
            8.0,
        ));
        dir.insert_doctor(doctor(
            3,
            "박민수",
            "부산바다병원",
            "신경외과",
            "허리디스크 척추관협착증",
            "부산광역시 해운대구 센텀로 20",
            35.17,
            129.13,
            7.0,
        ));
        dir.insert_doctor(doctor(
            4,
            "최지은",
            "연세대학교병원",
            "피부과",
            "아토피 피부염 건선",
            "서울특별시 서대문구 연세로 50",
            37.562,
            126.94,
            6.0,
        ));
        dir.insert_hospital(hospital(
            "서울중앙병원",
            "서울특별시 중구 세종대로 1",
            37.56,
            126.97,
        ));
        dir.insert_hospital(hospital(
            "부산바다병원",
            "부산광역시 해운대구 센텀로 20",
            35.17,
            129.13,
        ));
        dir
    }

    #[tokio::test]
    async fn disease_search_ranks_by_score() {
        let dir = sample_directory();
        let query = DoctorQuery {
            diseases: vec!["협심증".to_string()],
            limit: 10,
            ..Default::default()
        };
        let rows = dir.search_doctors(&query).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "김철수");
    }

    #[tokio::test]
    async fn multiword_term_needs_every_token_in_all_mode() {
        let dir = sample_directory();
        let all = DoctorQuery {
            diseases: vec!["아토피 습진".to_string()],
            limit: 10,
            ..Default::default()
        };
        assert!(dir.search_doctors(&all).await.unwrap().is_empty());

        let any = DoctorQuery {
            diseases: vec!["아토피 습진".to_string()],
            token_match: TokenMatch::Any,
            limit: 10,
            ..Default::default()
        };
        let rows = dir.search_doctors(&any).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "최지은");
    }

    #[tokio::test]
    async fn require_both_narrows_disease_and_department() {
        let dir = sample_directory();
        let either = DoctorQuery {
            diseases: vec!["협심증".to_string()],
            departments: vec!["안과".to_string()],
            limit: 10,
            ..Default::default()
        };
        assert_eq!(dir.search_doctors(&either).await.unwrap().len(), 2);

        let both = DoctorQuery {
            require_both: true,
            ..either
        };
        assert!(dir.search_doctors(&both).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn region_scope_honors_short_forms() {
        let dir = sample_directory();
        let query = DoctorQuery {
            area: Some(SearchArea::Within("부산".to_string())),
            limit: 10,
            ..Default::default()
        };
        let rows = dir.search_doctors(&query).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "박민수");
    }

    #[tokio::test]
    async fn proximity_scope_orders_nearest_first() {
        let dir = sample_directory();
        let center = Coordinates {
            latitude: 37.561,
            longitude: 126.95,
        };
        let query = DoctorQuery {
            area: Some(SearchArea::Near(center)),
            limit: 10,
            ..Default::default()
        };
        let rows = dir.search_doctors(&query).await.unwrap();
        // Busan sits outside the box; the Sinchon row is closest.
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].name, "최지은");
    }

    #[tokio::test]
    async fn hospital_search_groups_matching_doctors() {
        let dir = sample_directory();
        let query = HospitalQuery {
            departments: vec!["내과".to_string()],
            limit: 10,
            ..Default::default()
        };
        let rows = dir.search_hospitals(&query).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "서울중앙병원");
        assert_eq!(rows[0].hospital_id, "H-서울중앙병원");
    }

    #[tokio::test]
    async fn hospital_shorthand_resolves_to_canonical_name() {
        let dir = sample_directory();
        let canonical = dir.canonical_hospital("연세대병원").await.unwrap();
        assert_eq!(canonical.as_deref(), Some("연세대학교병원"));
    }

    #[tokio::test]
    async fn place_term_resolves_to_coordinates() {
        let dir = sample_directory();
        let point = dir.locate("부산 해운대구").await.unwrap().unwrap();
        assert!((point.latitude - 35.17).abs() < 1e-6);

        assert!(dir.locate("제주").await.unwrap().is_none());
    }
}
