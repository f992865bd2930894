//! Answer record shapes shared by the query capabilities.
//!
//! These are the exact objects the reply layer renders, so field names
//! stay aligned with what the frontend consumes.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Composite quality scores carried on every doctor answer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DoctorScore {
    pub paper_score: f64,
    pub patient_score: f64,
    pub public_score: f64,
    pub peer_score: f64,
}

impl DoctorScore {
    /// Peer scoring has no data source yet, the field stays at zero.
    pub fn new(paper_score: f64, patient_score: f64, public_score: f64) -> Self {
        Self {
            paper_score,
            patient_score,
            public_score,
            peer_score: 0.0,
        }
    }
}

/// Patient review scores on the 0-5 display scale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AiScore {
    pub kindness: f64,
    pub satisfaction: f64,
    pub explanation: f64,
    pub recommendation: f64,
}

impl AiScore {
    /// Convert stored 0-1 review ratios to the 0-5 display scale,
    /// rounded to one decimal.
    pub fn from_ratios(
        kindness: f64,
        satisfaction: f64,
        explanation: f64,
        recommendation: f64,
    ) -> Self {
        let scale = |v: f64| (v * 50.0).round() / 10.0;
        Self {
            kindness: scale(kindness),
            satisfaction: scale(satisfaction),
            explanation: scale(explanation),
            recommendation: scale(recommendation),
        }
    }
}

/// One doctor row as presented in a `search_doctor` answer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DoctorRecord {
    pub doctor_id: i64,
    pub name: String,
    pub hospital: String,
    pub deptname: String,
    /// Free-text specialty description, disease terms match against this.
    pub specialties: String,
    pub address: String,
    pub lat: f64,
    pub lon: f64,
    pub telephone: String,
    pub hospital_site: String,
    pub hospital_hid: String,
    pub url: String,
    pub education: String,
    pub career: String,
    pub photo: String,
    pub doctor_score: DoctorScore,
    pub ai_score: AiScore,
    #[serde(default)]
    pub paper: Vec<String>,
    #[serde(default)]
    pub review: Vec<String>,
}

impl DoctorRecord {
    /// Hospital identity of this row, shaped as a hospital answer record.
    pub fn hospital_record(&self) -> HospitalRecord {
        HospitalRecord {
            name: self.hospital.clone(),
            address: self.address.clone(),
            telephone: self.telephone.clone(),
            hospital_site: self.hospital_site.clone(),
            lat: self.lat,
            lon: self.lon,
            hospital_id: self.hospital_hid.clone(),
        }
    }
}

/// One hospital row as presented in a `recommand_hospital` answer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HospitalRecord {
    pub name: String,
    pub address: String,
    pub telephone: String,
    pub hospital_site: String,
    pub lat: f64,
    pub lon: f64,
    pub hospital_id: String,
}

/// Drop rows sharing a doctor id, keeping the first occurrence.
pub fn dedup_doctors(rows: Vec<DoctorRecord>) -> Vec<DoctorRecord> {
    let mut seen = HashSet::new();
    rows.into_iter()
        .filter(|row| seen.insert(row.doctor_id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ai_score_scales_to_display_range() {
        let score = AiScore::from_ratios(0.9, 0.85, 1.0, 0.333);
        assert_eq!(score.kindness, 4.5);
        assert_eq!(score.satisfaction, 4.3);
        assert_eq!(score.explanation, 5.0);
        assert_eq!(score.recommendation, 1.7);
    }

    #[test]
    fn peer_score_is_pinned_to_zero() {
        let score = DoctorScore::new(7.2, 8.0, 6.5);
        assert_eq!(score.peer_score, 0.0);
        assert_eq!(score.patient_score, 8.0);
    }

    #[test]
    fn dedup_keeps_first_row_per_doctor() {
        let a = DoctorRecord {
            doctor_id: 1,
            name: "김철수".to_string(),
            hospital: "서울중앙병원".to_string(),
            ..Default::default()
        };
        let b = DoctorRecord {
            doctor_id: 1,
            name: "김철수".to_string(),
            hospital: "분당지점".to_string(),
            ..Default::default()
        };
        let c = DoctorRecord {
            doctor_id: 2,
            name: "이영희".to_string(),
            ..Default::default()
        };

        let rows = dedup_doctors(vec![a.clone(), b, c.clone()]);
        assert_eq!(rows, vec![a, c]);
    }

    #[test]
    fn doctor_row_projects_its_hospital() {
        let row = DoctorRecord {
            doctor_id: 9,
            hospital: "연세세브란스병원".to_string(),
            address: "서울특별시 서대문구".to_string(),
            hospital_hid: "H-204".to_string(),
            lat: 37.56,
            lon: 126.94,
            ..Default::default()
        };

        let hospital = row.hospital_record();
        assert_eq!(hospital.name, "연세세브란스병원");
        assert_eq!(hospital.hospital_id, "H-204");
        assert_eq!(hospital.lat, 37.56);
    }
}
