//! Query capability catalog.
//!
//! Every capability is a [`Tool`](aiga_agent::Tool) over the directory
//! store, shaped to the fixed answer payloads the reply layer renders:
//! `search_doctor` answers carry a `doctors` array, `recommand_hospital`
//! answers carry a `hospitals` array, and faults become
//! `{"chat_type": "error", ...}` objects instead of propagated errors.

mod doctors;
mod hospitals;
mod location;
mod smart;
mod staff;

pub use doctors::{
    DoctorsByDepartmentOnlyTool, DoctorsByDiseaseAndDepartmentTool, DoctorsByDiseaseOnlyTool,
    RecommendDoctorsTool,
};
pub use hospitals::{
    HospitalsByDepartmentOnlyTool, HospitalsByDepartmentTool, HospitalsByDiseaseAndDepartmentTool,
    HospitalsByDiseaseOnlyTool, HospitalsByDiseaseTool,
};
pub use location::{DoctorsByLocationTool, HospitalsByLocationTool, LocationOnlyTool};
pub use smart::SmartSearchTool;
pub use staff::{DoctorByNameTool, DoctorsByHospitalTool};

pub(crate) use smart::COULD_NOT_FIND_MESSAGE;

use std::sync::Arc;

use aiga_agent::ToolRegistry;
use serde_json::{Value, json};
use tracing::warn;

use crate::args::has_multiword_term;
use crate::dictionary;
use crate::records::{DoctorRecord, HospitalRecord, dedup_doctors};
use crate::store::{DirectoryStore, DoctorQuery, TokenMatch};

/// Registry holding the full capability roster over one directory store.
pub fn default_catalog(store: Arc<dyn DirectoryStore>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(RecommendDoctorsTool::new(store.clone()));
    registry.register(DoctorsByDiseaseAndDepartmentTool::new(store.clone()));
    registry.register(DoctorsByDiseaseOnlyTool::new(store.clone()));
    registry.register(DoctorsByDepartmentOnlyTool::new(store.clone()));
    registry.register(DoctorsByHospitalTool::new(store.clone()));
    registry.register(DoctorByNameTool::new(store.clone()));
    registry.register(HospitalsByDepartmentTool::new(store.clone()));
    registry.register(HospitalsByDiseaseTool::new(store.clone()));
    registry.register(HospitalsByDiseaseAndDepartmentTool::new(store.clone()));
    registry.register(HospitalsByDiseaseOnlyTool::new(store.clone()));
    registry.register(HospitalsByDepartmentOnlyTool::new(store.clone()));
    registry.register(DoctorsByLocationTool::new(store.clone()));
    registry.register(HospitalsByLocationTool::new(store.clone()));
    registry.register(LocationOnlyTool::new(store.clone()));
    registry.register(SmartSearchTool::new());
    registry
}

pub(crate) fn doctor_answer(doctors: &[DoctorRecord], proposal: Option<&str>) -> Value {
    let mut answer = json!({ "doctors": doctors });
    if let Some(proposal) = proposal {
        answer["proposal"] = Value::String(proposal.to_string());
    }
    json!({ "chat_type": "search_doctor", "answer": answer })
}

pub(crate) fn empty_doctor_answer() -> Value {
    json!({ "chat_type": "search_doctor", "answer": { "doctors": [] } })
}

pub(crate) fn hospital_answer(hospitals: &[HospitalRecord]) -> Value {
    json!({ "chat_type": "recommand_hospital", "answer": { "hospitals": hospitals } })
}

pub(crate) fn empty_hospital_answer() -> Value {
    json!({ "chat_type": "recommand_hospital", "answer": { "hospitals": [] } })
}

pub(crate) fn fault(message: String) -> Value {
    json!({ "chat_type": "error", "message": message })
}

pub(crate) fn general(message: String) -> Value {
    json!({ "chat_type": "general", "message": message })
}

/// Standard disease forms: fixed dictionary first, directory second, the
/// raw term when neither knows it.
pub(crate) async fn standardize_diseases(
    store: &dyn DirectoryStore,
    terms: &[String],
) -> Vec<String> {
    let mut standardized = Vec::new();
    for term in terms {
        let standard = match dictionary::standard_disease(term) {
            Some(standard) => standard.to_string(),
            None => match store.standard_disease(term).await {
                Ok(Some(standard)) => standard,
                Ok(None) => term.clone(),
                Err(e) => {
                    warn!(error = %e, term = %term, "Disease standardization lookup failed");
                    term.clone()
                }
            },
        };
        if !standardized.contains(&standard) {
            standardized.push(standard);
        }
    }
    standardized
}

/// Per-disease ranked query, boolean AND first with an OR retry for
/// multi-word terms, merged and deduplicated across diseases.
pub(crate) async fn ranked_doctors_by_diseases(
    store: &dyn DirectoryStore,
    diseases: &[String],
    limit: usize,
) -> anyhow::Result<Vec<DoctorRecord>> {
    let mut merged = Vec::new();
    for disease in diseases {
        let term = vec![disease.clone()];
        let mut rows = store
            .search_doctors(&DoctorQuery {
                diseases: term.clone(),
                limit,
                ..Default::default()
            })
            .await?;
        if rows.is_empty() && has_multiword_term(&term) {
            rows = store
                .search_doctors(&DoctorQuery {
                    diseases: term,
                    token_match: TokenMatch::Any,
                    limit,
                    ..Default::default()
                })
                .await?;
        }
        merged.extend(rows);
    }
    Ok(dedup_doctors(merged))
}

/// Same-value detection for the disease/department argument pair. The
/// model occasionally fills both fields with the same terms; when they are
/// identical the trailing-"과" heuristic decides which field carries the
/// real intent.
pub(crate) fn identical_term_sets(diseases: &[String], departments: &[String]) -> bool {
    use std::collections::BTreeSet;
    if diseases.is_empty() || departments.is_empty() {
        return false;
    }
    let a: BTreeSet<&str> = diseases.iter().map(String::as_str).collect();
    let b: BTreeSet<&str> = departments.iter().map(String::as_str).collect();
    a == b
}

pub(crate) fn looks_like_department(term: &str) -> bool {
    term.trim().ends_with('과')
}

/// Shared retry policy: combined AND query first, one OR retry when the
/// strict pass found nothing and a term would split into tokens.
pub(crate) fn needs_or_retry(diseases: &[String], departments: &[String]) -> bool {
    has_multiword_term(diseases) || has_multiword_term(departments)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_sets_ignore_order() {
        let a = vec!["안과".to_string(), "내과".to_string()];
        let b = vec!["내과".to_string(), "안과".to_string()];
        assert!(identical_term_sets(&a, &b));
        assert!(!identical_term_sets(&a, &[]));
        assert!(!identical_term_sets(&a, &["안과".to_string()]));
    }

    #[test]
    fn department_suffix_heuristic() {
        assert!(looks_like_department("신경외과"));
        assert!(!looks_like_department("허리디스크"));
    }

    #[test]
    fn payload_shapes_carry_chat_types() {
        let empty = empty_doctor_answer();
        assert_eq!(empty["chat_type"], "search_doctor");
        assert!(empty["answer"]["doctors"].as_array().unwrap().is_empty());

        let error_payload = fault("검색 실패".to_string());
        assert_eq!(error_payload["chat_type"], "error");

        let hospitals = empty_hospital_answer();
        assert_eq!(hospitals["chat_type"], "recommand_hospital");
    }
}
