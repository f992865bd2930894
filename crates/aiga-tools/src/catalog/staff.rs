//! Hospital staff and doctor-detail lookups.

use std::sync::Arc;

use aiga_agent::{Result, Tool, ToolOutput};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{error, warn};

use super::{doctor_answer, empty_doctor_answer, fault};
use crate::args::{StringOrList, final_limit};
use crate::store::{DirectoryStore, DoctorQuery};

#[derive(Debug, Deserialize)]
struct HospitalStaffInput {
    #[serde(default)]
    hospital: StringOrList,
    #[serde(default)]
    department: StringOrList,
    #[serde(default)]
    name: StringOrList,
    #[serde(default)]
    limit: Option<u32>,
    #[serde(default)]
    proposal: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DoctorNameInput {
    #[serde(default)]
    name: StringOrList,
    #[serde(default)]
    hospital: StringOrList,
    #[serde(default)]
    department: StringOrList,
    #[serde(default)]
    limit: Option<u32>,
}

/// Staff lookup for a named hospital, optionally narrowed by department
/// or doctor name.
pub struct DoctorsByHospitalTool {
    store: Arc<dyn DirectoryStore>,
}

impl DoctorsByHospitalTool {
    pub fn new(store: Arc<dyn DirectoryStore>) -> Self {
        Self { store }
    }

    /// Shorthand names resolve to the canonical directory names; an
    /// unresolved shorthand stays as typed.
    async fn canonical_names(&self, names: &[String]) -> Vec<String> {
        let mut resolved = Vec::new();
        for name in names {
            let canonical = match self.store.canonical_hospital(name).await {
                Ok(Some(canonical)) => canonical,
                Ok(None) => name.clone(),
                Err(e) => {
                    warn!(error = %e, hospital = %name, "Hospital name resolution failed");
                    name.clone()
                }
            };
            if !resolved.contains(&canonical) {
                resolved.push(canonical);
            }
        }
        resolved
    }
}

#[async_trait]
impl Tool for DoctorsByHospitalTool {
    fn name(&self) -> &str {
        "search_doctors_by_hospital_name"
    }

    fn description(&self) -> &str {
        "병원명으로 해당 병원 소속 의사를 검색합니다. 진료과나 의사 이름으로 좁힐 수 있습니다."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "hospital": {
                    "description": "병원명. 여러 개면 배열로 전달",
                    "type": ["string", "array"],
                    "items": { "type": "string" }
                },
                "department": {
                    "description": "진료과명",
                    "type": ["string", "array"],
                    "items": { "type": "string" }
                },
                "name": {
                    "description": "의사 이름",
                    "type": ["string", "array"],
                    "items": { "type": "string" }
                },
                "limit": {
                    "description": "최대 결과 수",
                    "type": "integer"
                },
                "proposal": {
                    "description": "추천 사유 또는 제안 문구",
                    "type": "string"
                }
            },
            "required": ["hospital"]
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolOutput> {
        let input: HospitalStaffInput = serde_json::from_value(args)?;
        let hospitals = input.hospital.values();
        if hospitals.is_empty() {
            return Ok(ToolOutput::success(empty_doctor_answer()));
        }

        let resolved = self.canonical_names(&hospitals).await;
        let query = DoctorQuery {
            hospitals: resolved.clone(),
            departments: input.department.values(),
            names: input.name.values(),
            limit: final_limit(input.limit),
            ..Default::default()
        };

        match self.store.search_doctors(&query).await {
            Ok(rows) => Ok(ToolOutput::success(json!({
                "chat_type": "search_doctor",
                "answer": {
                    "doctors": rows,
                    "hospital": resolved.join(", "),
                    "proposal": input.proposal.as_deref().unwrap_or(""),
                }
            }))),
            Err(e) => {
                error!(error = %e, "Hospital staff search failed");
                Ok(ToolOutput::success(fault(format!(
                    "병원명 기반 의사 검색 중 오류가 발생했습니다: {e}"
                ))))
            }
        }
    }
}

/// Doctor detail lookup by name.
pub struct DoctorByNameTool {
    store: Arc<dyn DirectoryStore>,
}

impl DoctorByNameTool {
    pub fn new(store: Arc<dyn DirectoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for DoctorByNameTool {
    fn name(&self) -> &str {
        "search_doctor_by_name"
    }

    fn description(&self) -> &str {
        "의사 이름으로 상세 정보를 검색합니다. 병원명이나 진료과로 좁힐 수 있습니다."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "name": {
                    "description": "의사 이름. 여러 명이면 배열로 전달",
                    "type": ["string", "array"],
                    "items": { "type": "string" }
                },
                "hospital": {
                    "description": "병원명",
                    "type": ["string", "array"],
                    "items": { "type": "string" }
                },
                "department": {
                    "description": "진료과명",
                    "type": ["string", "array"],
                    "items": { "type": "string" }
                },
                "limit": {
                    "description": "최대 결과 수",
                    "type": "integer"
                }
            },
            "required": ["name"]
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolOutput> {
        let input: DoctorNameInput = serde_json::from_value(args)?;
        let names = input.name.values();
        if names.is_empty() {
            return Ok(ToolOutput::success(empty_doctor_answer()));
        }

        let query = DoctorQuery {
            names,
            hospitals: input.hospital.values(),
            departments: input.department.values(),
            limit: final_limit(input.limit),
            ..Default::default()
        };

        match self.store.search_doctors(&query).await {
            Ok(rows) => Ok(ToolOutput::success(doctor_answer(&rows, None))),
            Err(e) => {
                error!(error = %e, "Doctor detail search failed");
                Ok(ToolOutput::success(fault(format!(
                    "의사 상세 정보 검색 중 오류가 발생했습니다: {e}"
                ))))
            }
        }
    }
}
