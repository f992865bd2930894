//! Hospital searches keyed on diseases and departments.

use std::sync::Arc;

use aiga_agent::{Result, Tool, ToolOutput};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::error;

use super::{
    empty_hospital_answer, fault, hospital_answer, identical_term_sets, looks_like_department,
    standardize_diseases,
};
use crate::args::{StringOrList, final_limit, has_multiword_term};
use crate::records::HospitalRecord;
use crate::store::{DirectoryStore, HospitalQuery, TokenMatch};

const HOSPITAL_FAULT: &str = "병원 검색 중 오류가 발생했습니다";

#[derive(Debug, Deserialize)]
struct DiseaseInput {
    #[serde(default)]
    disease: StringOrList,
    #[serde(default)]
    limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct DepartmentInput {
    #[serde(default)]
    department: StringOrList,
    #[serde(default)]
    limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct DiseaseDepartmentInput {
    #[serde(default)]
    disease: StringOrList,
    #[serde(default)]
    department: StringOrList,
    #[serde(default)]
    limit: Option<u32>,
}

/// Disease/department hospital query, strict pass first with one loose
/// retry for multi-word terms.
async fn query_hospitals(
    store: &dyn DirectoryStore,
    diseases: &[String],
    departments: &[String],
    require_both: bool,
    limit: usize,
) -> anyhow::Result<Vec<HospitalRecord>> {
    let rows = store
        .search_hospitals(&HospitalQuery {
            diseases: diseases.to_vec(),
            departments: departments.to_vec(),
            require_both,
            limit,
            ..Default::default()
        })
        .await?;
    if !rows.is_empty() || !(has_multiword_term(diseases) || has_multiword_term(departments)) {
        return Ok(rows);
    }
    store
        .search_hospitals(&HospitalQuery {
            diseases: diseases.to_vec(),
            departments: departments.to_vec(),
            require_both,
            token_match: TokenMatch::Any,
            limit,
            ..Default::default()
        })
        .await
}

fn hospital_fault(e: impl std::fmt::Display) -> ToolOutput {
    ToolOutput::success(fault(format!("{HOSPITAL_FAULT}: {e}")))
}

/// Department-ranked hospital search.
pub struct HospitalsByDepartmentTool {
    store: Arc<dyn DirectoryStore>,
}

impl HospitalsByDepartmentTool {
    pub fn new(store: Arc<dyn DirectoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for HospitalsByDepartmentTool {
    fn name(&self) -> &str {
        "search_hospital_by_department"
    }

    fn description(&self) -> &str {
        "진료과명으로 해당 진료과 의사가 많은 병원을 검색합니다."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "department": {
                    "description": "진료과명. 여러 개면 배열로 전달",
                    "type": ["string", "array"],
                    "items": { "type": "string" }
                },
                "limit": {
                    "description": "최대 결과 수",
                    "type": "integer"
                }
            },
            "required": ["department"]
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolOutput> {
        let input: DepartmentInput = serde_json::from_value(args)?;
        let departments = input.department.values();
        if departments.is_empty() {
            return Ok(ToolOutput::success(empty_hospital_answer()));
        }

        let limit = final_limit(input.limit);
        match query_hospitals(self.store.as_ref(), &[], &departments, false, limit).await {
            Ok(rows) => Ok(ToolOutput::success(hospital_answer(&rows))),
            Err(e) => {
                error!(error = %e, "Department hospital search failed");
                Ok(hospital_fault(e))
            }
        }
    }
}

/// Disease-ranked hospital search.
pub struct HospitalsByDiseaseTool {
    store: Arc<dyn DirectoryStore>,
}

impl HospitalsByDiseaseTool {
    pub fn new(store: Arc<dyn DirectoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for HospitalsByDiseaseTool {
    fn name(&self) -> &str {
        "search_hospital_by_disease"
    }

    fn description(&self) -> &str {
        "질환명으로 해당 질환을 진료하는 병원을 검색합니다."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "disease": {
                    "description": "질환명. 여러 개면 배열로 전달",
                    "type": ["string", "array"],
                    "items": { "type": "string" }
                },
                "limit": {
                    "description": "최대 결과 수",
                    "type": "integer"
                }
            },
            "required": ["disease"]
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolOutput> {
        let input: DiseaseInput = serde_json::from_value(args)?;
        let diseases = input.disease.values();
        if diseases.is_empty() {
            return Ok(ToolOutput::success(empty_hospital_answer()));
        }

        let limit = final_limit(input.limit);
        let standardized = standardize_diseases(self.store.as_ref(), &diseases).await;
        match query_hospitals(self.store.as_ref(), &standardized, &[], false, limit).await {
            Ok(rows) => Ok(ToolOutput::success(hospital_answer(&rows))),
            Err(e) => {
                error!(error = %e, "Disease hospital search failed");
                Ok(hospital_fault(e))
            }
        }
    }
}

/// Combined disease and department hospital search with the identical-set
/// guard shared with the doctor variant.
pub struct HospitalsByDiseaseAndDepartmentTool {
    store: Arc<dyn DirectoryStore>,
}

impl HospitalsByDiseaseAndDepartmentTool {
    pub fn new(store: Arc<dyn DirectoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for HospitalsByDiseaseAndDepartmentTool {
    fn name(&self) -> &str {
        "search_hospital_by_disease_and_department"
    }

    fn description(&self) -> &str {
        "질환명과 진료과를 함께 지정해 병원을 검색합니다. 한쪽만 의미가 있으면 해당 기준으로 검색합니다."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "disease": {
                    "description": "질환명. 여러 개면 배열로 전달",
                    "type": ["string", "array"],
                    "items": { "type": "string" }
                },
                "department": {
                    "description": "진료과명. 여러 개면 배열로 전달",
                    "type": ["string", "array"],
                    "items": { "type": "string" }
                },
                "limit": {
                    "description": "최대 결과 수",
                    "type": "integer"
                }
            },
            "required": ["disease", "department"]
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolOutput> {
        let input: DiseaseDepartmentInput = serde_json::from_value(args)?;
        let mut diseases = input.disease.values();
        let mut departments = input.department.values();
        let limit = final_limit(input.limit);

        if diseases.is_empty() && departments.is_empty() {
            return Ok(ToolOutput::success(empty_hospital_answer()));
        }

        // One real intent split across both fields.
        if identical_term_sets(&diseases, &departments) {
            if departments.first().is_some_and(|t| looks_like_department(t)) {
                diseases.clear();
            } else {
                departments.clear();
            }
        }

        if !diseases.is_empty() {
            diseases = standardize_diseases(self.store.as_ref(), &diseases).await;
        }
        let require_both = !diseases.is_empty() && !departments.is_empty();

        match query_hospitals(self.store.as_ref(), &diseases, &departments, require_both, limit)
            .await
        {
            Ok(rows) => Ok(ToolOutput::success(hospital_answer(&rows))),
            Err(e) => {
                error!(error = %e, "Combined disease and department hospital search failed");
                Ok(hospital_fault(e))
            }
        }
    }
}

/// Disease-only hospital search, the fallback single.
pub struct HospitalsByDiseaseOnlyTool {
    store: Arc<dyn DirectoryStore>,
}

impl HospitalsByDiseaseOnlyTool {
    pub fn new(store: Arc<dyn DirectoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for HospitalsByDiseaseOnlyTool {
    fn name(&self) -> &str {
        "search_hospitals_by_disease_only"
    }

    fn description(&self) -> &str {
        "질환명만으로 병원을 검색합니다."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "disease": {
                    "description": "질환명. 여러 개면 배열로 전달",
                    "type": ["string", "array"],
                    "items": { "type": "string" }
                },
                "limit": {
                    "description": "최대 결과 수",
                    "type": "integer"
                }
            },
            "required": ["disease"]
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolOutput> {
        let input: DiseaseInput = serde_json::from_value(args)?;
        let diseases = input.disease.values();
        if diseases.is_empty() {
            return Ok(ToolOutput::success(empty_hospital_answer()));
        }

        let limit = final_limit(input.limit);
        let standardized = standardize_diseases(self.store.as_ref(), &diseases).await;
        match query_hospitals(self.store.as_ref(), &standardized, &[], false, limit).await {
            Ok(rows) => Ok(ToolOutput::success(hospital_answer(&rows))),
            Err(e) => {
                error!(error = %e, "Disease hospital search failed");
                Ok(hospital_fault(e))
            }
        }
    }
}

/// Department-only hospital search, the fallback single.
pub struct HospitalsByDepartmentOnlyTool {
    store: Arc<dyn DirectoryStore>,
}

impl HospitalsByDepartmentOnlyTool {
    pub fn new(store: Arc<dyn DirectoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for HospitalsByDepartmentOnlyTool {
    fn name(&self) -> &str {
        "search_hospitals_by_department_only"
    }

    fn description(&self) -> &str {
        "진료과명만으로 병원을 검색합니다."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "department": {
                    "description": "진료과명. 여러 개면 배열로 전달",
                    "type": ["string", "array"],
                    "items": { "type": "string" }
                },
                "limit": {
                    "description": "최대 결과 수",
                    "type": "integer"
                }
            },
            "required": ["department"]
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolOutput> {
        let input: DepartmentInput = serde_json::from_value(args)?;
        let departments = input.department.values();
        if departments.is_empty() {
            return Ok(ToolOutput::success(empty_hospital_answer()));
        }

        let limit = final_limit(input.limit);
        match query_hospitals(self.store.as_ref(), &[], &departments, false, limit).await {
            Ok(rows) => Ok(ToolOutput::success(hospital_answer(&rows))),
            Err(e) => {
                error!(error = %e, "Department hospital search failed");
                Ok(hospital_fault(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryDirectory;
    use crate::records::{DoctorRecord, DoctorScore};

    fn store_with_rows() -> Arc<dyn DirectoryStore> {
        let mut dir = InMemoryDirectory::default();
        for (id, name, hospital, dept, specialties) in [
            (1, "김철수", "서울중앙병원", "순환기내과", "협심증"),
            (2, "박영록", "서울중앙병원", "순환기내과", "심근경색"),
            (3, "이영희", "빛사랑안과", "안과", "녹내장 백내장"),
        ] {
            dir.insert_doctor(DoctorRecord {
                doctor_id: id,
                name: name.to_string(),
                hospital: hospital.to_string(),
                deptname: dept.to_string(),
                specialties: specialties.to_string(),
                address: "서울특별시 중구".to_string(),
                hospital_hid: format!("H-{id}"),
                doctor_score: DoctorScore::new(5.0, 8.0, 8.0),
                ..Default::default()
            });
        }
        Arc::new(dir)
    }

    #[tokio::test]
    async fn department_search_ranks_by_doctor_count() {
        let tool = HospitalsByDepartmentTool::new(store_with_rows());
        let output = tool.execute(json!({"department": "내과"})).await.unwrap();

        let hospitals = output.result["answer"]["hospitals"].as_array().unwrap().clone();
        assert_eq!(hospitals.len(), 1);
        assert_eq!(hospitals[0]["name"], "서울중앙병원");
        assert_eq!(output.result["chat_type"], "recommand_hospital");
    }

    #[tokio::test]
    async fn identical_sets_with_suffix_drop_the_disease_clause() {
        let tool = HospitalsByDiseaseAndDepartmentTool::new(store_with_rows());
        let output = tool
            .execute(json!({"disease": "안과", "department": "안과"}))
            .await
            .unwrap();

        let hospitals = output.result["answer"]["hospitals"].as_array().unwrap().clone();
        assert_eq!(hospitals.len(), 1);
        assert_eq!(hospitals[0]["name"], "빛사랑안과");
    }

    #[tokio::test]
    async fn distinct_sets_need_both_clauses() {
        let tool = HospitalsByDiseaseAndDepartmentTool::new(store_with_rows());
        let output = tool
            .execute(json!({"disease": "협심증", "department": "안과"}))
            .await
            .unwrap();
        assert!(
            output.result["answer"]["hospitals"]
                .as_array()
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn empty_arguments_short_circuit() {
        let tool = HospitalsByDiseaseTool::new(store_with_rows());
        let output = tool.execute(json!({"disease": []})).await.unwrap();
        assert!(
            output.result["answer"]["hospitals"]
                .as_array()
                .unwrap()
                .is_empty()
        );
    }
}
