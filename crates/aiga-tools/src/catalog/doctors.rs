//! Doctor searches keyed on diseases and departments.

use std::sync::Arc;

use aiga_agent::{Result, Tool, ToolOutput};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::error;

use super::{
    doctor_answer, empty_doctor_answer, fault, identical_term_sets, looks_like_department,
    ranked_doctors_by_diseases, standardize_diseases,
};
use crate::args::{StringOrList, final_limit, has_multiword_term};
use crate::records::DoctorRecord;
use crate::store::{DirectoryStore, DoctorQuery, TokenMatch};

#[derive(Debug, Deserialize)]
struct DiseaseInput {
    #[serde(default)]
    disease: StringOrList,
    #[serde(default)]
    limit: Option<u32>,
    #[serde(default)]
    proposal: Option<String>,
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
    #[serde(default)]
    proposal: Option<String>,
}

/// Department query with the strict pass first and one loose retry for
/// multi-word terms.
async fn department_doctors(
    store: &dyn DirectoryStore,
    departments: &[String],
    limit: usize,
) -> anyhow::Result<Vec<DoctorRecord>> {
    let rows = store
        .search_doctors(&DoctorQuery {
            departments: departments.to_vec(),
            limit,
            ..Default::default()
        })
        .await?;
    if !rows.is_empty() || !has_multiword_term(departments) {
        return Ok(rows);
    }
    store
        .search_doctors(&DoctorQuery {
            departments: departments.to_vec(),
            token_match: TokenMatch::Any,
            limit,
            ..Default::default()
        })
        .await
}

/// Disease-ranked doctor recommendation, the primary disease entry point.
pub struct RecommendDoctorsTool {
    store: Arc<dyn DirectoryStore>,
}

impl RecommendDoctorsTool {
    pub fn new(store: Arc<dyn DirectoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for RecommendDoctorsTool {
    fn name(&self) -> &str {
        "getRecommandDoctors"
    }

    fn description(&self) -> &str {
        "질환명으로 해당 질환을 잘 보는 의사를 평가 점수 순으로 추천합니다."
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
                },
                "proposal": {
                    "description": "추천 사유 또는 제안 문구",
                    "type": "string"
                }
            },
            "required": ["disease"]
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolOutput> {
        let input: DiseaseInput = serde_json::from_value(args)?;
        let diseases = input.disease.values();
        if diseases.is_empty() {
            return Ok(ToolOutput::success(empty_doctor_answer()));
        }

        let limit = final_limit(input.limit);
        let standardized = standardize_diseases(self.store.as_ref(), &diseases).await;
        match ranked_doctors_by_diseases(self.store.as_ref(), &standardized, limit).await {
            Ok(rows) => Ok(ToolOutput::success(doctor_answer(
                &rows,
                Some(input.proposal.as_deref().unwrap_or("")),
            ))),
            Err(e) => {
                error!(error = %e, "Disease doctor recommendation failed");
                Ok(ToolOutput::success(fault(format!(
                    "의사 검색 중 오류가 발생했습니다: {e}"
                ))))
            }
        }
    }
}

/// Combined disease and department doctor search.
///
/// The model sometimes mirrors the same terms into both fields; identical
/// sets collapse to the single field the trailing-"과" heuristic picks.
pub struct DoctorsByDiseaseAndDepartmentTool {
    store: Arc<dyn DirectoryStore>,
}

impl DoctorsByDiseaseAndDepartmentTool {
    pub fn new(store: Arc<dyn DirectoryStore>) -> Self {
        Self { store }
    }

    async fn combined(
        &self,
        diseases: &[String],
        departments: &[String],
        limit: usize,
    ) -> anyhow::Result<Vec<DoctorRecord>> {
        let rows = self
            .store
            .search_doctors(&DoctorQuery {
                diseases: diseases.to_vec(),
                departments: departments.to_vec(),
                require_both: true,
                limit,
                ..Default::default()
            })
            .await?;
        if !rows.is_empty() || !(has_multiword_term(diseases) || has_multiword_term(departments)) {
            return Ok(rows);
        }
        self.store
            .search_doctors(&DoctorQuery {
                diseases: diseases.to_vec(),
                departments: departments.to_vec(),
                require_both: true,
                token_match: TokenMatch::Any,
                limit,
                ..Default::default()
            })
            .await
    }
}

#[async_trait]
impl Tool for DoctorsByDiseaseAndDepartmentTool {
    fn name(&self) -> &str {
        "search_doctors_by_disease_and_department"
    }

    fn description(&self) -> &str {
        "질환명과 진료과를 함께 지정해 의사를 검색합니다. 한쪽만 의미가 있으면 해당 기준으로 검색합니다."
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
                },
                "proposal": {
                    "description": "추천 사유 또는 제안 문구",
                    "type": "string"
                }
            },
            "required": ["disease", "department"]
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolOutput> {
        let input: DiseaseDepartmentInput = serde_json::from_value(args)?;
        let diseases = input.disease.values();
        let departments = input.department.values();
        let limit = final_limit(input.limit);
        let proposal = input.proposal.as_deref().unwrap_or("");

        if diseases.is_empty() && departments.is_empty() {
            return Ok(ToolOutput::success(empty_doctor_answer()));
        }

        if identical_term_sets(&diseases, &departments) {
            // One real intent split across both fields.
            if departments.first().is_some_and(|t| looks_like_department(t)) {
                return match department_doctors(self.store.as_ref(), &departments, limit).await {
                    Ok(rows) => Ok(ToolOutput::success(doctor_answer(&rows, Some(proposal)))),
                    Err(e) => {
                        error!(error = %e, "Department doctor search failed");
                        Ok(ToolOutput::success(fault(format!(
                            "진료과목 기반 의사 검색 중 오류가 발생했습니다: {e}"
                        ))))
                    }
                };
            }
            let standardized = standardize_diseases(self.store.as_ref(), &diseases).await;
            return match ranked_doctors_by_diseases(self.store.as_ref(), &standardized, limit)
                .await
            {
                Ok(rows) => Ok(ToolOutput::success(doctor_answer(&rows, Some(proposal)))),
                Err(e) => {
                    error!(error = %e, "Disease doctor recommendation failed");
                    Ok(ToolOutput::success(fault(
                        "질환 기반 의사 추천 중 오류가 발생했습니다.".to_string(),
                    )))
                }
            };
        }

        if diseases.is_empty() {
            return match department_doctors(self.store.as_ref(), &departments, limit).await {
                Ok(rows) => Ok(ToolOutput::success(doctor_answer(&rows, Some(proposal)))),
                Err(e) => {
                    error!(error = %e, "Department doctor search failed");
                    Ok(ToolOutput::success(fault(format!(
                        "진료과목 기반 의사 검색 중 오류가 발생했습니다: {e}"
                    ))))
                }
            };
        }
        if departments.is_empty() {
            let standardized = standardize_diseases(self.store.as_ref(), &diseases).await;
            return match ranked_doctors_by_diseases(self.store.as_ref(), &standardized, limit)
                .await
            {
                Ok(rows) => Ok(ToolOutput::success(doctor_answer(&rows, Some(proposal)))),
                Err(e) => {
                    error!(error = %e, "Disease doctor recommendation failed");
                    Ok(ToolOutput::success(fault(
                        "질환 기반 의사 추천 중 오류가 발생했습니다.".to_string(),
                    )))
                }
            };
        }

        let standardized = standardize_diseases(self.store.as_ref(), &diseases).await;
        match self.combined(&standardized, &departments, limit).await {
            Ok(rows) => Ok(ToolOutput::success(doctor_answer(&rows, Some(proposal)))),
            Err(e) => {
                error!(error = %e, "Combined disease and department doctor search failed");
                Ok(ToolOutput::success(fault(
                    "질환/진료과 기반 의사 검색 중 오류가 발생했습니다.".to_string(),
                )))
            }
        }
    }
}

/// Disease-only doctor search, the fallback single.
pub struct DoctorsByDiseaseOnlyTool {
    store: Arc<dyn DirectoryStore>,
}

impl DoctorsByDiseaseOnlyTool {
    pub fn new(store: Arc<dyn DirectoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for DoctorsByDiseaseOnlyTool {
    fn name(&self) -> &str {
        "search_doctors_by_disease_only"
    }

    fn description(&self) -> &str {
        "질환명만으로 의사를 검색합니다."
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
            return Ok(ToolOutput::success(empty_doctor_answer()));
        }

        let limit = final_limit(input.limit);
        let standardized = standardize_diseases(self.store.as_ref(), &diseases).await;
        match ranked_doctors_by_diseases(self.store.as_ref(), &standardized, limit).await {
            Ok(rows) => Ok(ToolOutput::success(doctor_answer(&rows, None))),
            Err(e) => {
                error!(error = %e, "Disease doctor search failed");
                Ok(ToolOutput::success(fault(format!(
                    "의사 검색 중 오류가 발생했습니다: {e}"
                ))))
            }
        }
    }
}

/// Department-only doctor search, the fallback single.
pub struct DoctorsByDepartmentOnlyTool {
    store: Arc<dyn DirectoryStore>,
}

impl DoctorsByDepartmentOnlyTool {
    pub fn new(store: Arc<dyn DirectoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for DoctorsByDepartmentOnlyTool {
    fn name(&self) -> &str {
        "search_doctors_by_department_only"
    }

    fn description(&self) -> &str {
        "진료과명만으로 의사를 검색합니다."
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
            return Ok(ToolOutput::success(empty_doctor_answer()));
        }

        let limit = final_limit(input.limit);
        match department_doctors(self.store.as_ref(), &departments, limit).await {
            Ok(rows) => Ok(ToolOutput::success(doctor_answer(&rows, None))),
            Err(e) => {
                error!(error = %e, "Department doctor search failed");
                Ok(ToolOutput::success(fault(format!(
                    "진료과목 기반 의사 검색 중 오류가 발생했습니다: {e}"
                ))))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryDirectory;
    use crate::records::{AiScore, DoctorScore};

    fn store_with_rows() -> Arc<dyn DirectoryStore> {
        let mut dir = InMemoryDirectory::default();
        dir.insert_doctor(DoctorRecord {
            doctor_id: 1,
            name: "김철수".to_string(),
            hospital: "서울중앙병원".to_string(),
            deptname: "순환기내과".to_string(),
            specialties: "협심증 심근경색".to_string(),
            address: "서울특별시 중구".to_string(),
            doctor_score: DoctorScore::new(5.0, 9.0, 8.0),
            ai_score: AiScore::from_ratios(0.9, 0.9, 0.9, 0.9),
            ..Default::default()
        });
        dir.insert_doctor(DoctorRecord {
            doctor_id: 2,
            name: "이영희".to_string(),
            hospital: "서울안과의원".to_string(),
            deptname: "안과".to_string(),
            specialties: "녹내장 백내장".to_string(),
            address: "서울특별시 종로구".to_string(),
            doctor_score: DoctorScore::new(4.0, 8.0, 7.0),
            ai_score: AiScore::from_ratios(0.8, 0.8, 0.8, 0.8),
            ..Default::default()
        });
        dir.insert_doctor(DoctorRecord {
            doctor_id: 3,
            name: "박민수".to_string(),
            hospital: "부산바다병원".to_string(),
            deptname: "신경외과".to_string(),
            specialties: "허리디스크".to_string(),
            address: "부산광역시 해운대구".to_string(),
            doctor_score: DoctorScore::new(3.0, 7.0, 6.0),
            ai_score: AiScore::from_ratios(0.7, 0.7, 0.7, 0.7),
            ..Default::default()
        });
        Arc::new(dir)
    }

    #[tokio::test]
    async fn multi_disease_recommendation_merges_and_dedups() {
        let tool = RecommendDoctorsTool::new(store_with_rows());
        let output = tool
            .execute(json!({"disease": ["협심증", "녹내장"], "proposal": "두 질환 모두"}))
            .await
            .unwrap();

        let doctors = output.result["answer"]["doctors"].as_array().unwrap().clone();
        assert_eq!(doctors.len(), 2);
        assert_eq!(output.result["chat_type"], "search_doctor");
        assert_eq!(output.result["answer"]["proposal"], "두 질환 모두");
    }

    #[tokio::test]
    async fn alias_disease_standardizes_before_matching() {
        let tool = RecommendDoctorsTool::new(store_with_rows());
        // "디스크" standardizes to "허리디스크" and matches the specialty text.
        let output = tool.execute(json!({"disease": "디스크"})).await.unwrap();
        let doctors = output.result["answer"]["doctors"].as_array().unwrap().clone();
        assert_eq!(doctors.len(), 1);
        assert_eq!(doctors[0]["name"], "박민수");
    }

    #[tokio::test]
    async fn empty_disease_short_circuits() {
        let tool = RecommendDoctorsTool::new(store_with_rows());
        let output = tool.execute(json!({"disease": ""})).await.unwrap();
        assert!(
            output.result["answer"]["doctors"]
                .as_array()
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn identical_sets_with_suffix_run_department_search() {
        let tool = DoctorsByDiseaseAndDepartmentTool::new(store_with_rows());
        let output = tool
            .execute(json!({"disease": "신경외과", "department": "신경외과"}))
            .await
            .unwrap();

        let doctors = output.result["answer"]["doctors"].as_array().unwrap().clone();
        assert_eq!(doctors.len(), 1);
        assert_eq!(doctors[0]["name"], "박민수");
    }

    #[tokio::test]
    async fn identical_sets_without_suffix_run_disease_search() {
        let tool = DoctorsByDiseaseAndDepartmentTool::new(store_with_rows());
        let output = tool
            .execute(json!({"disease": "허리디스크", "department": "허리디스크"}))
            .await
            .unwrap();

        let doctors = output.result["answer"]["doctors"].as_array().unwrap().clone();
        assert_eq!(doctors.len(), 1);
        assert_eq!(doctors[0]["name"], "박민수");
    }

    #[tokio::test]
    async fn distinct_sets_require_both_clauses() {
        let tool = DoctorsByDiseaseAndDepartmentTool::new(store_with_rows());
        let output = tool
            .execute(json!({"disease": "협심증", "department": "안과"}))
            .await
            .unwrap();
        assert!(
            output.result["answer"]["doctors"]
                .as_array()
                .unwrap()
                .is_empty()
        );

        let output = tool
            .execute(json!({"disease": "협심증", "department": "순환기내과"}))
            .await
            .unwrap();
        let doctors = output.result["answer"]["doctors"].as_array().unwrap().clone();
        assert_eq!(doctors[0]["name"], "김철수");
    }

    #[tokio::test]
    async fn department_only_matches_partial_names() {
        let tool = DoctorsByDepartmentOnlyTool::new(store_with_rows());
        let output = tool.execute(json!({"department": "내과"})).await.unwrap();
        let doctors = output.result["answer"]["doctors"].as_array().unwrap().clone();
        assert_eq!(doctors.len(), 1);
        assert_eq!(doctors[0]["name"], "김철수");
    }
}
