//! Location-scoped searches and the shared proximity handling.

use std::sync::Arc;

use aiga_agent::{Coordinates, Result, Tool, ToolOutput};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::error;

use super::{
    doctor_answer, empty_doctor_answer, empty_hospital_answer, fault, general, hospital_answer,
    standardize_diseases,
};
use crate::args::{StringOrList, final_limit, has_multiword_term};
use crate::store::{DirectoryStore, DoctorQuery, HospitalQuery, SearchArea, TokenMatch};

pub(crate) const INVALID_TARGET_MESSAGE: &str =
    "잘못된 검색 대상입니다. '의사' 또는 '병원' 중에서 선택해야 합니다.";
pub(crate) const MISSING_LOCATION_MESSAGE: &str = "지역 정보를 찾을 수 없습니다.";

fn unresolved_place_message(name: &str) -> String {
    format!(
        "입력하신 '{name}'의 위치를 찾을 수 없습니다. 더 정확한 주소(예: 시/도, 시/군/구 포함)를 알려주시겠어요?"
    )
}

/// Search scope a location-aware call resolves to.
pub(crate) enum Scope {
    Area(SearchArea),
    /// The call carries no usable location.
    Missing,
    /// Nearby anchor could not be resolved; the payload goes straight back.
    Failed(Value),
}

/// A nearby search anchors on the named place when one is given, else on
/// the device GPS. A plain regional search scopes by address text.
pub(crate) async fn resolve_scope(
    store: &dyn DirectoryStore,
    location: Option<&str>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    is_nearby: bool,
) -> anyhow::Result<Scope> {
    let location = location.map(str::trim).filter(|place| !place.is_empty());

    if is_nearby {
        if let Some(place) = location {
            return Ok(match store.locate(place).await? {
                Some(center) => Scope::Area(SearchArea::Near(center)),
                None => Scope::Failed(general(unresolved_place_message(place))),
            });
        }
        if let (Some(latitude), Some(longitude)) = (latitude, longitude) {
            return Ok(Scope::Area(SearchArea::Near(Coordinates {
                latitude,
                longitude,
            })));
        }
        return Ok(Scope::Failed(general(unresolved_place_message("현재 위치"))));
    }

    Ok(match location {
        Some(place) => Scope::Area(SearchArea::Within(place.to_string())),
        None => Scope::Missing,
    })
}

#[derive(Debug, Deserialize)]
struct LocationSearchInput {
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    department: StringOrList,
    #[serde(default)]
    disease: StringOrList,
    #[serde(default)]
    latitude: Option<f64>,
    #[serde(default)]
    longitude: Option<f64>,
    #[serde(default)]
    is_nearby: bool,
    #[serde(default)]
    limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct LocationOnlyInput {
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    target: Option<String>,
    #[serde(default)]
    latitude: Option<f64>,
    #[serde(default)]
    longitude: Option<f64>,
    #[serde(default)]
    is_nearby: bool,
    #[serde(default)]
    limit: Option<u32>,
}

fn location_schema(with_filters: bool) -> Value {
    let mut properties = json!({
        "location": {
            "description": "지역명 (예: 서울 강남구, 부산)",
            "type": "string"
        },
        "latitude": {
            "description": "근처 검색에 사용할 위도",
            "type": "number"
        },
        "longitude": {
            "description": "근처 검색에 사용할 경도",
            "type": "number"
        },
        "is_nearby": {
            "description": "근처 검색 여부",
            "type": "boolean"
        },
        "limit": {
            "description": "최대 결과 수",
            "type": "integer"
        }
    });
    if with_filters {
        properties["department"] = json!({
            "description": "진료과명. 여러 개면 배열로 전달",
            "type": ["string", "array"],
            "items": { "type": "string" }
        });
        properties["disease"] = json!({
            "description": "질환명. 여러 개면 배열로 전달",
            "type": ["string", "array"],
            "items": { "type": "string" }
        });
    } else {
        properties["target"] = json!({
            "description": "검색 대상, '의사' 또는 '병원'",
            "type": "string"
        });
    }
    json!({ "type": "object", "properties": properties })
}

/// Regional doctor search, optionally narrowed by department or disease.
pub struct DoctorsByLocationTool {
    store: Arc<dyn DirectoryStore>,
}

impl DoctorsByLocationTool {
    pub fn new(store: Arc<dyn DirectoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for DoctorsByLocationTool {
    fn name(&self) -> &str {
        "search_doctors_by_location"
    }

    fn description(&self) -> &str {
        "지역 또는 현재 위치 기준으로 의사를 검색합니다. 진료과나 질환으로 좁힐 수 있습니다."
    }

    fn parameters_schema(&self) -> Value {
        location_schema(true)
    }

    async fn execute(&self, args: Value) -> Result<ToolOutput> {
        let input: LocationSearchInput = serde_json::from_value(args)?;
        let limit = final_limit(input.limit);

        let outcome: anyhow::Result<Value> = async {
            let scope = resolve_scope(
                self.store.as_ref(),
                input.location.as_deref(),
                input.latitude,
                input.longitude,
                input.is_nearby,
            )
            .await?;
            let area = match scope {
                Scope::Area(area) => area,
                Scope::Missing => return Ok(empty_doctor_answer()),
                Scope::Failed(payload) => return Ok(payload),
            };

            let departments = input.department.values();
            let mut diseases = input.disease.values();
            if !diseases.is_empty() {
                diseases = standardize_diseases(self.store.as_ref(), &diseases).await;
            }
            let require_both = !diseases.is_empty() && !departments.is_empty();

            let query = DoctorQuery {
                diseases: diseases.clone(),
                departments: departments.clone(),
                require_both,
                area: Some(area),
                limit,
                ..Default::default()
            };
            let mut rows = self.store.search_doctors(&query).await?;
            if rows.is_empty()
                && (has_multiword_term(&diseases) || has_multiword_term(&departments))
            {
                rows = self
                    .store
                    .search_doctors(&DoctorQuery {
                        token_match: TokenMatch::Any,
                        ..query
                    })
                    .await?;
            }
            Ok(doctor_answer(&rows, None))
        }
        .await;

        match outcome {
            Ok(payload) => Ok(ToolOutput::success(payload)),
            Err(e) => {
                error!(error = %e, "Regional doctor search failed");
                Ok(ToolOutput::success(fault(format!(
                    "지역 기반 의사 검색 중 오류가 발생했습니다: {e}"
                ))))
            }
        }
    }
}

/// Regional hospital search, optionally narrowed by department or disease.
pub struct HospitalsByLocationTool {
    store: Arc<dyn DirectoryStore>,
}

impl HospitalsByLocationTool {
    pub fn new(store: Arc<dyn DirectoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for HospitalsByLocationTool {
    fn name(&self) -> &str {
        "search_hospitals_by_location"
    }

    fn description(&self) -> &str {
        "지역 또는 현재 위치 기준으로 병원을 검색합니다. 진료과나 질환으로 좁힐 수 있습니다."
    }

    fn parameters_schema(&self) -> Value {
        location_schema(true)
    }

    async fn execute(&self, args: Value) -> Result<ToolOutput> {
        let input: LocationSearchInput = serde_json::from_value(args)?;
        let limit = final_limit(input.limit);

        let outcome: anyhow::Result<Value> = async {
            let scope = resolve_scope(
                self.store.as_ref(),
                input.location.as_deref(),
                input.latitude,
                input.longitude,
                input.is_nearby,
            )
            .await?;
            let area = match scope {
                Scope::Area(area) => area,
                Scope::Missing => return Ok(empty_hospital_answer()),
                Scope::Failed(payload) => return Ok(payload),
            };

            let departments = input.department.values();
            let mut diseases = input.disease.values();
            if !diseases.is_empty() {
                diseases = standardize_diseases(self.store.as_ref(), &diseases).await;
            }
            let require_both = !diseases.is_empty() && !departments.is_empty();

            let query = HospitalQuery {
                diseases: diseases.clone(),
                departments: departments.clone(),
                require_both,
                area: Some(area),
                limit,
                ..Default::default()
            };
            let mut rows = self.store.search_hospitals(&query).await?;
            if rows.is_empty()
                && (has_multiword_term(&diseases) || has_multiword_term(&departments))
            {
                rows = self
                    .store
                    .search_hospitals(&HospitalQuery {
                        token_match: TokenMatch::Any,
                        ..query
                    })
                    .await?;
            }
            Ok(hospital_answer(&rows))
        }
        .await;

        match outcome {
            Ok(payload) => Ok(ToolOutput::success(payload)),
            Err(e) => {
                error!(error = %e, "Regional hospital search failed");
                Ok(ToolOutput::success(fault(format!(
                    "지역 기반 병원 검색 중 오류가 발생했습니다: {e}"
                ))))
            }
        }
    }
}

/// Pure location search over either target type.
pub struct LocationOnlyTool {
    store: Arc<dyn DirectoryStore>,
}

impl LocationOnlyTool {
    pub fn new(store: Arc<dyn DirectoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for LocationOnlyTool {
    fn name(&self) -> &str {
        "search_by_location_only"
    }

    fn description(&self) -> &str {
        "지역 정보만으로 의사 또는 병원을 검색합니다. target으로 대상을 고릅니다."
    }

    fn parameters_schema(&self) -> Value {
        location_schema(false)
    }

    async fn execute(&self, args: Value) -> Result<ToolOutput> {
        let input: LocationOnlyInput = serde_json::from_value(args)?;
        let target = input.target.as_deref().unwrap_or("의사").trim().to_string();
        if target != "의사" && target != "병원" {
            return Ok(ToolOutput::success(fault(INVALID_TARGET_MESSAGE.to_string())));
        }

        let limit = final_limit(input.limit);
        let outcome: anyhow::Result<Value> = async {
            let scope = resolve_scope(
                self.store.as_ref(),
                input.location.as_deref(),
                input.latitude,
                input.longitude,
                input.is_nearby,
            )
            .await?;
            let area = match scope {
                Scope::Area(area) => area,
                Scope::Missing => return Ok(fault(MISSING_LOCATION_MESSAGE.to_string())),
                Scope::Failed(payload) => return Ok(payload),
            };

            if target == "병원" {
                let rows = self
                    .store
                    .search_hospitals(&HospitalQuery {
                        area: Some(area),
                        limit,
                        ..Default::default()
                    })
                    .await?;
                return Ok(hospital_answer(&rows));
            }
            let rows = self
                .store
                .search_doctors(&DoctorQuery {
                    area: Some(area),
                    limit,
                    ..Default::default()
                })
                .await?;
            Ok(doctor_answer(&rows, None))
        }
        .await;

        match outcome {
            Ok(payload) => Ok(ToolOutput::success(payload)),
            Err(e) => {
                error!(error = %e, target = %target, "Location-only search failed");
                let message = if target == "병원" {
                    format!("지역 기반 병원 검색 중 오류가 발생했습니다: {e}")
                } else {
                    format!("지역 기반 의사 검색 중 오류가 발생했습니다: {e}")
                };
                Ok(ToolOutput::success(fault(message)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryDirectory;
    use crate::records::{DoctorRecord, DoctorScore, HospitalRecord};

    fn store_with_rows() -> Arc<dyn DirectoryStore> {
        let mut dir = InMemoryDirectory::default();
        dir.insert_doctor(DoctorRecord {
            doctor_id: 1,
            name: "김철수".to_string(),
            hospital: "서울중앙병원".to_string(),
            deptname: "안과".to_string(),
            specialties: "녹내장".to_string(),
            address: "서울특별시 중구 세종대로 1".to_string(),
            lat: 37.56,
            lon: 126.97,
            doctor_score: DoctorScore::new(5.0, 9.0, 8.0),
            ..Default::default()
        });
        dir.insert_doctor(DoctorRecord {
            doctor_id: 2,
            name: "박민수".to_string(),
            hospital: "부산바다병원".to_string(),
            deptname: "신경외과".to_string(),
            specialties: "허리디스크".to_string(),
            address: "부산광역시 해운대구 센텀로 20".to_string(),
            lat: 35.17,
            lon: 129.13,
            doctor_score: DoctorScore::new(4.0, 7.0, 6.0),
            ..Default::default()
        });
        dir.insert_hospital(HospitalRecord {
            name: "서울중앙병원".to_string(),
            address: "서울특별시 중구 세종대로 1".to_string(),
            lat: 37.56,
            lon: 126.97,
            hospital_id: "H-1".to_string(),
            ..Default::default()
        });
        dir.insert_hospital(HospitalRecord {
            name: "부산바다병원".to_string(),
            address: "부산광역시 해운대구 센텀로 20".to_string(),
            lat: 35.17,
            lon: 129.13,
            hospital_id: "H-2".to_string(),
            ..Default::default()
        });
        Arc::new(dir)
    }

    #[tokio::test]
    async fn regional_doctor_search_filters_by_address() {
        let tool = DoctorsByLocationTool::new(store_with_rows());
        let output = tool
            .execute(json!({"location": "부산", "department": "신경외과"}))
            .await
            .unwrap();

        let doctors = output.result["answer"]["doctors"].as_array().unwrap().clone();
        assert_eq!(doctors.len(), 1);
        assert_eq!(doctors[0]["name"], "박민수");
    }

    #[tokio::test]
    async fn nearby_search_uses_gps_when_no_place_named() {
        let tool = DoctorsByLocationTool::new(store_with_rows());
        let output = tool
            .execute(json!({"is_nearby": true, "latitude": 37.55, "longitude": 126.98}))
            .await
            .unwrap();

        let doctors = output.result["answer"]["doctors"].as_array().unwrap().clone();
        assert_eq!(doctors.len(), 1);
        assert_eq!(doctors[0]["name"], "김철수");
    }

    #[tokio::test]
    async fn nearby_search_without_anchor_asks_for_address() {
        let tool = DoctorsByLocationTool::new(store_with_rows());
        let output = tool.execute(json!({"is_nearby": true})).await.unwrap();

        assert_eq!(output.result["chat_type"], "general");
        let message = output.result["message"].as_str().unwrap();
        assert!(message.contains("현재 위치"));
        assert!(message.contains("시/군/구"));
    }

    #[tokio::test]
    async fn nearby_search_resolves_named_place_to_coordinates() {
        let tool = HospitalsByLocationTool::new(store_with_rows());
        let output = tool
            .execute(json!({"location": "해운대구", "is_nearby": true}))
            .await
            .unwrap();

        let hospitals = output.result["answer"]["hospitals"].as_array().unwrap().clone();
        assert_eq!(hospitals.len(), 1);
        assert_eq!(hospitals[0]["name"], "부산바다병원");
    }

    #[tokio::test]
    async fn unknown_place_gets_the_clarification_payload() {
        let tool = HospitalsByLocationTool::new(store_with_rows());
        let output = tool
            .execute(json!({"location": "달나라", "is_nearby": true}))
            .await
            .unwrap();

        assert_eq!(output.result["chat_type"], "general");
        assert!(
            output.result["message"]
                .as_str()
                .unwrap()
                .contains("'달나라'")
        );
    }

    #[tokio::test]
    async fn location_only_rejects_unknown_targets() {
        let tool = LocationOnlyTool::new(store_with_rows());
        let output = tool
            .execute(json!({"location": "서울", "target": "약국"}))
            .await
            .unwrap();

        assert_eq!(output.result["chat_type"], "error");
        assert_eq!(output.result["message"], INVALID_TARGET_MESSAGE);
    }

    #[tokio::test]
    async fn location_only_requires_a_location() {
        let tool = LocationOnlyTool::new(store_with_rows());
        let output = tool.execute(json!({"target": "병원"})).await.unwrap();

        assert_eq!(output.result["chat_type"], "error");
        assert_eq!(output.result["message"], MISSING_LOCATION_MESSAGE);
    }

    #[tokio::test]
    async fn location_only_switches_on_target() {
        let tool = LocationOnlyTool::new(store_with_rows());
        let output = tool
            .execute(json!({"location": "서울", "target": "병원"}))
            .await
            .unwrap();

        assert_eq!(output.result["chat_type"], "recommand_hospital");
        let hospitals = output.result["answer"]["hospitals"].as_array().unwrap().clone();
        assert_eq!(hospitals.len(), 1);
        assert_eq!(hospitals[0]["name"], "서울중앙병원");
    }
}
