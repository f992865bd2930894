//! Prompt constants and builders.
//!
//! All user-facing strings live here so the orchestration code stays free of
//! literal text.

use crate::agent::entity::EntityMemory;
use crate::agent::session::Coordinates;

/// Base counselor persona and tool usage rules.
pub const SYSTEM_PROMPT: &str = r#"당신은 건강 및 의료 상담을 제공하는 전문 AI 상담사다.

당신의 역할은 사용자의 질문에서 다음 정보를 정확히 추출하고, 필요 시 도구를 사용하여 관련 정보를 제공한다:
- 질환명 (disease)
- 진료과 (department)
- 병원명 (hospital)
- 의사명 (name)

사용자의 질문 의도에 따라 제공된 검색 도구를 사용할 수 있다:

💡 **도구 선택 기준**

1. 먼저 사용자의 질문 의도를 정확히 파악.
2. 해당 의도에 맞는 도구를 선택.
3. 선택한 도구의 필수 입력값이 질문과 이전 대화에 **명확히 포함되어 있으면 도구를 호출**한다.
4. ❗ 필수 입력값이 명확하지 않거나 빠져 있다면, 도구를 호출하지 말고 **부족한 정보를 사용자에게 정중히 질문해라.**

💡 **도구 출력 예시**
{
   "chat_type": "recommand_doctor", or "recommand_hospital", or "search_doctor",
   "answer": {
      "doctors": [], or "hospitals": [],
   }
}

❗ 도구 호출의 결과에 doctors 또는 hospitals에 값이 있으면 그 내용을 요약해서 2줄(50글자) 내로 응답해라.
doctors 또는 hospitals에 값이 없으면([]) 당신이 알고 있는 지식 또는 정보를 찾아서 3줄 100자 내로 응답해라.

그 외 일반적인 건강 관련 질문에 대해서는 직접 친절하게 응답해라.
"#;

/// Prefix marking the accumulated narrative summary inside the transcript.
pub const SUMMARY_PREFIX: &str = "이전 대화는 다음과 같이 요약되었습니다:";

/// Answer substituted when an in-flight turn is cancelled.
pub const STOPPED_ANSWER: &str = "요청이 중지되었습니다.";

/// Apology substituted after an unrecoverable protocol fault.
pub const PROCESSING_FAILURE_APOLOGY: &str =
    "처리 중 문제가 발생하여 요청을 완료하지 못했습니다. 다시 시도해 주시거나 다른 질문을 해주세요.";

/// Apology substituted when the content filter rejects a second attempt.
pub const CONTENT_FILTER_APOLOGY: &str =
    "죄송합니다. AI 콘텐츠 필터링 정책으로 답변이 일시 중단되었습니다. 표현을 바꿔 다시 질문해주세요.";

/// Answer used when the turn fails with an unexpected error.
pub const UNEXPECTED_FAILURE_APOLOGY: &str =
    "죄송합니다. 서비스 처리 중 예상치 못한 오류가 발생했습니다.";

/// Guidance returned for emergency queries without calling the model.
pub const EMERGENCY_INTRODUCTION: &str = "응급 상황으로 보입니다. 지금 바로 119에 전화하시거나 가까운 응급실을 방문해 주세요. 응급 상황에서는 빠른 초기 대응이 무엇보다 중요합니다. 증상이 안정된 후에 진료 예약이나 의료진 안내가 필요하시면 다시 말씀해 주세요.";

/// Placeholder content for an externalized tool result without a summary.
pub const MIGRATED_PLACEHOLDER: &str = "과거 도구 실행 결과가 외부에 저장되었습니다.";

pub const DEFAULT_GREETING: &str = "안녕하세요! 의료 안내 서비스 AIGA입니다.";

/// Greeting shown on the first interaction of a session, per locale.
pub fn greeting_for(locale: &str) -> &'static str {
    match locale {
        "en" => "Hello! This is AIGA, your medical guide service.",
        "ja" => "こんにちは！医療案内サービスのAIGAです。",
        "zh" => "您好！这里是医疗咨询服务AIGA。",
        _ => DEFAULT_GREETING,
    }
}

/// Language the final answer must be written in, per locale.
pub fn language_name(locale: &str) -> &'static str {
    match locale {
        "en" => "English",
        "ja" => "Japanese",
        "zh" => "Chinese",
        _ => "Korean",
    }
}

/// Refusal for recommendation targets the service does not cover.
pub fn forbidden_recommendation_reply(service_name: &str, term: &str) -> String {
    format!(
        "죄송합니다. 현재 {service_name} 서비스에서는 '{term}'에 대한 추천을 제공하고 있지 않습니다. 추천비대상은 치과와 한의원입니다."
    )
}

/// Answer for a current-position question when reverse geocoding succeeded.
pub fn current_position_reply(address: &str) -> String {
    format!("현재 계신 곳은 '{address}' 입니다.")
}

/// Answer when the coordinates could not be resolved to an address.
pub fn unresolved_position_reply(latitude: f64, longitude: f64) -> String {
    format!("불분명한 좌표 (위도: {latitude}, 경도: {longitude})로 주소를 찾을 수 없었습니다.")
}

/// Answer for a current-position question asked without any coordinates.
pub const NO_POSITION_REPLY: &str = "죄송합니다. 현재 위치 정보가 없어 정확한 주소를 알려드릴 수 없습니다. 위치 정보 제공에 동의해주시면 더욱 정확한 정보를 드릴 수 있습니다.";

/// Clarification for an anchor found in the ambiguous-region table.
pub fn ambiguous_location_question(anchor: &str, options: &str) -> String {
    format!("문의하신 '{anchor}'은(는) 어떤 지역을 말씀하시는 건가요? (예: {options})")
}

/// Clarification for an anchor the model judged to be a domestic place.
pub fn unknown_location_question(anchor: &str) -> String {
    format!("문의하신 '{anchor}'은(는) 어느 시/도에 속한 지역을 말씀하시는 건가요?")
}

/// Yes/no appropriateness check over one (question, answer) pair.
pub fn validation_prompt(question: &str, answer: &str) -> String {
    format!(
        r#"
system:
당신은 사용자의 질문과 AI의 응답을 보고, 응답이 적절하고 유용한지 판단하는 검증자 입니다.
응답이 적절하고 질문에 잘 대응하고 있다면 "yes",
특히, 응답이 자신을 소개하고 주제를 건강/의료로 제한하는 것은 현재 시스템이 의도한 봐이므로 적절한 것으로 판단해주세요.
그외 전혀 무관하거나 적절하지 않으면 "no" 를 출력하세요.

[질문]
{question}

[응답]
{answer}
"#
    )
}

/// Narrative timeline summarization of old conversation turns.
pub fn summary_prompt(conversation_text: &str) -> String {
    format!(
        "다음 대화 내용을 하나의 완결된 문장으로, 서술형으로 요약해주세요.\n\
         요약에는 대화의 핵심 의도와 맥락이 잘 드러나야 합니다.\n\
         만약 대화 내용에 특정 의사, 병원, 질환명 등 핵심 개체가 포함되어 있다면, 요약문에 해당 개체들을 명시적으로 포함해주세요.\n\
         예: '사용자의 OOO 요청에 따라, AI가 XXX 도구를 사용해 YYY 정보를 제공함. (포함된 개체: 김의사, 서울병원)'\n\n\
         --- 요약할 대화 내용 ---\n{conversation_text}\n\n\
         --- 서술형 요약 ---"
    )
}

/// Extraction of medical entities from one piece of free text.
pub fn entity_extraction_prompt(text: &str) -> String {
    format!(
        r#"사용자의 문장에서 '질병', '진료과', '병원', '의사', '지역' 이름을 추출하세요.
- disease: 질병 또는 증상의 이름.
- department: 진료과의 이름.
- hospital: 병원의 이름.
- doctor: 의사로 추정되는 사람의 이름.
- location: 지역의 이름 (예: '서울', '강남구'). **병원 이름에 포함된 지역명(예: '서울대병원'의 '서울')은 'location'으로 분류하지 마세요. 'location'은 오직 독립적인 지역 명칭일 때만 추출해야 합니다.**
반드시 아래 예시와 같이, 추출된 이름을 문자열 리스트로 포함하는 JSON 객체 형식으로만 응답해야 합니다.
[예시 1]
Sentence: "간암 명의 추천해줘"
JSON: {{"diseases": ["간암"], "departments": [], "hospitals": [], "doctors": [], "location": null}}
[예시 2]
Sentence: "허리 디스크로 고생중인데, 서울 우리들병원 김철수 의사 어때?"
JSON: {{"diseases": ["허리 디스크"], "departments": [], "hospitals": ["우리들병원"], "doctors": ["김철수"], "location": "서울"}}
[예시 3]
Sentence: "서울대병원에서 치료받고 싶어요. 심장내과 선생님을 추천해 주세요."
JSON: {{"diseases": [], "departments": ["심장내과"], "hospitals": ["서울대병원"], "doctors": [], "location": null}}
[예시 4]
Sentence: "서울에서 서울대병원 심장내과 선생님을 추천해 주세요."
JSON: {{"diseases": [], "departments": ["심장내과"], "hospitals": ["서울대병원"], "doctors": [], "location": "서울"}}
[실제 작업]
Sentence: "{text}"
JSON:"#
    )
}

/// Extraction of routing entities over the rendered recent history.
pub fn routing_extraction_prompt(history: &str, entities: &EntityMemory) -> String {
    let hospitals = serde_json::to_string(&entities.hospitals).unwrap_or_else(|_| "[]".to_string());
    let doctors = serde_json::to_string(&entities.doctor_names()).unwrap_or_else(|_| "[]".to_string());
    let departments =
        serde_json::to_string(&entities.departments).unwrap_or_else(|_| "[]".to_string());
    let diseases = serde_json::to_string(&entities.diseases).unwrap_or_else(|_| "[]".to_string());
    let location = serde_json::to_string(&entities.location).unwrap_or_else(|_| "null".to_string());

    format!(
        r#"아래 대화 기록과 현재까지 추출된 엔티티 정보 (현재 턴 및 persistent entity_history에서 통합됨)를 모두 참고하여 'location', 'disease', 'department', 'target'('의사' 또는 '병원')를 추출합니다.
**현재까지 추출된 엔티티 정보는 아래 JSON 블록으로 제공되며, 이 정보는 사용자의 명시적인 질문 또는 이전 대화의 맥락에서 통합된 가장 신뢰할 수 있는 엔티티 데이터입니다. LLM은 이 정보를 최우선으로 활용하여 다음 단계를 결정해야 합니다.**

[현재까지 추출된 엔티티 (통합 정보)]
{{
    "diseases": {diseases},
    "departments": {departments},
    "hospitals": {hospitals},
    "doctors": {doctors},
    "location": {location}
}}

[규칙]
1. **그룹 지역명 인식**: "부울경", "수도권", "전라도", "경상도", "충청도"와 같은 광역 그룹 이름은 'location'으로 추출되어야 한다.
2. **매우 중요: '소아과', '내과', '심장내과'와 같은 진료과목 이름은 절대로 'disease' 필드에 넣지 말라. 'disease' 필드는 '감기', '고혈압', '당뇨'와 같은 실제 질병이나 증상 이름만 포함해야 한다. 진료과목은 'department' 필드에만 해당된다.**
   - **만약 'disease'가 명확하게 추출되었다면, 해당 질병을 주로 다루는 진료과목을 유추하여 'department' 필드를 채워 넣어라. 예를 들어, '소아 아토피 피부염'이 disease라면 '피부과'나 '소아청소년과'를 department로 유추할 수 있다.**
   - **만약 질병명만 있고 진료과목 유추가 어렵다면 'department'는 null로 설정한다.**
3. '내 근처', '여기 근처' 등 사용자 자신을 기준으로 하는 단어는 'location'이 아니다. 이런 단어가 보이면 'location'은 null로 설정해라. 최신 순의 대화 흐름을 판단하여 location을 추출해야 한다. 병원정보의 해당하는 address파마리터를 절대 참고하지 말라.
4. 3번의 경우 휴먼메시지가 아닌 AI가 답변한 메시지 내에서 가령 "현재 위치 근처에서" 등의 사용자 자신을 기준으로 하는 단어는 'location'을 null로 설정해라.
5. 대화 기록에서 이미 '시/도' 정보(예: 서울)가 언급되었고, 마지막 질문에 '구/동' 정보(예: 중구)만 있다면, 이 둘을 조합하여 '서울 중구'와 같이 완전한 지역명을 'location'으로 추출해야 한다.
6. **대화의 전체 맥락을 고려하세요. 사용자의 마지막 질문에 특정 정보(예: 진료과)가 없다면, 이전 대화들에서 해당하는 가장 최신 정보를 찾아 사용해야 한다.**
7. ** 어떤 경우에도 'target'은 null이 될 수 없으며, 반드시 '의사' 또는 '병원' 중 하나를 선택해야 한다.**
   - **대화 기록을 참고하여 설정한다.
[예시]
대화 기록:
HumanMessage: 소아 아토피 피부염 전문의 추천

JSON:
{{
  "location": null,
  "disease": "소아 아토피 피부염",
  "department": ["피부과", "소아청소년과"],
  "target": "의사",
  "target_reason" : "전문의를 추천해달라고 요청을 해사"
}}

대화 기록:
HumanMessage: 기침이 심한데, 내 근처 병원 알려줘

JSON:
{{
  "location": null,
  "disease": "기침",
  "department": ["호흡기내과"],
  "target": "병원",
  "target_reason" : "근처 병원을 알려해달라고 요청을 해사"
}}

[대화 기록]
{history}

JSON 객체 형식으로만 응답하세요. 값이 없으면 null을 사용한다.
JSON:"#
    )
}

/// Targeted extraction of the most recent department mention.
pub fn department_extraction_prompt(history: &str, known_departments: &[String]) -> String {
    let known = if known_departments.is_empty() {
        String::new()
    } else {
        format!(
            "\n[Previous confirmed departments from entity_history]: {}",
            known_departments.join(", ")
        )
    };

    format!(
        r#"You are a specialized entity extractor. Your only task is to find the most recently mentioned medical department from the conversation history provided below.
Also consider the previously confirmed departments from the entity_history.

[Conversation History]
{history}
{known}

[Instructions]
1. Read the entire conversation history AND the previously confirmed departments.
2. Identify the medical department (e.g., '가정의학과', '소아과', '내과').
3. If a department is mentioned, return only the name of the most recently mentioned or confirmed department.
4. If no department is mentioned or confirmed, return the word "None".
5. Do not provide any explanation or extra text. Only return the department name or "None".

Most recent department:"#
    )
}

/// Judgment call for whether an unknown anchor noun is a domestic place name.
pub fn location_judgment_prompt(user_message: &str, anchor: &str, group_rules: &str) -> String {
    format!(
        r#"주어진 "문장"의 문맥 안에서 "단어"가 지리적 위치로 사용되었는지 판단해주세요.
대답은 JSON 형식으로 {{"is_location": true}} 또는 {{"is_location": false}} 중 하나로만 반환해주세요.
단 대한민국의 영토내의 지리적 위치만 해당이 됩니다. 너의 판단으로 외국나라이름이거나 지명일경우에는 {{"is_location": false, "is_national":true}}를 결과로 내주세요.

다음과 같은 그룹 지역명 규칙이 있습니다. 이들은 지리적 위치로 간주되어야 합니다:
{group_rules}

[예시 1]
문장: "무릅이 너무 아파요."
단어: "무릅"
대답: {{"is_location": false}}

[예시 2]
문장: "춘천에서 제일 큰 병원은 어디인가요?"
단어: "춘천"
대답: {{"is_location": true}}

[예시 3]
문장: "경상도에 있는 병원 알려줘"
단어: "경상도"
대답: {{"is_location": true}}
---
[실제 작업]
문장: "{user_message}"
단어: "{anchor}"
대답:"#
    )
}

/// Inference of plausible departments for a disease with no dictionary hit.
pub fn department_inference_prompt(disease: &str) -> String {
    format!(
        r#"'{disease}'라는 질병 또는 증상을 주로 진료하는 진료과를 추론해주세요.
반드시 JSON 형식으로만 응답하세요. 예: {{"departments": ["신경외과", "정형외과"]}}
가장 가능성이 높은 진료과를 최대 3개까지 포함하세요.
JSON:"#
    )
}

/// Structured JSON block of inherited entities, inserted into the system prompt.
pub fn inherited_entities_block(entities: &EntityMemory) -> String {
    let rendered = serde_json::to_string_pretty(entities).unwrap_or_else(|_| "{}".to_string());
    format!(
        r#"
/*
IMPORTANT: The following JSON block contains the latest confirmed entities from the conversation history.
The AI's previous message contained the following recommendations or suggestions. The user's current message might be an acceptance or follow-up on these. Prioritize the following information if the user's intent aligns with these details.
Inherited entities:
*/
{rendered}
"#
    )
}

/// GPS availability block, inserted into the system prompt.
pub fn gps_block(coordinates: &Coordinates) -> String {
    format!(
        r#"

/*
IMPORTANT: User's current GPS location is available.
Latitude: {}
Longitude: {}
Prioritize using location-based tools if the user asks for nearby facilities.
*/
"#,
        coordinates.latitude, coordinates.longitude
    )
}

/// Response language rule, inserted into the system prompt.
pub fn language_rule(locale: &str) -> String {
    format!(
        "\n\n**Response Language Rule**\n- The AI counselor's final response MUST be generated in **{}**.\n",
        language_name(locale)
    )
}
