//! Location context tracking.
//!
//! Every user message is scanned for place references before the model runs.
//! Resolved and pending entries accumulate in the session's location history,
//! newest last. Ambiguous region names produce a clarifying question that
//! short-circuits the turn until the user answers.

use crate::agent::prompts;
use crate::error::Result;
use crate::llm::LlmClient;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Administrative regions, (official name, short name).
pub const SIDO_RULES: &[(&str, &str)] = &[
    ("서울특별시", "서울"),
    ("부산광역시", "부산"),
    ("대구광역시", "대구"),
    ("인천광역시", "인천"),
    ("광주광역시", "광주"),
    ("대전광역시", "대전"),
    ("울산광역시", "울산"),
    ("세종특별자치시", "세종"),
    ("경기도", "경기"),
    ("강원특별자치도", "강원"),
    ("충청북도", "충북"),
    ("충청남도", "충남"),
    ("전북특별자치도", "전북"),
    ("전라남도", "전남"),
    ("경상북도", "경북"),
    ("경상남도", "경남"),
    ("제주특별자치도", "제주"),
];

/// Colloquial region groups, (group name, expansion text).
pub const GROUP_EXPANSION_RULES: &[(&str, &str)] = &[
    ("수도권", "(서울 또는 경기 또는 인천)"),
    ("충청도", "(충북 또는 충남 또는 대전 또는 세종)"),
    ("전라도", "(전북 또는 전남 또는 광주)"),
    ("경상도", "(경북 또는 경남 또는 부산 또는 대구 또는 울산)"),
    ("부울경", "(부산 또는 울산 또는 경남)"),
];

/// District names shared by several metropolitan regions, with the options
/// offered back to the user.
pub const AMBIGUOUS_REGION_RULES: &[(&str, &str)] = &[
    ("광주", "광주광역시, 경기도 광주시"),
    ("중구", "서울 중구, 부산 중구, 대구 중구, 인천 중구, 대전 중구, 울산 중구"),
    ("동구", "부산 동구, 대구 동구, 인천 동구, 광주 동구, 대전 동구, 울산 동구"),
    ("서구", "부산 서구, 대구 서구, 인천 서구, 광주 서구, 대전 서구"),
    ("남구", "부산 남구, 대구 남구, 인천 남구, 광주 남구, 울산 남구"),
    ("북구", "부산 북구, 대구 북구, 광주 북구, 울산 북구"),
    ("고성", "강원 고성군, 경남 고성군"),
];

/// Stems that signal a proximity search. Matched as substrings except for
/// single-syllable entries.
const PROXIMITY_SUBSTRINGS: &[&str] = &["근처", "주변", "인근", "부근", "근방", "가까"];
const PROXIMITY_TOKENS: &[&str] = &["옆"];

/// Words the user uses for themselves or their own position.
const USER_PROXY_NOUNS: &[&str] = &["나", "내", "저", "저의", "여기"];

/// Job titles that follow a person's name.
const TITLE_NOUNS: &[&str] = &["교수", "의사", "원장", "선생", "박사"];

/// Nouns that take a locative particle without naming a place.
const NON_PLACE_NOUNS: &[&str] = &[
    "병원", "의원", "아침", "저녁", "오전", "오후", "오늘", "내일", "어제", "시간", "어디",
    "거기", "그곳",
];

/// Trailing particles stripped during tokenization, longest first.
const PARTICLES: &[&str] = &[
    "에서는", "에서도", "으로는", "에서", "에는", "에도", "이랑", "이요", "부터", "까지", "으로",
    "라도", "에", "은", "는", "이", "가", "을", "를", "의", "도", "와", "과", "로", "랑", "야",
    "요",
];

static HOSPITAL_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[가-힣]{2,}(?:대학교|대학|대)?병원").unwrap_or_else(|e| {
        panic!("invalid hospital name pattern: {e}");
    })
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocationStatus {
    Resolved,
    Pending,
}

/// One entry in the session's location history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LocationEntry {
    Gps {
        latitude: f64,
        longitude: f64,
    },
    Named {
        sido: Option<String>,
        sigungu: Option<String>,
        status: LocationStatus,
        is_nearby: bool,
    },
}

/// Result of scanning one user message for location intent.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationQuery {
    /// Search anchored on the user's own position.
    UserLocation,
    /// Search anchored on a named place.
    Named { anchor: String, is_nearby: bool },
    /// No location intent found.
    None,
}

/// Flag summary of top-level region mentions in a message.
#[derive(Debug, Clone, Default)]
pub struct LocationFlag {
    pub has_location: bool,
    pub term: Option<String>,
}

fn is_hangul(ch: char) -> bool {
    ('가'..='힣').contains(&ch)
}

fn char_count(s: &str) -> usize {
    s.chars().count()
}

pub(crate) fn strip_trailing_punct(token: &str) -> &str {
    token.trim_end_matches(['?', '!', '.', ',', '~'])
}

/// Strip one trailing particle if the remainder keeps at least two syllables.
pub(crate) fn strip_particle(token: &str) -> &str {
    for particle in PARTICLES {
        if let Some(stem) = token.strip_suffix(particle) {
            if char_count(stem) >= 2 && stem.chars().all(is_hangul) {
                return stem;
            }
        }
    }
    token
}

fn is_known_region(token: &str) -> bool {
    SIDO_RULES
        .iter()
        .any(|(long, short)| token == *long || token == *short)
        || GROUP_EXPANSION_RULES.iter().any(|(name, _)| token == *name)
        || AMBIGUOUS_REGION_RULES.iter().any(|(name, _)| token == *name)
}

/// Official name of the region when the token is a si/do name.
pub fn sido_long_form(token: &str) -> Option<&'static str> {
    SIDO_RULES
        .iter()
        .find(|(long, short)| token == *long || token == *short)
        .map(|(long, _)| *long)
}

/// Short name of the region when the token is a si/do name.
pub fn sido_short_form(token: &str) -> Option<&'static str> {
    SIDO_RULES
        .iter()
        .find(|(long, short)| token == *long || token == *short)
        .map(|(_, short)| *short)
}

/// First si/do mentioned anywhere in the message, as its official name.
fn sido_in_message(message: &str) -> Option<&'static str> {
    SIDO_RULES
        .iter()
        .find(|(long, short)| message.contains(long) || message.contains(short))
        .map(|(long, _)| *long)
}

/// First si/do in the message other than the anchor itself.
fn sido_in_message_besides(message: &str, anchor: &str) -> Option<&'static str> {
    let anchor_long = sido_long_form(anchor);
    SIDO_RULES
        .iter()
        .filter(|(long, _)| Some(*long) != anchor_long)
        .find(|(long, short)| message.contains(long) || message.contains(short))
        .map(|(long, _)| *long)
}

/// Member regions of a colloquial group name.
pub fn expand_group_location(name: &str) -> Option<Vec<&'static str>> {
    GROUP_EXPANSION_RULES
        .iter()
        .find(|(group, _)| name == *group)
        .map(|(_, expansion)| {
            expansion
                .split("또는")
                .map(|part| part.trim_matches(['(', ')', ' ']))
                .filter(|part| !part.is_empty())
                .collect()
        })
}

fn ambiguous_options(anchor: &str) -> Option<&'static str> {
    AMBIGUOUS_REGION_RULES
        .iter()
        .find(|(name, _)| anchor == *name)
        .map(|(_, options)| *options)
}

/// Classify one user message into a location query type.
///
/// Anchor detection works on whitespace tokens with particle stripping.
/// A token qualifies when it matches the region dictionaries, carries an
/// administrative suffix, or carried a locative particle. The last
/// qualifying token wins. A bare region name with no other content token
/// is treated as an answer rather than a query.
pub fn classify_location_query(message: &str) -> LocationQuery {
    let raw_tokens: Vec<&str> = message
        .split_whitespace()
        .map(strip_trailing_punct)
        .filter(|t| !t.is_empty())
        .collect();

    let mut has_proximity = PROXIMITY_SUBSTRINGS.iter().any(|stem| message.contains(stem));
    let mut has_user_proxy = false;
    let mut content_tokens = 0usize;
    let mut anchor: Option<String> = None;

    for (i, raw) in raw_tokens.iter().enumerate() {
        let stripped = strip_particle(raw);
        if stripped.chars().any(is_hangul) {
            content_tokens += 1;
        }
        if PROXIMITY_TOKENS.contains(&stripped) {
            has_proximity = true;
        }
        if USER_PROXY_NOUNS.contains(&stripped) {
            has_user_proxy = true;
            continue;
        }

        let candidate = candidate_place(raw, stripped);
        let Some(candidate) = candidate else {
            continue;
        };
        // A title noun right after the candidate marks a person's name.
        if let Some(next) = raw_tokens.get(i + 1) {
            let next = strip_particle(next);
            if TITLE_NOUNS.iter().any(|title| next.starts_with(title)) {
                continue;
            }
        }
        anchor = Some(candidate.to_string());
    }

    if let Some(anchor) = anchor {
        // Lone region names ("경상남도야") are answers, not queries.
        if content_tokens > 1 {
            debug!(anchor = %anchor, is_nearby = has_proximity, "Named location query");
            return LocationQuery::Named {
                anchor,
                is_nearby: has_proximity,
            };
        }
        if has_proximity && has_user_proxy {
            return LocationQuery::UserLocation;
        }
        return LocationQuery::None;
    }

    if has_proximity {
        debug!("User-anchored proximity query");
        return LocationQuery::UserLocation;
    }

    LocationQuery::None
}

/// Decide whether a token names a place.
fn candidate_place<'a>(raw: &'a str, stripped: &'a str) -> Option<&'a str> {
    // Particle stripping clips names like "경상남도", so try the raw token.
    if char_count(raw) >= 2 && raw.chars().all(is_hangul) && is_known_region(raw) {
        return Some(raw);
    }
    if !stripped.chars().all(is_hangul) || char_count(stripped) < 2 {
        return None;
    }
    if is_known_region(stripped) {
        return Some(stripped);
    }
    let last = stripped.chars().last()?;
    if matches!(last, '시' | '군' | '구' | '동' | '읍' | '면') && char_count(stripped) >= 3 {
        return Some(stripped);
    }
    // Locative particle on an unknown noun is a place signal.
    let carried_locative = raw != stripped
        && (raw.ends_with("에서") || raw.strip_suffix('에').is_some_and(|s| s == stripped));
    if carried_locative
        && !NON_PLACE_NOUNS.contains(&stripped)
        && !PROXIMITY_SUBSTRINGS.iter().any(|stem| stripped.contains(stem))
    {
        return Some(stripped);
    }
    None
}

/// Strip the generic administrative suffix from a three-syllable-plus anchor.
/// Dictionary names ("부산광역시") keep their suffix.
fn normalize_anchor(anchor: &str) -> String {
    if char_count(anchor) > 2 && !is_known_region(anchor) {
        if let Some(last) = anchor.chars().last() {
            if matches!(last, '시' | '군' | '구') {
                let mut chars = anchor.chars();
                chars.next_back();
                return chars.as_str().to_string();
            }
        }
    }
    anchor.to_string()
}

/// Update the location history from one user message.
///
/// Returns the new history and, when an ambiguous place needs the user's
/// help, the clarifying question to ask instead of running the turn.
pub async fn update_location_context(
    llm: &dyn LlmClient,
    user_message: &str,
    history: &[LocationEntry],
    coordinates: Option<(f64, f64)>,
) -> Result<(Vec<LocationEntry>, Option<String>)> {
    // Hospital names embed region words, so those queries keep the context.
    if HOSPITAL_NAME_RE.is_match(user_message) {
        info!("Hospital name in message, location context unchanged");
        return Ok((history.to_vec(), None));
    }

    match classify_location_query(user_message) {
        LocationQuery::UserLocation => {
            let Some((latitude, longitude)) = coordinates else {
                return Ok((history.to_vec(), None));
            };
            let entry = LocationEntry::Gps {
                latitude,
                longitude,
            };
            if history.last() == Some(&entry) {
                return Ok((history.to_vec(), None));
            }
            info!("Appending GPS location entry");
            let mut updated = history.to_vec();
            updated.push(entry);
            Ok((updated, None))
        }
        LocationQuery::Named { anchor, is_nearby } => {
            named_location_update(llm, user_message, history, &anchor, is_nearby).await
        }
        LocationQuery::None => Ok(resolve_pending(user_message, history)),
    }
}

async fn named_location_update(
    llm: &dyn LlmClient,
    user_message: &str,
    history: &[LocationEntry],
    anchor: &str,
    is_nearby: bool,
) -> Result<(Vec<LocationEntry>, Option<String>)> {
    let anchor = normalize_anchor(anchor);

    // Re-mentioned resolved places are promoted to the newest entry.
    let already_resolved = history.iter().rev().any(|entry| {
        matches!(
            entry,
            LocationEntry::Named { sido, sigungu, status: LocationStatus::Resolved, .. }
                if sido.as_deref() == Some(anchor.as_str())
                    || sigungu.as_deref() == Some(anchor.as_str())
        )
    });
    if already_resolved {
        let resolved_sido = history.iter().rev().find_map(|entry| match entry {
            LocationEntry::Named {
                sido,
                sigungu: Some(sigungu),
                status: LocationStatus::Resolved,
                ..
            } if sigungu.contains(anchor.as_str()) => sido.clone(),
            _ => None,
        });
        info!(anchor = %anchor, "Known place re-mentioned, refreshing location context");
        let mut updated = history.to_vec();
        updated.push(LocationEntry::Named {
            sido: resolved_sido,
            sigungu: Some(anchor),
            status: LocationStatus::Resolved,
            is_nearby,
        });
        return Ok((updated, None));
    }

    // "강원도 춘천" style messages carry their own si/do.
    if let Some(sido) = sido_in_message_besides(user_message, &anchor) {
        let entry = LocationEntry::Named {
            sido: Some(sido.to_string()),
            sigungu: Some(anchor.clone()),
            status: LocationStatus::Resolved,
            is_nearby,
        };
        if history.last() == Some(&entry) {
            return Ok((history.to_vec(), None));
        }
        info!(sido = %sido, sigungu = %anchor, "Si/do found alongside anchor, resolving directly");
        let mut updated = history.to_vec();
        updated.push(entry);
        return Ok((updated, None));
    }

    // Ambiguous names need the user to pick a region.
    if let Some(options) = ambiguous_options(&anchor) {
        info!(anchor = %anchor, "Ambiguous place, asking for clarification");
        let question = prompts::ambiguous_location_question(&anchor, options);
        let mut updated = history.to_vec();
        updated.push(LocationEntry::Named {
            sido: None,
            sigungu: Some(anchor),
            status: LocationStatus::Pending,
            is_nearby,
        });
        return Ok((updated, Some(question)));
    }

    // Si/do level mention resolves immediately.
    if let Some(long) = sido_long_form(&anchor) {
        let entry = LocationEntry::Named {
            sido: Some(long.to_string()),
            sigungu: None,
            status: LocationStatus::Resolved,
            is_nearby,
        };
        if history.last() == Some(&entry) {
            return Ok((history.to_vec(), None));
        }
        info!(sido = %long, "Si/do level location resolved");
        let mut updated = history.to_vec();
        updated.push(entry);
        return Ok((updated, None));
    }

    // Group names resolve as-is and expand at query time.
    if GROUP_EXPANSION_RULES.iter().any(|(name, _)| anchor == *name) {
        let entry = LocationEntry::Named {
            sido: Some(anchor.clone()),
            sigungu: None,
            status: LocationStatus::Resolved,
            is_nearby,
        };
        if history.last() == Some(&entry) {
            return Ok((history.to_vec(), None));
        }
        info!(group = %anchor, "Group region resolved");
        let mut updated = history.to_vec();
        updated.push(entry);
        return Ok((updated, None));
    }

    // Unknown anchor, let the model judge whether it is a domestic place.
    let group_rules = GROUP_EXPANSION_RULES
        .iter()
        .map(|(name, expansion)| format!("- {name}: {expansion}"))
        .collect::<Vec<_>>()
        .join("\n");
    let prompt = prompts::location_judgment_prompt(user_message, &anchor, &group_rules);
    match llm.classify_json(&prompt).await {
        Ok(judgment) => {
            let is_location = judgment
                .get("is_location")
                .and_then(|v| v.as_bool())
                .unwrap_or(false);
            let is_national = judgment
                .get("is_national")
                .and_then(|v| v.as_bool())
                .unwrap_or(false);
            if is_national {
                info!(anchor = %anchor, "Judged as a foreign place, skipping");
                return Ok((history.to_vec(), None));
            }
            if is_location {
                info!(anchor = %anchor, "Judged as a domestic place, asking for si/do");
                let question = prompts::unknown_location_question(&anchor);
                let mut updated = history.to_vec();
                updated.push(LocationEntry::Named {
                    sido: None,
                    sigungu: Some(anchor),
                    status: LocationStatus::Pending,
                    is_nearby,
                });
                return Ok((updated, Some(question)));
            }
            Ok((history.to_vec(), None))
        }
        Err(e) => {
            warn!(error = %e, anchor = %anchor, "Location judgment failed, keeping context");
            Ok((history.to_vec(), None))
        }
    }
}

/// Resolve the newest pending entry in place when the message names a si/do.
/// Other pending entries are dropped.
fn resolve_pending(
    user_message: &str,
    history: &[LocationEntry],
) -> (Vec<LocationEntry>, Option<String>) {
    let pending_index = history.iter().enumerate().rev().find_map(|(i, entry)| {
        matches!(
            entry,
            LocationEntry::Named {
                status: LocationStatus::Pending,
                ..
            }
        )
        .then_some(i)
    });
    let Some(pending_index) = pending_index else {
        return (history.to_vec(), None);
    };
    let Some(sido) = sido_in_message(user_message) else {
        return (history.to_vec(), None);
    };

    info!(sido = %sido, "Clarification answer received, resolving pending location");
    let updated: Vec<LocationEntry> = history
        .iter()
        .enumerate()
        .filter_map(|(i, entry)| {
            if i == pending_index {
                if let LocationEntry::Named {
                    sigungu, is_nearby, ..
                } = entry
                {
                    return Some(LocationEntry::Named {
                        sido: Some(sido.to_string()),
                        sigungu: sigungu.clone(),
                        status: LocationStatus::Resolved,
                        is_nearby: *is_nearby,
                    });
                }
            }
            match entry {
                LocationEntry::Named {
                    status: LocationStatus::Pending,
                    ..
                } => None,
                other => Some(other.clone()),
            }
        })
        .collect();
    (updated, None)
}

/// Check whether a message names a top-level region or group.
pub fn check_location_info(message: &str) -> LocationFlag {
    let mut found: Vec<&str> = SIDO_RULES
        .iter()
        .flat_map(|(long, short)| [*long, *short])
        .chain(GROUP_EXPANSION_RULES.iter().map(|(name, _)| *name))
        .filter(|region| message.contains(region))
        .collect();
    found.sort_by_key(|region| std::cmp::Reverse(region.len()));

    match found.first() {
        Some(term) => LocationFlag {
            has_location: true,
            term: Some((*term).to_string()),
        },
        None => LocationFlag::default(),
    }
}

/// Newest resolved location rendered as a query string ("시/도 시/군/구").
pub fn resolved_location_string(history: &[LocationEntry]) -> Option<String> {
    history.iter().rev().find_map(|entry| match entry {
        LocationEntry::Named {
            sido,
            sigungu,
            status: LocationStatus::Resolved,
            ..
        } => {
            let parts: Vec<&str> = [sido.as_deref(), sigungu.as_deref()]
                .into_iter()
                .flatten()
                .collect();
            (!parts.is_empty()).then(|| parts.join(" "))
        }
        _ => None,
    })
}

/// Whether the newest location signal asks for a proximity search.
pub fn proximity_from_history(history: &[LocationEntry]) -> bool {
    history
        .iter()
        .rev()
        .find_map(|entry| match entry {
            LocationEntry::Gps { .. } => Some(true),
            LocationEntry::Named {
                status: LocationStatus::Resolved,
                is_nearby,
                ..
            } => Some(*is_nearby),
            _ => None,
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{MockLlmClient, MockStep};

    #[test]
    fn named_query_with_intent_indicator() {
        let query = classify_location_query("부산에 있는 병원 알려줘");
        assert_eq!(
            query,
            LocationQuery::Named {
                anchor: "부산".to_string(),
                is_nearby: false
            }
        );
    }

    #[test]
    fn bare_region_name_is_not_a_query() {
        assert_eq!(classify_location_query("경상남도"), LocationQuery::None);
    }

    #[test]
    fn full_province_name_survives_particle_stripping() {
        let query = classify_location_query("경상남도 병원 추천해줘");
        assert_eq!(
            query,
            LocationQuery::Named {
                anchor: "경상남도".to_string(),
                is_nearby: false
            }
        );
    }

    #[test]
    fn proximity_with_user_proxy_is_user_location() {
        assert_eq!(
            classify_location_query("내 근처 병원 찾아줘"),
            LocationQuery::UserLocation
        );
    }

    #[test]
    fn implicit_proximity_is_user_location() {
        assert_eq!(
            classify_location_query("가까운 병원 알려줘"),
            LocationQuery::UserLocation
        );
    }

    #[test]
    fn nearby_flag_set_on_named_query() {
        let query = classify_location_query("춘천시 근처 정형외과 추천해줘");
        assert_eq!(
            query,
            LocationQuery::Named {
                anchor: "춘천시".to_string(),
                is_nearby: true
            }
        );
    }

    #[tokio::test]
    async fn hospital_name_skips_location_update() {
        let llm = MockLlmClient::new();
        let history = vec![];
        let (updated, question) =
            update_location_context(&llm, "서울대병원 김철수 교수 어때?", &history, None)
                .await
                .unwrap();
        assert!(updated.is_empty());
        assert!(question.is_none());
    }

    #[tokio::test]
    async fn gps_entry_appended_once() {
        let llm = MockLlmClient::new();
        let (first, _) =
            update_location_context(&llm, "내 근처 병원 알려줘", &[], Some((37.5, 127.0)))
                .await
                .unwrap();
        assert_eq!(first.len(), 1);
        let (second, _) =
            update_location_context(&llm, "내 근처 병원 알려줘", &first, Some((37.5, 127.0)))
                .await
                .unwrap();
        assert_eq!(second.len(), 1);
    }

    #[tokio::test]
    async fn sido_resolves_directly() {
        let llm = MockLlmClient::new();
        let (updated, question) =
            update_location_context(&llm, "부산에 좋은 병원 있어?", &[], None)
                .await
                .unwrap();
        assert!(question.is_none());
        assert_eq!(
            updated,
            vec![LocationEntry::Named {
                sido: Some("부산광역시".to_string()),
                sigungu: None,
                status: LocationStatus::Resolved,
                is_nearby: false,
            }]
        );
    }

    #[tokio::test]
    async fn ambiguous_district_asks_and_then_resolves() {
        let llm = MockLlmClient::new();
        let (updated, question) =
            update_location_context(&llm, "중구에 내과 찾아줘", &[], None)
                .await
                .unwrap();
        let question = question.expect("clarification expected");
        assert!(question.contains("'중구'"));
        assert!(matches!(
            updated.last(),
            Some(LocationEntry::Named {
                status: LocationStatus::Pending,
                ..
            })
        ));

        let (resolved, question) = update_location_context(&llm, "서울이요", &updated, None)
            .await
            .unwrap();
        assert!(question.is_none());
        assert_eq!(
            resolved.last(),
            Some(&LocationEntry::Named {
                sido: Some("서울특별시".to_string()),
                sigungu: Some("중구".to_string()),
                status: LocationStatus::Resolved,
                is_nearby: false,
            })
        );
    }

    #[tokio::test]
    async fn unknown_place_judged_by_model() {
        let llm = MockLlmClient::from_steps(vec![MockStep::text(r#"{"is_location": true}"#)]);
        let (updated, question) =
            update_location_context(&llm, "춘천에서 제일 큰 병원은 어디인가요?", &[], None)
                .await
                .unwrap();
        assert!(question.expect("si/do question expected").contains("'춘천'"));
        assert!(matches!(
            updated.last(),
            Some(LocationEntry::Named {
                status: LocationStatus::Pending,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn foreign_place_leaves_context_unchanged() {
        let llm = MockLlmClient::from_steps(vec![MockStep::text(
            r#"{"is_location": false, "is_national": true}"#,
        )]);
        let (updated, question) =
            update_location_context(&llm, "파리에서 유명한 병원 알려줘", &[], None)
                .await
                .unwrap();
        assert!(updated.is_empty());
        assert!(question.is_none());
    }

    #[test]
    fn group_expansion_splits_members() {
        assert_eq!(
            expand_group_location("부울경"),
            Some(vec!["부산", "울산", "경남"])
        );
        assert_eq!(expand_group_location("서울"), None);
    }

    #[test]
    fn location_flag_prefers_longest_match() {
        let flag = check_location_info("울산에서 진료 잘 보는 곳");
        assert!(flag.has_location);
        assert_eq!(flag.term.as_deref(), Some("울산"));
        assert!(!check_location_info("무릎이 아파요").has_location);
    }

    #[test]
    fn proximity_follows_newest_signal() {
        let history = vec![
            LocationEntry::Named {
                sido: Some("서울특별시".to_string()),
                sigungu: None,
                status: LocationStatus::Resolved,
                is_nearby: false,
            },
            LocationEntry::Gps {
                latitude: 37.5,
                longitude: 127.0,
            },
        ];
        assert!(proximity_from_history(&history));
        assert!(!proximity_from_history(&history[..1]));
    }

    #[test]
    fn resolved_string_joins_sido_and_sigungu() {
        let history = vec![LocationEntry::Named {
            sido: Some("강원특별자치도".to_string()),
            sigungu: Some("춘천".to_string()),
            status: LocationStatus::Resolved,
            is_nearby: false,
        }];
        assert_eq!(
            resolved_location_string(&history).as_deref(),
            Some("강원특별자치도 춘천")
        );
    }
}
