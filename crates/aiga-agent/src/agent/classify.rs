//! Early intent classification.
//!
//! Runs on the raw user message before any model call. Emergencies and
//! refused recommendation targets answer immediately without spending
//! tokens.

use tracing::info;

/// Keywords that mark an emergency situation.
const EMERGENCY_KEYWORDS: &[&str] = &["응급실", "비상상황", "죽을거 같아"];

/// Medical categories the service refuses to recommend.
const REFUSED_MEDICAL_TYPES: &[&str] = &["치과", "한의원", "한의사", "한방병원"];

/// Stems that mark a recommendation or comparison request.
const RECOMMENDATION_HINTS: &[&str] = &[
    "추천", "좋", "잘하", "잘 하", "유명", "괜찮", "어디", "어떻", "어때", "비교", "순위",
    "랭킹", "최고", "전문",
];

/// Keywords of a "where am I" question.
const CURRENT_LOCATION_KEYWORDS: &[&str] = &["내", "현재", "위치", "어디", "어디야", "있"];

/// Keywords that mark a search query rather than a position question.
const LOCATION_QUERY_EXCLUDE_KEYWORDS: &[&str] = &["병원", "의사", "찾", "가깝"];

/// What kind of request a user message is, checked in priority order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Emergency situation, answer with the 119 guidance.
    Emergency,
    /// Recommendation request for a category the service refuses.
    ForbiddenRecommendation { term: String },
    /// Question about the user's own current position.
    CurrentLocation,
    /// Everything else goes through the model.
    General,
}

/// Pluggable message classifier.
pub trait QueryClassifier: Send + Sync {
    fn classify(&self, text: &str) -> Intent;
}

/// Keyword-based classifier.
///
/// The current-location branch ships disabled; position questions read
/// better when the model answers them with full context.
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    pub detect_current_location: bool,
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self {
            detect_current_location: false,
        }
    }
}

impl KeywordClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    fn is_emergency(text: &str) -> bool {
        EMERGENCY_KEYWORDS.iter().any(|kw| text.contains(kw))
    }

    fn forbidden_term(text: &str) -> Option<String> {
        let term = REFUSED_MEDICAL_TYPES.iter().find(|term| text.contains(*term))?;
        let has_hint = RECOMMENDATION_HINTS.iter().any(|hint| text.contains(hint));
        has_hint.then(|| (*term).to_string())
    }

    fn is_current_location_query(text: &str) -> bool {
        if LOCATION_QUERY_EXCLUDE_KEYWORDS.iter().any(|kw| text.contains(kw)) {
            return false;
        }
        let hits = CURRENT_LOCATION_KEYWORDS
            .iter()
            .filter(|kw| text.contains(*kw))
            .count();
        hits >= 2
    }
}

impl QueryClassifier for KeywordClassifier {
    fn classify(&self, text: &str) -> Intent {
        if Self::is_emergency(text) {
            info!("Emergency keywords detected");
            return Intent::Emergency;
        }
        if let Some(term) = Self::forbidden_term(text) {
            info!(term = %term, "Refused recommendation target detected");
            return Intent::ForbiddenRecommendation { term };
        }
        if self.detect_current_location && Self::is_current_location_query(text) {
            info!("Current-location question detected");
            return Intent::CurrentLocation;
        }
        Intent::General
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emergency_keyword_wins() {
        let classifier = KeywordClassifier::new();
        assert_eq!(
            classifier.classify("지금 응급실 가야할 것 같아요"),
            Intent::Emergency
        );
    }

    #[test]
    fn forbidden_term_needs_recommendation_hint() {
        let classifier = KeywordClassifier::new();
        assert_eq!(
            classifier.classify("잘하는 치과 추천해줘"),
            Intent::ForbiddenRecommendation {
                term: "치과".to_string()
            }
        );
        // A bare mention without a recommendation nuance passes through.
        assert_eq!(classifier.classify("치과 진료 기록 보관 기간은?"), Intent::General);
    }

    #[test]
    fn current_location_disabled_by_default() {
        let classifier = KeywordClassifier::new();
        assert_eq!(classifier.classify("내가 지금 어디 있지?"), Intent::General);
    }

    #[test]
    fn current_location_detected_when_enabled() {
        let classifier = KeywordClassifier {
            detect_current_location: true,
        };
        assert_eq!(
            classifier.classify("내가 지금 어디 있지?"),
            Intent::CurrentLocation
        );
        // Search keywords exclude the position question.
        assert_eq!(
            classifier.classify("여기 근처 병원 어디 있어?"),
            Intent::General
        );
    }

    #[test]
    fn general_question_falls_through() {
        let classifier = KeywordClassifier::new();
        assert_eq!(classifier.classify("감기에 좋은 음식이 뭐야?"), Intent::General);
    }
}
