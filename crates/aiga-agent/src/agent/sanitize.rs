//! Prompt sanitization for content-filter retries.
//!
//! When the completion service rejects a request on policy grounds, the last
//! human message is rewritten once and the request retried. Two stages: a
//! term-level rewrite that swaps graphic symptom phrasing for clinical
//! vocabulary, and, for sensitive queries, a reduction to content words so
//! the retry carries as little trigger surface as possible.

use crate::agent::location::{strip_particle, strip_trailing_punct};
use tracing::info;

/// Graphic phrasing replaced with clinical equivalents before any retry.
const MEDICAL_REWRITE: &[(&str, &str)] = &[
    ("피가 나", "출혈이 있"),
    ("피를 토", "토혈 증상이 있"),
    ("피 토", "토혈 증상이 있"),
    ("숨이 막", "호흡곤란이 있"),
    ("숨을 못 쉬", "호흡곤란이 있"),
    ("살이 썩", "괴사 증상이 있"),
    ("곪았", "화농 증상이 있"),
    ("찢어졌", "열상을 입었"),
    ("터졌", "파열 증상이 있"),
];

/// Preserved verbatim during reduction so location intent survives the retry.
const LOCATION_KEYWORDS: &[&str] = &[
    "근처", "주변", "가깝다", "인근", "부근", "근방", "옆", "가까이", "가까운데", "여기",
];

/// Symptom stems and their frequent conjugations.
const SYMPTOM_HINTS: &[&str] = &[
    "아프", "아파", "아픈", "저리", "저려", "쑤시", "쑤셔", "결리", "결려", "따갑", "따가워",
    "쓰리", "쓰려", "가렵", "가려워", "붓", "부었", "부어", "토하", "토했", "답답", "어지럽",
    "어지러", "메스껍", "메스꺼", "울렁", "더부룩",
];

/// Rewrites a human message so a content-filter retry can go through.
pub trait Sanitizer: Send + Sync {
    fn sanitize(&self, text: &str) -> String;
}

/// Keyword-driven sanitizer. No morphological analysis; symptom detection
/// and particle stripping work on surface forms.
#[derive(Debug, Default, Clone)]
pub struct KeywordSanitizer;

impl KeywordSanitizer {
    fn is_sensitive(text: &str) -> bool {
        SYMPTOM_HINTS.iter().any(|stem| text.contains(stem))
            || MEDICAL_REWRITE.iter().any(|(old, _)| text.contains(old))
    }

    fn apply_rewrite(text: &str) -> String {
        let mut rewritten = text.to_string();
        for (old, new) in MEDICAL_REWRITE {
            rewritten = rewritten.replace(old, new);
        }
        rewritten
    }

    /// Reduce to content words: strip punctuation and one trailing particle
    /// per token, keep location keywords as-is. An empty result falls back
    /// to the rewritten text so the retry never sends a blank message.
    fn reduce(text: &str) -> String {
        let kept: Vec<&str> = text
            .split_whitespace()
            .map(|token| {
                let token = strip_trailing_punct(token);
                if LOCATION_KEYWORDS.iter().any(|kw| token.contains(kw)) {
                    token
                } else {
                    strip_particle(token)
                }
            })
            .filter(|token| !token.is_empty())
            .collect();

        if kept.is_empty() {
            return text.to_string();
        }
        kept.join(" ")
    }
}

impl Sanitizer for KeywordSanitizer {
    fn sanitize(&self, text: &str) -> String {
        let sensitive = Self::is_sensitive(text);
        let rewritten = Self::apply_rewrite(text);

        let result = if sensitive {
            Self::reduce(&rewritten)
        } else {
            rewritten.clone()
        };
        info!(
            original = %text,
            rewritten = %rewritten,
            result = %result,
            "Sanitized prompt for retry"
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graphic_phrasing_gets_clinical_rewrite() {
        let sanitizer = KeywordSanitizer;
        let result = sanitizer.sanitize("기침할 때마다 피가 나요");
        assert!(result.contains("출혈"));
        assert!(!result.contains("피가 나"));
    }

    #[test]
    fn symptom_queries_are_reduced_to_content_words() {
        let sanitizer = KeywordSanitizer;
        let result = sanitizer.sanitize("어제부터 배가 너무 아파서 근처에 병원을 가려고요");
        assert!(result.contains("근처에"));
        assert!(result.contains("병원"));
        assert!(!result.ends_with("가려고요"));
    }

    #[test]
    fn neutral_text_passes_through_unchanged() {
        let sanitizer = KeywordSanitizer;
        let text = "서울대병원 진료 시간 알려줘";
        assert_eq!(sanitizer.sanitize(text), text);
    }

    #[test]
    fn reduction_never_returns_empty() {
        assert_eq!(KeywordSanitizer::reduce("?!"), "?!");
    }
}
