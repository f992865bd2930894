//! Fixed domain dictionaries: disease standardization, disease to
//! department rules, and hospital name alias expansion.

use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet, VecDeque};

/// Canonical disease names with the colloquial variants that map onto them.
static STANDARD_DISEASE_RULES: &[(&str, &[&str])] = &[
    ("허리디스크", &["디스크", "허리 디스크", "요추 추간판 탈출증", "추간판탈출증"]),
    ("목디스크", &["목 디스크", "경추 추간판 탈출증"]),
    ("척추관협착증", &["척추협착증", "척추관 협착증"]),
    ("협심증", &["가슴조임증"]),
    ("심근경색", &["심근경색증", "급성심근경색"]),
    ("부정맥", &["심방세동"]),
    ("녹내장", &[]),
    ("백내장", &[]),
    ("각막질환", &["각막염", "각막 질환"]),
    ("황반변성", &["황반 변성"]),
    ("위암", &["위선암"]),
    ("대장암", &["결장암", "직장암"]),
    ("간암", &["간세포암"]),
    ("폐암", &["폐선암"]),
    ("유방암", &[]),
    ("갑상선암", &["갑상선 암"]),
    ("고혈압", &["본태성 고혈압"]),
    ("당뇨병", &["당뇨", "제2형 당뇨병", "2형 당뇨"]),
    ("갑상선기능항진증", &["갑상선 항진증", "갑상선항진증"]),
    ("아토피 피부염", &["아토피", "아토피피부염", "아토피 질환"]),
    ("건선", &[]),
    ("알레르기 비염", &["비염", "알레르기성 비염"]),
    ("천식", &["기관지 천식"]),
    ("역류성 식도염", &["위식도 역류질환", "역류성식도염"]),
    ("과민성 대장증후군", &["과민성대장증후군"]),
    ("우울증", &["우울장애", "주요우울장애"]),
    ("공황장애", &["공황 장애"]),
    ("뇌졸중", &["뇌경색", "중풍"]),
    ("파킨슨병", &["파킨슨"]),
    ("치매", &["알츠하이머", "알츠하이머병"]),
];

/// Departments known to treat each disease, most specific first.
static DISEASE_DEPARTMENT_RULES: &[(&str, &[&str])] = &[
    ("허리디스크", &["신경외과", "정형외과"]),
    ("목디스크", &["신경외과", "정형외과"]),
    ("척추관협착증", &["신경외과", "정형외과"]),
    ("협심증", &["순환기내과", "흉부외과"]),
    ("심근경색", &["순환기내과", "흉부외과"]),
    ("부정맥", &["순환기내과"]),
    ("녹내장", &["안과"]),
    ("백내장", &["안과"]),
    ("각막질환", &["안과"]),
    ("황반변성", &["안과"]),
    ("위암", &["소화기내과", "외과"]),
    ("대장암", &["소화기내과", "외과"]),
    ("간암", &["소화기내과", "외과"]),
    ("폐암", &["호흡기내과", "흉부외과"]),
    ("유방암", &["외과"]),
    ("갑상선암", &["내분비내과", "외과"]),
    ("고혈압", &["순환기내과", "가정의학과"]),
    ("당뇨병", &["내분비내과", "가정의학과"]),
    ("갑상선기능항진증", &["내분비내과"]),
    ("아토피 피부염", &["피부과", "소아청소년과"]),
    ("건선", &["피부과"]),
    ("알레르기 비염", &["이비인후과"]),
    ("천식", &["호흡기내과", "알레르기내과"]),
    ("역류성 식도염", &["소화기내과"]),
    ("과민성 대장증후군", &["소화기내과"]),
    ("우울증", &["정신건강의학과"]),
    ("공황장애", &["정신건강의학과"]),
    ("뇌졸중", &["신경과", "신경외과"]),
    ("파킨슨병", &["신경과"]),
    ("치매", &["신경과", "정신건강의학과"]),
];

static STANDARD_INDEX: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut index = HashMap::new();
    for (standard, aliases) in STANDARD_DISEASE_RULES {
        index.insert(*standard, *standard);
        for alias in *aliases {
            index.insert(*alias, *standard);
        }
    }
    index
});

static DEPARTMENT_INDEX: Lazy<HashMap<&'static str, &'static [&'static str]>> =
    Lazy::new(|| DISEASE_DEPARTMENT_RULES.iter().copied().collect());

/// Standard form of a disease name, when an alias rule covers it.
pub fn standard_disease(name: &str) -> Option<&'static str> {
    STANDARD_INDEX.get(name.trim()).copied()
}

/// Dictionary lookup of departments treating the disease. The standard
/// form is consulted when the raw term has no rule of its own.
pub fn departments_for_disease(name: &str) -> Vec<String> {
    let trimmed = name.trim();
    let lookup = |key: &str| {
        DEPARTMENT_INDEX
            .get(key)
            .map(|depts| depts.iter().map(|d| d.to_string()).collect::<Vec<_>>())
    };
    lookup(trimmed)
        .or_else(|| standard_disease(trimmed).and_then(lookup))
        .unwrap_or_default()
}

/// Progressive shorthand forms of a hospital name, longest first.
///
/// "연세대학교병원" also answers to "연세대병원", "연세대학교" and "연세대",
/// so every form reachable through the university shorthand and the
/// trailing-"병원" strip is generated.
pub fn hospital_aliases(name: &str) -> Vec<String> {
    let seed = name.trim();
    if seed.is_empty() {
        return Vec::new();
    }

    let mut aliases = vec![seed.to_string()];
    let mut queue = VecDeque::from([seed.to_string()]);
    while let Some(current) = queue.pop_front() {
        let mut variants = Vec::new();
        if current.contains("대학교") {
            variants.push(current.replace("대학교", "대"));
        }
        if let Some(stripped) = current.strip_suffix("병원") {
            if !stripped.is_empty() {
                variants.push(stripped.to_string());
            }
        }
        for variant in variants {
            if !aliases.contains(&variant) {
                aliases.push(variant.clone());
                queue.push_back(variant);
            }
        }
    }

    aliases.sort_by(|a, b| {
        b.chars()
            .count()
            .cmp(&a.chars().count())
            .then_with(|| a.cmp(b))
    });
    aliases
}

/// Syllable-set Jaccard similarity between two names.
pub fn name_similarity(a: &str, b: &str) -> f64 {
    let set_a: HashSet<char> = a.chars().filter(|c| !c.is_whitespace()).collect();
    let set_b: HashSet<char> = b.chars().filter(|c| !c.is_whitespace()).collect();
    if set_a.is_empty() || set_b.is_empty() {
        return 0.0;
    }
    let intersection = set_a.intersection(&set_b).count() as f64;
    let union = set_a.union(&set_b).count() as f64;
    intersection / union
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alias_maps_to_standard_disease() {
        assert_eq!(standard_disease("디스크"), Some("허리디스크"));
        assert_eq!(standard_disease(" 당뇨 "), Some("당뇨병"));
        assert_eq!(standard_disease("협심증"), Some("협심증"));
        assert_eq!(standard_disease("없는질환"), None);
    }

    #[test]
    fn department_rules_cover_the_alias_form() {
        assert_eq!(
            departments_for_disease("허리디스크"),
            vec!["신경외과", "정형외과"]
        );
        // Alias resolves through the standard form first.
        assert_eq!(departments_for_disease("디스크"), vec!["신경외과", "정형외과"]);
        assert!(departments_for_disease("없는질환").is_empty());
    }

    #[test]
    fn university_hospital_generates_every_shorthand() {
        let aliases = hospital_aliases("연세대학교병원");
        assert_eq!(
            aliases,
            vec!["연세대학교병원", "연세대병원", "연세대학교", "연세대"]
        );
    }

    #[test]
    fn plain_hospital_name_keeps_the_stripped_form() {
        let aliases = hospital_aliases("서울중앙병원");
        assert_eq!(aliases, vec!["서울중앙병원", "서울중앙"]);
    }

    #[test]
    fn similarity_is_syllable_set_overlap() {
        assert_eq!(name_similarity("서울병원", "서울병원"), 1.0);
        assert!(name_similarity("연세대병원", "연세대학교병원") > 0.6);
        assert_eq!(name_similarity("", "서울"), 0.0);
    }
}
