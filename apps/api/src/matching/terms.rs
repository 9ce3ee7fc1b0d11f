//! Skill-term normalization shared by listings and seeker profiles.
//!
//! Terms and free text go through the same pipeline so that a whole-word
//! containment check on the normalized forms is meaningful.

use std::collections::HashSet;

use once_cell::sync::Lazy;

/// Single-token aliases folded onto a canonical spelling.
const ALIASES: &[(&str, &str)] = &[
    ("js", "javascript"),
    ("ts", "typescript"),
    ("k8s", "kubernetes"),
    ("golang", "go"),
    ("postgres", "postgresql"),
    ("reactjs", "react"),
    ("react.js", "react"),
    ("nodejs", "node"),
    ("node.js", "node"),
];

/// Vocabulary used to infer requirements from listings that declare no skills.
static SKILL_VOCABULARY: Lazy<Vec<String>> = Lazy::new(|| {
    [
        // languages
        // "go" and "r" are left out: too common as plain words.
        "rust", "python", "java", "javascript", "typescript", "c++", "c#", "ruby",
        "php", "kotlin", "swift", "scala", "sql", "html", "css",
        // frameworks and runtimes
        "react", "angular", "vue", "node", "django", "flask", "spring", "rails",
        "laravel", ".net", "tokio", "pytorch", "tensorflow",
        // infrastructure and data
        "aws", "azure", "gcp", "docker", "kubernetes", "terraform", "linux", "git",
        "postgresql", "mysql", "mongodb", "redis", "kafka", "spark", "graphql",
        "ci/cd", "machine learning", "data analysis", "distributed systems",
        // general business skills
        "excel", "salesforce", "seo", "accounting", "bookkeeping", "sales",
        "marketing", "customer service", "project management", "product management",
        "copywriting", "figma", "photoshop", "recruiting", "nursing", "logistics",
    ]
    .iter()
    .map(|s| normalize_term(s))
    .collect()
});

/// Lowercases, keeps `+ # . /` inside tokens, turns other punctuation into
/// spaces, strips sentence-final dots, folds aliases and collapses whitespace.
pub fn normalize_term(raw: &str) -> String {
    let mapped: String = raw
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '+' | '#' | '.' | '/') {
                c
            } else {
                ' '
            }
        })
        .collect();

    mapped
        .split_whitespace()
        .map(|token| token.trim_end_matches(['.', '/']))
        .filter(|token| !token.is_empty())
        .map(|token| {
            ALIASES
                .iter()
                .find(|(alias, _)| *alias == token)
                .map(|(_, canonical)| *canonical)
                .unwrap_or(token)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Free text uses the same normalization as terms.
pub fn normalize_text(raw: &str) -> String {
    normalize_term(raw)
}

/// Whole-word containment; both sides must already be normalized.
pub fn contains_term(normalized_text: &str, normalized_term: &str) -> bool {
    if normalized_term.is_empty() || normalized_text.is_empty() {
        return false;
    }
    format!(" {normalized_text} ").contains(&format!(" {normalized_term} "))
}

/// Normalized, de-duplicated set of terms.
pub fn term_set(values: &[String]) -> HashSet<String> {
    values
        .iter()
        .map(|v| normalize_term(v))
        .filter(|v| !v.is_empty())
        .collect()
}

/// Vocabulary terms found in the given text, in vocabulary order.
pub fn infer_terms(text: &str) -> Vec<String> {
    let normalized = normalize_text(text);
    SKILL_VOCABULARY
        .iter()
        .filter(|term| contains_term(&normalized, term))
        .cloned()
        .collect()
}

/// City part of a free-form location ("Austin, TX" → "austin").
pub fn city_of(location: &str) -> Option<String> {
    let city = normalize_term(location.split(',').next().unwrap_or(""));
    (!city.is_empty()).then_some(city)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_folds_case_whitespace_and_aliases() {
        assert_eq!(normalize_term("  Node.JS "), "node");
        assert_eq!(normalize_term("K8s"), "kubernetes");
        assert_eq!(normalize_term("Distributed   Systems"), "distributed systems");
        assert_eq!(normalize_term("C++"), "c++");
        assert_eq!(normalize_term("C#,"), "c#");
    }

    #[test]
    fn test_sentence_final_dot_is_stripped() {
        assert_eq!(normalize_text("I write Rust."), "i write rust");
        assert_eq!(normalize_text("Shipped on .NET"), "shipped on .net");
    }

    #[test]
    fn test_contains_term_is_whole_word() {
        let text = normalize_text("Good communicator, strong Rust background");
        assert!(contains_term(&text, "rust"));
        assert!(!contains_term(&text, "go"));
        assert!(contains_term(&text, "strong rust"));
    }

    #[test]
    fn test_alias_in_text_matches_canonical_term() {
        let text = normalize_text("Built services on NodeJS and Postgres");
        assert!(contains_term(&text, "node"));
        assert!(contains_term(&text, "postgresql"));
    }

    #[test]
    fn test_infer_terms_from_description() {
        let inferred = infer_terms(
            "We need a Python developer comfortable with Docker and machine learning pipelines.",
        );
        assert!(inferred.contains(&"python".to_string()));
        assert!(inferred.contains(&"docker".to_string()));
        assert!(inferred.contains(&"machine learning".to_string()));
        assert!(!inferred.contains(&"rust".to_string()));
    }

    #[test]
    fn test_infer_terms_empty_for_generic_text() {
        assert!(infer_terms("Join our friendly team!").is_empty());
    }

    #[test]
    fn test_term_set_dedupes_aliases() {
        let set = term_set(&["JS".to_string(), "javascript".to_string(), " ".to_string()]);
        assert_eq!(set.len(), 1);
        assert!(set.contains("javascript"));
    }

    #[test]
    fn test_city_of() {
        assert_eq!(city_of("Austin, TX"), Some("austin".to_string()));
        assert_eq!(city_of("  "), None);
    }
}
