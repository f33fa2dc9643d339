//! Coercion of loosely shaped collaborator JSON into typed values.
//!
//! Every accepted spelling of a collaborator response field lives in [`FIELD_ALIASES`].
//! Request bodies declare their camelCase spellings with `#[serde(alias)]` on the DTOs.

use serde_json::Value as JsonValue;

/// Canonical field name followed by the keys accepted for it, in lookup order.
pub const FIELD_ALIASES: &[(&str, &[&str])] = &[
    ("parsed", &["extracted", "parsed"]),
    ("skills", &["skills", "rawSkills", "raw_skills"]),
    ("projects", &["projects", "rawProjects", "raw_projects"]),
    ("tools", &["tools", "rawTools", "raw_tools"]),
    ("experience", &["experience", "rawExperience", "raw_experience"]),
    ("education", &["education", "rawEducation", "raw_education"]),
    ("summary", &["summary"]),
    ("raw_text", &["raw_text", "rawText"]),
    ("branch", &["branch", "department"]),
    ("gpa", &["gpa", "cgpa", "CGPA"]),
    ("batch", &["batch", "graduation_year", "graduationYear"]),
    ("embedding", &["embedding", "skillEmbedding", "skill_embedding"]),
    ("engine", &["engine", "engineName", "engine_name"]),
    (
        "version",
        &["version", "engineVersion", "engine_version", "model_version"],
    ),
    ("position", &["title", "role", "position"]),
    ("description", &["description"]),
];

pub fn aliases(canonical: &str) -> &'static [&'static str] {
    FIELD_ALIASES
        .iter()
        .find(|(name, _)| *name == canonical)
        .map(|(_, keys)| *keys)
        .unwrap_or(&[])
}

/// First non-null value stored under any alias of `canonical`.
pub fn lookup<'a>(obj: &'a JsonValue, canonical: &str) -> Option<&'a JsonValue> {
    aliases(canonical)
        .iter()
        .filter_map(|key| obj.get(*key))
        .find(|value| !value.is_null())
}

/// Trimmed, non-empty strings with case-insensitive duplicates removed. Keeps the
/// first spelling seen.
pub fn dedup_trimmed<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for item in items {
        let trimmed = item.as_ref().trim();
        if trimmed.is_empty() {
            continue;
        }
        if seen.insert(trimmed.to_lowercase()) {
            out.push(trimmed.to_string());
        }
    }
    out
}

/// Accepts an array of strings, an array of `{ "name": .. }` objects, or a comma
/// separated string.
pub fn string_list(value: Option<&JsonValue>) -> Vec<String> {
    match value {
        Some(JsonValue::Array(items)) => dedup_trimmed(items.iter().filter_map(|item| match item {
            JsonValue::String(s) => Some(s.clone()),
            JsonValue::Object(_) => item
                .get("name")
                .and_then(|n| n.as_str())
                .map(str::to_string),
            _ => None,
        })),
        Some(JsonValue::String(s)) => dedup_trimmed(s.split(',')),
        _ => Vec::new(),
    }
}

/// Arrays pass through with nulls dropped; a lone object becomes a one-element list.
pub fn object_list(value: Option<&JsonValue>) -> Vec<JsonValue> {
    match value {
        Some(JsonValue::Array(items)) => items.iter().filter(|v| !v.is_null()).cloned().collect(),
        Some(obj @ JsonValue::Object(_)) => vec![obj.clone()],
        _ => Vec::new(),
    }
}

pub fn opt_string(value: Option<&JsonValue>) -> Option<String> {
    match value? {
        JsonValue::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Finite numbers only; `"NaN"` and `"inf"` read as absent.
pub fn opt_f64(value: Option<&JsonValue>) -> Option<f64> {
    let parsed = match value? {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

/// `None` unless the value is a non-empty numeric array.
pub fn f32_list(value: Option<&JsonValue>) -> Option<Vec<f32>> {
    let items = value?.as_array()?;
    let out: Vec<f32> = items
        .iter()
        .filter_map(|v| v.as_f64())
        .map(|v| v as f32)
        .collect();
    (!out.is_empty()).then_some(out)
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncates on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Lowercased, trimmed, deduplicated tags.
pub fn lowercase_tags<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    dedup_trimmed(items.into_iter().map(|s| s.as_ref().to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lookup_walks_aliases_in_order() {
        let body = json!({ "engineName": "gemini", "engine_name": "other" });
        assert_eq!(lookup(&body, "engine"), Some(&json!("gemini")));

        let body = json!({ "engine": null, "engine_name": "fallback" });
        assert_eq!(lookup(&body, "engine"), Some(&json!("fallback")));

        assert!(lookup(&body, "not_a_field").is_none());
    }

    #[test]
    fn string_list_accepts_common_shapes() {
        assert_eq!(
            string_list(Some(&json!([" Rust", "rust", "SQL", 3, ""]))),
            vec!["Rust", "SQL"]
        );
        assert_eq!(
            string_list(Some(&json!([{ "name": "Docker" }, { "level": 2 }]))),
            vec!["Docker"]
        );
        assert_eq!(
            string_list(Some(&json!("python, go ,"))),
            vec!["python", "go"]
        );
        assert!(string_list(None).is_empty());
    }

    #[test]
    fn numbers_are_read_from_strings_too() {
        assert_eq!(opt_f64(Some(&json!("7.5"))), Some(7.5));
        assert_eq!(opt_f64(Some(&json!(8))), Some(8.0));
        assert_eq!(opt_string(Some(&json!(2025))), Some("2025".to_string()));
        assert_eq!(opt_string(Some(&json!("   "))), None);
    }

    #[test]
    fn non_finite_numbers_are_absent() {
        assert_eq!(opt_f64(Some(&json!("NaN"))), None);
        assert_eq!(opt_f64(Some(&json!("inf"))), None);
        assert_eq!(opt_f64(Some(&json!("-Infinity"))), None);
    }

    #[test]
    fn empty_embedding_is_absent() {
        assert_eq!(f32_list(Some(&json!([]))), None);
        assert_eq!(f32_list(Some(&json!([0.5, 1]))), Some(vec![0.5, 1.0]));
    }

    #[test]
    fn summary_helpers_keep_char_boundaries() {
        assert_eq!(collapse_whitespace("a \n\t b  c"), "a b c");
        assert_eq!(truncate_chars("héllo", 2), "hé");
    }
}
