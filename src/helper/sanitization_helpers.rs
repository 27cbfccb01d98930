use crate::helper::HelperError;
use crate::models::AuthorInfo;
use std::collections::HashSet;

/// Strips all HTML tags from input (for titles, abstracts, comments and names)
pub fn strip_all_html(input: &str) -> String {
    ammonia::Builder::new()
        .tags(HashSet::new())
        .clean(input)
        .to_string()
}

/// A required free-text field: stripped of markup and rejected when blank.
pub fn clean_required(field: &str, value: Option<&str>) -> Result<String, HelperError> {
    match value.map(|v| strip_all_html(v.trim())) {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(HelperError::Validation(format!("{} is required", field))),
    }
}

/// An optional free-text field. Blank input is stored as absent.
pub fn clean_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| strip_all_html(v.trim()).trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Cleans a keyword list, dropping blanks and case-insensitive repeats.
/// An empty result is stored as absent.
pub fn normalize_keywords(keywords: Option<Vec<String>>) -> Option<Vec<String>> {
    let mut seen = HashSet::new();
    let cleaned: Vec<String> = keywords?
        .into_iter()
        .filter_map(|k| clean_optional(Some(k)))
        .filter(|k| seen.insert(k.to_lowercase()))
        .collect();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

pub fn clean_author(author: AuthorInfo) -> Result<AuthorInfo, HelperError> {
    Ok(AuthorInfo {
        name: clean_required("Author name", Some(&author.name))?,
        email: clean_optional(author.email).map(|e| e.to_lowercase()),
        institution: clean_optional(author.institution),
        orcid: clean_optional(author.orcid),
    })
}

pub fn clean_authors(authors: Option<Vec<AuthorInfo>>) -> Result<Option<Vec<AuthorInfo>>, HelperError> {
    authors
        .map(|list| list.into_iter().map(clean_author).collect::<Result<Vec<_>, _>>())
        .transpose()
}
