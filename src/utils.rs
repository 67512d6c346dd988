use crate::regex::Regex;
use std::sync::LazyLock;

static YEAR_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(\d{4})\b").unwrap());

/// Case-insensitive lookup key for acronyms.
pub(crate) fn casefold(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Formats a DOI string by removing URL prefixes, labels and [doi] suffixes
///
/// # Arguments
///
/// * `doi_str` - The DOI string to format
pub(crate) fn format_doi(doi_str: &str) -> Option<String> {
    if doi_str.is_empty() {
        return None;
    }
    let doi = doi_str
        .trim()
        .trim_end_matches("[doi]")
        .trim()
        .replace(|c: char| c.is_whitespace(), "")
        .to_lowercase();

    // URL prefixes and "DOI:" labels all precede the "10." registrant code
    let pos = doi.find("10.")?;
    Some(doi[pos..].to_string())
}

/// Parses a citation count cell. Spreadsheet exports often carry counts as
/// floats ("12.0"), so those are accepted too. Anything else counts as zero.
pub(crate) fn parse_cites(value: &str) -> u32 {
    let value = value.trim();
    if let Ok(n) = value.parse::<u32>() {
        return n;
    }
    match value.parse::<f64>() {
        Ok(n) if n.is_finite() && n > 0.0 => n.trunc() as u32,
        _ => 0,
    }
}

/// Extracts a publication year from a cell that may hold a bare year, a
/// float year ("2021.0") or a full date ("2021-05-03").
pub(crate) fn parse_year(value: &str) -> Option<i32> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(year) = value.parse::<i32>() {
        return Some(year);
    }
    if let Ok(year) = value.parse::<f64>() {
        if year.is_finite() && year.fract() == 0.0 {
            return Some(year as i32);
        }
    }
    YEAR_REGEX
        .captures(value)
        .and_then(|captures| captures[1].parse().ok())
}

/// Splits a delimiter-joined cell into trimmed, non-empty parts.
pub(crate) fn split_list(value: &str, delimiter: char) -> impl Iterator<Item = String> + '_ {
    value
        .split(delimiter)
        .map(str::trim)
        .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("nan"))
        .map(String::from)
}

/// Returns the final path component, whatever the separator style.
pub(crate) fn file_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}
