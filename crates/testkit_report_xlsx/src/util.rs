//! Stateless helper utilities used by the report compiler.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use regex::Regex;

use crate::conf::{N_LEN_EXCEL_SHEET_NAME_MAX, N_LEN_EXCEL_URL_MAX, TUP_EXCEL_ILLEGAL};
use crate::spec::CellFormatError;

////////////////////////////////////////////////////////////////////////////////
// #region Addressing

/// Convert a one-based column number to letters (`1 -> "A"`, `27 -> "AA"`).
///
/// Bijective base-26: every position runs `A..=Z`, there is no zero digit.
/// Returns an empty string for `0`.
pub fn derive_column_letter(n_col_1based: usize) -> String {
    let mut l_letters = Vec::new();
    let mut n_rest = n_col_1based;
    while n_rest > 0 {
        let n_digit = (n_rest - 1) % 26;
        l_letters.push(char::from(b'A' + n_digit as u8));
        n_rest = (n_rest - 1) / 26;
    }
    l_letters.iter().rev().collect()
}

/// Inverse of [`derive_column_letter`]; case-insensitive.
pub fn parse_column_letter(letters: &str) -> Option<usize> {
    if letters.is_empty() {
        return None;
    }
    let mut n_col = 0usize;
    for chr in letters.chars() {
        let chr = chr.to_ascii_uppercase();
        if !chr.is_ascii_uppercase() {
            return None;
        }
        let n_digit = (chr as usize) - ('A' as usize) + 1;
        n_col = n_col.checked_mul(26)?.checked_add(n_digit)?;
    }
    Some(n_col)
}

/// A1-style reference for zero-based `(row_idx, col_idx)`.
pub fn derive_cell_reference(row_idx: usize, col_idx: usize) -> String {
    format!("{}{}", derive_column_letter(col_idx + 1), row_idx + 1)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region TextNormalization

/// Shared emptiness predicate: non-empty after trimming whitespace.
pub fn is_text_present(text: &str) -> bool {
    !text.trim().is_empty()
}

/// Turn a raw field name into a header label.
///
/// A space goes before internal capitals (`testPriority` -> `Test Priority`,
/// `URLPath` -> `URL Path`), `_`/`-` become spaces, the first letter is capitalised.
pub fn humanize_field_name(name: &str) -> String {
    let l_chars: Vec<char> = name.trim().chars().collect();
    let mut c_label = String::with_capacity(l_chars.len() + 4);

    for (n_idx, chr) in l_chars.iter().copied().enumerate() {
        if chr == '_' || chr == '-' || chr.is_whitespace() {
            if !c_label.is_empty() && !c_label.ends_with(' ') {
                c_label.push(' ');
            }
            continue;
        }
        if n_idx > 0 && chr.is_uppercase() && !c_label.ends_with(' ') {
            let chr_prev = l_chars[n_idx - 1];
            let if_next_lower = l_chars.get(n_idx + 1).is_some_and(|c| c.is_lowercase());
            if chr_prev.is_lowercase()
                || chr_prev.is_ascii_digit()
                || (chr_prev.is_uppercase() && if_next_lower)
            {
                c_label.push(' ');
            }
        }
        c_label.push(chr);
    }

    let c_label = c_label.trim_end();
    let mut it_chars = c_label.chars();
    match it_chars.next() {
        Some(chr_first) => chr_first.to_uppercase().chain(it_chars).collect(),
        None => String::new(),
    }
}

static RE_MARKUP_BREAK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<br\s*/?>|</(p|div|li|tr|h[1-6])\s*>").expect("static markup pattern")
});
static RE_MARKUP_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("static markup pattern"));
static RE_NUMERIC_ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&#(x[0-9a-fA-F]+|[0-9]+);").expect("static markup pattern"));

/// Reduce HTML-ish markup to plain multi-line text.
pub fn strip_markup(text: &str) -> String {
    if !text.contains('<') && !text.contains('&') {
        return text.trim().to_string();
    }

    let c_text = RE_MARKUP_BREAK.replace_all(text, "\n");
    let c_text = RE_MARKUP_TAG.replace_all(&c_text, "");
    let c_text = RE_NUMERIC_ENTITY.replace_all(&c_text, |caps: &regex::Captures<'_>| {
        let c_code = &caps[1];
        let n_code = match c_code.strip_prefix('x') {
            Some(c_hex) => u32::from_str_radix(c_hex, 16).ok(),
            None => c_code.parse::<u32>().ok(),
        };
        n_code
            .and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_default()
    });
    let c_text = c_text
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&");

    let mut l_lines: Vec<&str> = Vec::new();
    for c_line in c_text.lines().map(str::trim) {
        if c_line.is_empty() && l_lines.last().is_none_or(|c_prev| c_prev.is_empty()) {
            continue;
        }
        l_lines.push(c_line);
    }
    l_lines.join("\n").trim().to_string()
}

/// Parse a date/date-time string delivered by the source system.
///
/// Accepts RFC 3339, `YYYY-MM-DD[ T]HH:MM[:SS[.f]]`, `YYYY-MM-DD` and `MM/DD/YYYY`.
/// Dates outside `1900..=9999` are rejected because worksheets cannot hold them.
pub fn parse_date_text(text: &str) -> Result<NaiveDateTime, CellFormatError> {
    let c_text = text.trim();
    let dt = parse_date_text_any(c_text)
        .ok_or_else(|| CellFormatError::InvalidDate(c_text.to_string()))?;
    validate_sheet_date(dt).map_err(|_| CellFormatError::InvalidDate(c_text.to_string()))
}

/// Reject date-times a worksheet cannot represent.
pub fn validate_sheet_date(dt: NaiveDateTime) -> Result<NaiveDateTime, CellFormatError> {
    if (1900..=9999).contains(&dt.year()) {
        Ok(dt)
    } else {
        Err(CellFormatError::InvalidDate(dt.to_string()))
    }
}

fn parse_date_text_any(c_text: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(c_text) {
        return Some(dt.naive_local());
    }
    for c_fmt in [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(c_text, c_fmt) {
            return Some(dt);
        }
    }
    for c_fmt in ["%Y-%m-%d", "%m/%d/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(c_text, c_fmt) {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    None
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Hyperlinks

static RE_URL_SCHEME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(https?://|ftp://|mailto:|file://|internal:)").expect("static url pattern")
});
static RE_URL_ESCAPED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^%[0-9a-fA-F]{2}").expect("static url pattern"));

/// Length of `url` once the workbook writer percent-escapes it.
pub fn derive_escaped_url_length(url: &str) -> usize {
    url.char_indices()
        .map(|(n_idx, c)| match c {
            '%' if RE_URL_ESCAPED.is_match(&url[n_idx..]) => 1,
            '%' | '"' | ' ' | '<' | '>' | '[' | ']' | '^' | '`' | '{' | '}' => 3,
            _ => 1,
        })
        .sum()
}

/// Whether a worksheet hyperlink can carry `url`: a known scheme and an escaped
/// length within the Excel limit.
pub fn is_sheet_url_supported(url: &str) -> bool {
    RE_URL_SCHEME.is_match(url) && derive_escaped_url_length(url) <= N_LEN_EXCEL_URL_MAX
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region SheetNormalization

/// Replace invalid chars and trim to valid Excel sheet name.
///
/// Blank results fall back to `name_default`.
pub fn sanitize_sheet_name(name: &str, replace_to: &str, name_default: &str) -> String {
    let mut c_name = name.to_string();
    for c_illegal in TUP_EXCEL_ILLEGAL {
        c_name = c_name.replace(c_illegal, replace_to);
    }
    c_name = c_name.trim().to_string();
    if c_name.is_empty() {
        c_name = name_default.to_string();
    }

    c_name
        .chars()
        .take(N_LEN_EXCEL_SHEET_NAME_MAX)
        .collect::<String>()
        .trim_end()
        .to_string()
}

/// Return `name` or a suffixed variant (`name__2`, `name__3`, ...) absent from `existing`.
pub fn derive_unique_sheet_name(existing: &BTreeSet<String>, name: &str) -> String {
    if !existing.contains(name) {
        return name.to_string();
    }

    let mut n_idx = 2usize;
    loop {
        let c_suffix = format!("__{n_idx}");
        let n_len_base_max = N_LEN_EXCEL_SHEET_NAME_MAX.saturating_sub(c_suffix.len());
        let c_base: String = name.chars().take(usize::max(1, n_len_base_max)).collect();
        let candidate = format!("{c_base}{c_suffix}");
        if !existing.contains(&candidate) {
            return candidate;
        }
        n_idx += 1;
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region MergeUtils

/// Convert sorted indices to contiguous inclusive ranges.
pub fn derive_contiguous_ranges(sorted_indices: &[usize]) -> Vec<(usize, usize)> {
    let Some((n_idx_first, l_rest)) = sorted_indices.split_first() else {
        return vec![];
    };

    let mut l_contiguous_ranges = Vec::new();
    let mut n_idx_start = *n_idx_first;
    let mut n_idx_end = *n_idx_first;

    for idx in l_rest {
        if *idx == n_idx_end + 1 {
            n_idx_end = *idx;
        } else {
            l_contiguous_ranges.push((n_idx_start, n_idx_end));
            n_idx_start = *idx;
            n_idx_end = *idx;
        }
    }

    l_contiguous_ranges.push((n_idx_start, n_idx_end));
    l_contiguous_ranges
}

/// Find runs of identical non-empty values, returned as inclusive `(start, end)` offsets.
///
/// A run never extends across a position where `is_boundary` is true; such a
/// position always opens a new run. Only runs longer than one are returned.
pub fn derive_vertical_runs<F>(values: &[String], is_boundary: F) -> Vec<(usize, usize)>
where
    F: Fn(usize) -> bool,
{
    let mut l_runs = Vec::new();
    let n_rows = values.len();

    let mut n_row_idx_start = 0;
    while n_row_idx_start < n_rows {
        let c_val_current = &values[n_row_idx_start];
        if c_val_current.is_empty() {
            n_row_idx_start += 1;
            continue;
        }

        let mut n_row_idx_next = n_row_idx_start + 1;
        while n_row_idx_next < n_rows
            && !is_boundary(n_row_idx_next)
            && values[n_row_idx_next] == *c_val_current
        {
            n_row_idx_next += 1;
        }

        if n_row_idx_next - n_row_idx_start > 1 {
            l_runs.push((n_row_idx_start, n_row_idx_next - 1));
        }
        n_row_idx_start = n_row_idx_next;
    }

    l_runs
}

/// Zebra boundary predicate: alternate when the key differs from the previous one.
///
/// The first block (`previous = None`) never alternates.
pub fn should_alternate<K: PartialEq + ?Sized>(previous: Option<&K>, current: &K) -> bool {
    previous.is_some_and(|prev| prev != current)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_letter_bijection() {
        let l_expected_head: Vec<String> = (b'A'..=b'Z').map(|b| char::from(b).to_string()).collect();
        for (n_idx, c_expected) in l_expected_head.iter().enumerate() {
            assert_eq!(&derive_column_letter(n_idx + 1), c_expected);
        }
        assert_eq!(derive_column_letter(27), "AA");
        assert_eq!(derive_column_letter(52), "AZ");
        assert_eq!(derive_column_letter(53), "BA");
        assert_eq!(derive_column_letter(702), "ZZ");
        assert_eq!(derive_column_letter(703), "AAA");
        assert_eq!(derive_column_letter(16_384), "XFD");
        assert_eq!(derive_column_letter(0), "");

        for n_col in 1..=20_000 {
            assert_eq!(parse_column_letter(&derive_column_letter(n_col)), Some(n_col));
        }
        assert_eq!(parse_column_letter("xfd"), Some(16_384));
        assert_eq!(parse_column_letter(""), None);
        assert_eq!(parse_column_letter("A1"), None);
    }

    #[test]
    fn test_cell_reference() {
        assert_eq!(derive_cell_reference(0, 0), "A1");
        assert_eq!(derive_cell_reference(9, 27), "AB10");
    }

    #[test]
    fn test_humanize_field_name() {
        assert_eq!(humanize_field_name("testPriority"), "Test Priority");
        assert_eq!(humanize_field_name("TestPriority"), "Test Priority");
        assert_eq!(humanize_field_name("URLPath"), "URL Path");
        assert_eq!(humanize_field_name("automation_status"), "Automation status");
        assert_eq!(humanize_field_name("area2Owner"), "Area2 Owner");
        assert_eq!(humanize_field_name("  "), "");
    }

    #[test]
    fn test_strip_markup() {
        assert_eq!(strip_markup("plain"), "plain");
        assert_eq!(
            strip_markup("<p>Open <b>login</b> page</p><p>Enter&nbsp;user &amp; pass</p>"),
            "Open login page\nEnter user & pass"
        );
        assert_eq!(strip_markup("a<br/>b<BR>c"), "a\nb\nc");
        assert_eq!(strip_markup("x &lt; y &#39;q&#x27;"), "x < y 'q'");
        assert_eq!(strip_markup("<div></div>"), "");
    }

    #[test]
    fn test_parse_date_text_formats() {
        let dt = parse_date_text("2024-03-05T10:20:30Z").unwrap();
        assert_eq!(dt.to_string(), "2024-03-05 10:20:30");
        assert_eq!(
            parse_date_text("2024-03-05 10:20:30").unwrap().to_string(),
            "2024-03-05 10:20:30"
        );
        assert_eq!(
            parse_date_text("2024-03-05").unwrap().to_string(),
            "2024-03-05 00:00:00"
        );
        assert_eq!(
            parse_date_text("03/05/2024").unwrap().to_string(),
            "2024-03-05 00:00:00"
        );
        assert_eq!(
            parse_date_text("yesterday"),
            Err(CellFormatError::InvalidDate("yesterday".to_string()))
        );
        assert!(parse_date_text("1850-01-01").is_err());
    }

    #[test]
    fn test_sheet_url_support() {
        assert!(is_sheet_url_supported("https://example.org/req/1"));
        assert!(is_sheet_url_supported("mailto:qa@example.org"));
        assert!(is_sheet_url_supported("internal:'Flat Report'!A1"));
        assert!(!is_sheet_url_supported("www.example.org/req/1"));
        assert!(!is_sheet_url_supported("gopher://example.org"));

        assert_eq!(derive_escaped_url_length("https://a.b/x y"), 17);
        assert_eq!(derive_escaped_url_length("https://a.b/x%20y"), 17);
        let c_url = format!("https://a.b/{}", " ".repeat(700));
        assert!(c_url.chars().count() <= N_LEN_EXCEL_URL_MAX);
        assert!(!is_sheet_url_supported(&c_url));
    }

    #[test]
    fn test_sanitize_sheet_name() {
        assert_eq!(sanitize_sheet_name("a/b:c", "_", "Sheet"), "a_b_c");
        assert_eq!(sanitize_sheet_name("  ", "_", "Flat Report"), "Flat Report");
        assert_eq!(sanitize_sheet_name("'quoted'", "", "Sheet"), "quoted");
        let c_long = "x".repeat(40);
        assert_eq!(sanitize_sheet_name(&c_long, "_", "Sheet").chars().count(), 31);
    }

    #[test]
    fn test_derive_unique_sheet_name() {
        let mut set_names = BTreeSet::new();
        assert_eq!(derive_unique_sheet_name(&set_names, "Report"), "Report");
        set_names.insert("Report".to_string());
        assert_eq!(derive_unique_sheet_name(&set_names, "Report"), "Report__2");
        set_names.insert("Report__2".to_string());
        assert_eq!(derive_unique_sheet_name(&set_names, "Report"), "Report__3");

        let c_long = "y".repeat(31);
        set_names.insert(c_long.clone());
        let c_unique = derive_unique_sheet_name(&set_names, &c_long);
        assert_eq!(c_unique.chars().count(), 31);
        assert!(c_unique.ends_with("__2"));
    }

    #[test]
    fn test_derive_contiguous_ranges() {
        assert!(derive_contiguous_ranges(&[]).is_empty());
        assert_eq!(
            derive_contiguous_ranges(&[0, 1, 2, 5, 6, 9]),
            vec![(0, 2), (5, 6), (9, 9)]
        );
    }

    #[test]
    fn test_derive_vertical_runs_respects_boundaries() {
        let values: Vec<String> = ["A", "A", "A", "", "B", "B", "B", "C"]
            .iter()
            .map(ToString::to_string)
            .collect();

        assert_eq!(
            derive_vertical_runs(&values, |_| false),
            vec![(0, 2), (4, 6)]
        );
        assert_eq!(
            derive_vertical_runs(&values, |n_idx| n_idx == 2 || n_idx == 6),
            vec![(0, 1), (4, 5)]
        );
    }

    #[test]
    fn test_should_alternate() {
        assert!(!should_alternate(None, "a"));
        assert!(!should_alternate(Some("a"), "a"));
        assert!(should_alternate(Some("a"), "b"));
    }
}
