//! Shared helpers: page-URL normalization, month spans and the
//! first-non-empty combinator used by the extraction heuristics.

use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use url::Url;

static FACEBOOK_BASE: Lazy<Url> =
    Lazy::new(|| Url::parse("https://www.facebook.com").unwrap());

/// Canonicalize a page reference to a stable comparison key: resolve against
/// the Facebook authority, strip query string and fragment, strip one
/// trailing slash. Malformed input is returned unchanged.
pub fn normalize_page_url(raw: &str) -> String {
    let mut parsed = match FACEBOOK_BASE.join(raw) {
        Ok(url) => url,
        Err(_) => return raw.to_string(),
    };
    parsed.set_query(None);
    parsed.set_fragment(None);
    let mut normalized = parsed.to_string();
    if normalized.ends_with('/') {
        normalized.pop();
    }
    normalized
}

/// Deduplication key for an advertiser: normalized page URL plus the
/// lowercased page name.
pub fn advertiser_key(page_url: &str, page_name: &str) -> String {
    format!(
        "{}::{}",
        normalize_page_url(page_url),
        page_name.trim().to_lowercase()
    )
}

/// Whole months between two dates. A partial final month is not counted:
/// the span is decremented when the end day-of-month is before the start
/// day-of-month. Never negative.
pub fn months_between(start: NaiveDate, end: NaiveDate) -> u32 {
    let mut months =
        (end.year() - start.year()) * 12 + (end.month() as i32 - start.month() as i32);
    if end.day() < start.day() {
        months -= 1;
    }
    months.max(0) as u32
}

/// First non-empty result from an ordered sequence of candidates. With a
/// lazy iterator the remaining candidates are never produced once one hits.
pub fn first_some<T>(candidates: impl IntoIterator<Item = Option<T>>) -> Option<T> {
    candidates.into_iter().flatten().next()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_months_between_same_day() {
        assert_eq!(months_between(date(2024, 1, 15), date(2024, 1, 15)), 0);
    }

    #[test]
    fn test_months_between_partial_month_not_counted() {
        assert_eq!(months_between(date(2024, 1, 15), date(2024, 3, 10)), 1);
    }

    #[test]
    fn test_months_between_full_months() {
        assert_eq!(months_between(date(2024, 1, 10), date(2024, 3, 10)), 2);
    }

    #[test]
    fn test_months_between_across_years() {
        assert_eq!(months_between(date(2022, 11, 1), date(2024, 1, 1)), 14);
    }

    #[test]
    fn test_months_between_never_negative() {
        assert_eq!(months_between(date(2024, 1, 20), date(2024, 1, 5)), 0);
    }

    #[test]
    fn test_normalize_strips_query_fragment_and_slash() {
        assert_eq!(
            normalize_page_url("https://x.com/page?a=1#b"),
            normalize_page_url("https://x.com/page/")
        );
        assert_eq!(
            normalize_page_url("https://www.facebook.com/acme/?ref=pg"),
            "https://www.facebook.com/acme"
        );
    }

    #[test]
    fn test_normalize_resolves_relative_slugs() {
        assert_eq!(
            normalize_page_url("/acmepainting"),
            "https://www.facebook.com/acmepainting"
        );
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let once = normalize_page_url("https://www.facebook.com/acme/?fref=ts#top");
        assert_eq!(normalize_page_url(&once), once);
        let root = normalize_page_url("https://www.facebook.com");
        assert_eq!(normalize_page_url(&root), root);
    }

    #[test]
    fn test_advertiser_key_case_and_trim_insensitive() {
        assert_eq!(
            advertiser_key("https://www.facebook.com/acme/", "  Acme Painting "),
            advertiser_key("/acme", "ACME PAINTING")
        );
    }

    #[test]
    fn test_first_some_short_circuits() {
        // An infinite candidate stream terminates at the first hit.
        let found = first_some((0..).map(|i| if i == 2 { Some(i) } else { None }));
        assert_eq!(found, Some(2));
        assert_eq!(first_some(Vec::<Option<u8>>::new()), None);
    }
}
