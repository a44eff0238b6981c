//! Advertiser records and the deduplicating aggregator that folds
//! per-keyword card sightings into them.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use utoipa::ToSchema;

use crate::util::advertiser_key;

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct Contact {
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
}

impl Contact {
    pub fn any_set(&self) -> bool {
        self.phone.is_some() || self.email.is_some() || self.address.is_some()
    }
}

/// One deduplicated advertiser, aggregated across all matching keywords in a
/// run. `company_name` and `facebook_page_url` are fixed at first sighting;
/// `followers` and the contact fields are filled by the enrichment pass.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Advertiser {
    pub company_name: String,
    pub facebook_page_url: String,
    pub months_running: u32,
    pub followers: Option<u64>,
    pub contact: Contact,
    pub keywords_matched: Vec<String>,
}

/// Advertiser set keyed by normalized page URL + lowercased page name,
/// preserving first-sighting order for the final output.
#[derive(Debug, Default)]
pub struct AdvertiserBook {
    order: Vec<String>,
    entries: HashMap<String, Advertiser>,
}

impl AdvertiserBook {
    /// Fold one valid card sighting in. Returns true when a new advertiser
    /// was created, false when an existing one was merged (months
    /// max-merged, keyword appended if unseen).
    pub fn record(&mut self, page_url: &str, page_name: &str, months: u32, keyword: &str) -> bool {
        let key = advertiser_key(page_url, page_name);
        match self.entries.get_mut(&key) {
            Some(existing) => {
                existing.months_running = existing.months_running.max(months);
                if !existing.keywords_matched.iter().any(|k| k == keyword) {
                    existing.keywords_matched.push(keyword.to_string());
                }
                false
            }
            None => {
                self.entries.insert(
                    key.clone(),
                    Advertiser {
                        company_name: page_name.to_string(),
                        facebook_page_url: page_url.to_string(),
                        months_running: months,
                        followers: None,
                        contact: Contact::default(),
                        keywords_matched: vec![keyword.to_string()],
                    },
                );
                self.order.push(key);
                true
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_advertisers(mut self) -> Vec<Advertiser> {
        self.order
            .iter()
            .filter_map(|key| self.entries.remove(key))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_inserts_then_merges_months() {
        let mut book = AdvertiserBook::default();
        assert!(book.record("https://www.facebook.com/acme", "Acme", 2, "painter"));
        assert!(!book.record("https://www.facebook.com/acme/", "ACME", 5, "painter"));
        let advertisers = book.into_advertisers();
        assert_eq!(advertisers.len(), 1);
        assert_eq!(advertisers[0].months_running, 5);
    }

    #[test]
    fn test_record_never_lowers_months() {
        let mut book = AdvertiserBook::default();
        book.record("/acme", "Acme", 7, "a");
        book.record("/acme", "Acme", 3, "b");
        assert_eq!(book.into_advertisers()[0].months_running, 7);
    }

    #[test]
    fn test_keywords_append_only_unique_ordered() {
        let mut book = AdvertiserBook::default();
        book.record("/acme", "Acme", 4, "a");
        book.record("/acme", "Acme", 4, "a");
        book.record("/acme", "Acme", 4, "b");
        assert_eq!(book.into_advertisers()[0].keywords_matched, vec!["a", "b"]);
    }

    #[test]
    fn test_first_sighting_fields_are_kept() {
        let mut book = AdvertiserBook::default();
        book.record("https://www.facebook.com/acme?ref=x", "Acme", 4, "a");
        book.record("/acme", "acme", 9, "b");
        let advertisers = book.into_advertisers();
        assert_eq!(advertisers[0].company_name, "Acme");
        assert_eq!(advertisers[0].facebook_page_url, "https://www.facebook.com/acme?ref=x");
    }

    #[test]
    fn test_output_preserves_insertion_order() {
        let mut book = AdvertiserBook::default();
        book.record("/zeta", "Zeta", 4, "a");
        book.record("/alpha", "Alpha", 4, "a");
        let names: Vec<_> = book
            .into_advertisers()
            .into_iter()
            .map(|a| a.company_name)
            .collect();
        assert_eq!(names, vec!["Zeta", "Alpha"]);
    }

    #[test]
    fn test_serializes_camel_case() {
        let mut book = AdvertiserBook::default();
        book.record("/acme", "Acme", 4, "a");
        let json = serde_json::to_value(book.into_advertisers()).unwrap();
        let first = &json[0];
        assert!(first.get("companyName").is_some());
        assert!(first.get("facebookPageUrl").is_some());
        assert!(first.get("monthsRunning").is_some());
        assert!(first.get("keywordsMatched").is_some());
    }
}
