//! CSV/JSON sink for finished advertiser lists. Both files carry the same
//! timestamp so a run's pair is easy to match up.

use anyhow::Result;
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::advertisers::Advertiser;

pub struct OutputPaths {
    pub json_path: PathBuf,
    pub csv_path: PathBuf,
}

const CSV_HEADERS: [&str; 8] = [
    "CompanyName",
    "Phone",
    "Email",
    "Address",
    "FacebookPageUrl",
    "MonthsRunning",
    "Followers",
    "KeywordsMatched",
];

pub fn write_csv_and_json(rows: &[Advertiser], out_dir: &Path) -> Result<OutputPaths> {
    fs::create_dir_all(out_dir)?;
    let timestamp = Utc::now().format("%Y-%m-%dT%H-%M-%S").to_string();

    let json_path = out_dir.join(format!("results-{timestamp}.json"));
    fs::write(&json_path, serde_json::to_string_pretty(rows)?)?;

    let csv_path = out_dir.join(format!("results-{timestamp}.csv"));
    write_csv(&csv_path, rows)?;

    info!(json = %json_path.display(), csv = %csv_path.display(), "results written");
    Ok(OutputPaths {
        json_path,
        csv_path,
    })
}

fn write_csv(path: &Path, rows: &[Advertiser]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(CSV_HEADERS)?;
    for row in rows {
        writer.write_record(&[
            row.company_name.clone(),
            row.contact.phone.clone().unwrap_or_default(),
            row.contact.email.clone().unwrap_or_default(),
            row.contact.address.clone().unwrap_or_default(),
            row.facebook_page_url.clone(),
            row.months_running.to_string(),
            row.followers.map_or_else(String::new, |f| f.to_string()),
            row.keywords_matched.join("; "),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advertisers::Contact;

    fn sample() -> Vec<Advertiser> {
        vec![Advertiser {
            company_name: "Acme Painting".to_string(),
            facebook_page_url: "https://www.facebook.com/acmepainting".to_string(),
            months_running: 7,
            followers: Some(12_500),
            contact: Contact {
                phone: Some("555-123-4567".to_string()),
                email: None,
                address: None,
            },
            keywords_matched: vec!["home painter".to_string(), "benjamin moore".to_string()],
        }]
    }

    fn temp_dir(name: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("ads_output_{name}"));
        let _ = fs::remove_dir_all(&path);
        path
    }

    #[test]
    fn test_writes_matching_json_and_csv() {
        let dir = temp_dir("pair");
        let paths = write_csv_and_json(&sample(), &dir).unwrap();

        let parsed: Vec<Advertiser> =
            serde_json::from_str(&fs::read_to_string(&paths.json_path).unwrap()).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].months_running, 7);

        let csv_text = fs::read_to_string(&paths.csv_path).unwrap();
        let mut lines = csv_text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "CompanyName,Phone,Email,Address,FacebookPageUrl,MonthsRunning,Followers,KeywordsMatched"
        );
        let row = lines.next().unwrap();
        assert!(row.contains("Acme Painting"));
        assert!(row.contains("home painter; benjamin moore"));
        assert!(row.contains("12500"));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_missing_fields_become_empty_cells() {
        let dir = temp_dir("empty");
        let mut rows = sample();
        rows[0].followers = None;
        rows[0].contact = Contact::default();
        let paths = write_csv_and_json(&rows, &dir).unwrap();
        let csv_text = fs::read_to_string(&paths.csv_path).unwrap();
        let row = csv_text.lines().nth(1).unwrap();
        assert!(row.starts_with("Acme Painting,,,,https://www.facebook.com/acmepainting,7,,"));
        let _ = fs::remove_dir_all(&dir);
    }
}
