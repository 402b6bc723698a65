//! Advisor corpus: the table of faculty records the index is built from.
//!
//! The corpus is loaded once at startup and is read-only afterwards. Records
//! are identified by their row position, which is also their position in the
//! index.

use crate::error::{AdvisorError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

/// One advisor or professor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "Name", alias = "name")]
    pub name: String,
    #[serde(rename = "Research_Areas", alias = "research_areas", default)]
    pub research_areas: String,
    #[serde(rename = "Summary", alias = "summary", alias = "Bio", alias = "bio", default)]
    pub summary: String,
    #[serde(rename = "Email", alias = "email", default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(rename = "URL", alias = "url", default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Record {
    /// Create a record without contact details.
    pub fn new(name: &str, research_areas: &str, summary: &str) -> Self {
        Self {
            name: name.to_string(),
            research_areas: research_areas.to_string(),
            summary: summary.to_string(),
            email: None,
            url: None,
        }
    }

    /// The descriptive sentence that is embedded and shown to the model.
    pub fn document_text(&self) -> String {
        format!("{} works on {}. {}", self.name, self.research_areas, self.summary)
    }
}

/// Ordered, read-only collection of records.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    records: Vec<Record>,
}

impl Corpus {
    /// Build a corpus from records already in memory.
    pub fn from_records(records: Vec<Record>) -> Self {
        Self { records }
    }

    /// Load a corpus from a `.csv` or `.json` file.
    pub fn load(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());

        let records = match extension.as_deref() {
            Some("csv") => Self::read_csv(path)?,
            Some("json") => {
                let content = std::fs::read_to_string(path)?;
                serde_json::from_str::<Vec<Record>>(&content)?
            }
            _ => {
                return Err(AdvisorError::Config(format!(
                    "Unsupported corpus format: {} (expected .csv or .json)",
                    path.display()
                )))
            }
        };

        let total = records.len();
        let records: Vec<Record> = records
            .into_iter()
            .enumerate()
            .filter_map(|(row, record)| {
                if record.name.trim().is_empty() {
                    warn!("Skipping corpus row {} with an empty name", row + 1);
                    None
                } else {
                    Some(record)
                }
            })
            .collect();

        debug!("Loaded {} of {} corpus rows from {}", records.len(), total, path.display());
        Ok(Self { records })
    }

    fn read_csv(path: &Path) -> Result<Vec<Record>> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)?;

        let mut records = Vec::new();
        for (row, result) in reader.deserialize::<Record>().enumerate() {
            let record = result
                .map_err(|e| AdvisorError::Corpus(format!("row {}: {}", row + 1, e)))?;
            records.push(record);
        }
        Ok(records)
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the corpus has no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Record at a row position.
    pub fn get(&self, row: usize) -> Option<&Record> {
        self.records.get(row)
    }

    /// Iterate over records in row order.
    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.iter()
    }

    /// Document texts in row order.
    pub fn document_texts(&self) -> Vec<String> {
        self.iter().map(Record::document_text).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_document_text_contains_name() {
        let record = Record::new("Jun Zhuang", "AI, ML", "works on human-centered computing");
        let text = record.document_text();
        assert_eq!(
            text,
            "Jun Zhuang works on AI, ML. works on human-centered computing"
        );
        assert!(text.contains(&record.name));
    }

    #[test]
    fn test_load_csv() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "Name,Research_Areas,Summary").unwrap();
        writeln!(file, "Jun Zhuang,\"AI, ML\",works on human-centered computing").unwrap();
        writeln!(file, "Ada Lovelace,Computation,Wrote the first program").unwrap();
        file.flush().unwrap();

        let corpus = Corpus::load(file.path()).unwrap();
        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus.get(0).unwrap().research_areas, "AI, ML");
        assert_eq!(corpus.get(1).unwrap().name, "Ada Lovelace");
        assert!(corpus.get(2).is_none());
    }

    #[test]
    fn test_load_scraped_csv_with_bio_column() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "Name,Email,Research_Areas,Bio,URL").unwrap();
        writeln!(
            file,
            "Jun Zhuang,jz@example.edu,AI,Studies people and models,https://example.edu/jz"
        )
        .unwrap();
        writeln!(file, ",,,,").unwrap();
        file.flush().unwrap();

        let corpus = Corpus::load(file.path()).unwrap();
        assert_eq!(corpus.len(), 1);
        let record = corpus.get(0).unwrap();
        assert_eq!(record.summary, "Studies people and models");
        assert_eq!(record.email.as_deref(), Some("jz@example.edu"));
        assert_eq!(record.url.as_deref(), Some("https://example.edu/jz"));
    }

    #[test]
    fn test_load_json() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"[{{"name": "Jun Zhuang", "research_areas": "AI", "summary": "HCI"}}]"#
        )
        .unwrap();
        file.flush().unwrap();

        let corpus = Corpus::load(file.path()).unwrap();
        assert_eq!(corpus.document_texts(), vec!["Jun Zhuang works on AI. HCI"]);
    }

    #[test]
    fn test_unsupported_extension() {
        let file = tempfile::Builder::new().suffix(".xlsx").tempfile().unwrap();
        let err = Corpus::load(file.path()).unwrap_err();
        assert!(matches!(err, AdvisorError::Config(_)));
    }
}
