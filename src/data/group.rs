use log::debug;
use regex::Regex;

use super::model::{Dataset, Field};

/// Treatment code at the start of a label: capitals, then optional digits.
pub const DEFAULT_TREATMENT_PATTERN: &str = r"^[A-Z]+[0-9]*";

// ---------------------------------------------------------------------------
// GroupExtractor – replicate label → treatment code
// ---------------------------------------------------------------------------

/// Derives the treatment code of every record.
///
/// When the dataset has an override column its cell is taken verbatim for
/// every row, blank cells included; the label pattern is only consulted when
/// the column is absent altogether.
#[derive(Debug, Clone)]
pub struct GroupExtractor {
    pattern: Regex,
}

impl GroupExtractor {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(GroupExtractor {
            pattern: Regex::new(pattern)?,
        })
    }

    /// Treatment code of a single label, `None` when the pattern finds nothing.
    pub fn extract(&self, label: &str) -> Option<String> {
        self.pattern
            .find(label.trim())
            .map(|m| m.as_str().to_string())
            .filter(|code| !code.is_empty())
    }

    /// Assign `group` on every record of the dataset.
    pub fn apply(&self, dataset: &mut Dataset) {
        let use_override = dataset.layout.is_present(Field::GroupOverride);
        debug!(
            "Extracting treatment codes ({})",
            if use_override { "override column" } else { "label pattern" }
        );
        for record in &mut dataset.records {
            record.group = if use_override {
                record.group_override.clone()
            } else {
                record.label.as_deref().and_then(|l| self.extract(l))
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{CellValue, RawTable, Record};
    use crate::data::schema::{Layout, Variant};

    fn dataset(columns: &[&str], rows: Vec<Vec<CellValue>>) -> Dataset {
        let table = RawTable::new(columns.iter().map(|c| c.to_string()).collect(), rows);
        let mut layout = Layout::new(Variant::Treatment, "TRATAMIENTOS");
        layout.bind(&table);
        Dataset::from_table(&table, Variant::Treatment, layout).unwrap()
    }

    fn extractor() -> GroupExtractor {
        GroupExtractor::new(DEFAULT_TREATMENT_PATTERN).unwrap()
    }

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    #[test]
    fn test_extract_treatment_and_replicate() {
        let ex = extractor();
        assert_eq!(ex.extract("T1R3").as_deref(), Some("T1"));
        assert_eq!(ex.extract("T2").as_deref(), Some("T2"));
        assert_eq!(ex.extract("T10R12").as_deref(), Some("T10"));
    }

    #[test]
    fn test_extract_letters_only() {
        let ex = extractor();
        assert_eq!(ex.extract("TR").as_deref(), Some("TR"));
        assert_eq!(ex.extract(" CTRL ").as_deref(), Some("CTRL"));
    }

    #[test]
    fn test_extract_without_leading_letters_is_missing() {
        let ex = extractor();
        assert_eq!(ex.extract("1T2"), None);
        assert_eq!(ex.extract("t1r3"), None);
        assert_eq!(ex.extract(""), None);
    }

    #[test]
    fn test_apply_uses_label_pattern() {
        let mut ds = dataset(
            &["REPETICIONES"],
            vec![vec![text("T1R1")], vec![text("T2R4")], vec![CellValue::Integer(7)]],
        );
        extractor().apply(&mut ds);
        let groups: Vec<_> = ds.records.iter().map(|r| r.group.clone()).collect();
        assert_eq!(groups, vec![Some("T1".into()), Some("T2".into()), None]);
    }

    #[test]
    fn test_override_column_wins_unconditionally() {
        let mut ds = dataset(
            &["REPETICIONES", "TRATAMIENTOS"],
            vec![
                vec![text("T1R1"), text("control")],
                vec![text("T2R1"), CellValue::Null],
            ],
        );
        extractor().apply(&mut ds);
        assert_eq!(ds.records[0].group.as_deref(), Some("control"));
        // no per-row fallback to the label
        assert_eq!(ds.records[1].group, None);
    }

    #[test]
    fn test_apply_is_idempotent() {
        let mut ds = dataset(
            &["REPETICIONES"],
            vec![vec![text("T1R1")], vec![text("T3R2")]],
        );
        let ex = extractor();
        ex.apply(&mut ds);
        let first: Vec<Record> = ds.records.clone();
        ex.apply(&mut ds);
        assert_eq!(ds.records, first);
    }

    #[test]
    fn test_invalid_pattern_is_error() {
        assert!(GroupExtractor::new("[A-Z").is_err());
    }
}
