use super::types::{
    ArtifactCategory, ArtifactEntry, Classification, Delimiter, ReportHeader, TableLayout,
};
use crate::error::ClassifyError;
use tracing::debug;

pub(crate) const HEADER_SECTION: &str = "[Header]";
pub(crate) const DATA_SECTION: &str = "[Data]";
pub(crate) const REPORT_KEY_COLUMN: &str = "SNP Name";
pub(crate) const MAP_KEY_COLUMN: &str = "Name";

/// Decoded text of a single-entry upload.
pub fn entry_text(entry: &ArtifactEntry) -> Result<&str, ClassifyError> {
    let text = std::str::from_utf8(&entry.bytes).map_err(|_| ClassifyError::Unreadable)?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    if text.trim().is_empty() {
        return Err(ClassifyError::Empty);
    }
    Ok(text)
}

/// Sniffs the category of an upload and the field separator of its table.
#[derive(Debug, Clone)]
pub struct Classifier {
    candidates: Vec<Delimiter>,
    sample_rows: usize,
}

impl Classifier {
    pub fn new(candidates: Vec<Delimiter>, sample_rows: usize) -> Self {
        Self {
            candidates,
            sample_rows: sample_rows.max(1),
        }
    }

    pub fn candidates(&self) -> &[Delimiter] {
        &self.candidates
    }

    pub fn classify(&self, entry: &ArtifactEntry) -> Result<Classification, ClassifyError> {
        let text = entry_text(entry)?;
        let lines: Vec<&str> = text.lines().collect();
        let first = lines
            .iter()
            .position(|line| !line.trim().is_empty())
            .ok_or(ClassifyError::Empty)?;

        if lines[first].trim() != HEADER_SECTION {
            let layout = self.detect_layout(&lines, first, MAP_KEY_COLUMN)?;
            return Ok(Classification {
                category: ArtifactCategory::Map,
                layout: Some(layout),
                header: ReportHeader::default(),
            });
        }

        let data = lines
            .iter()
            .position(|line| line.trim() == DATA_SECTION);
        let header_block = &lines[first + 1..data.unwrap_or(lines.len())];

        let Some(data) = data else {
            debug!(entry = %entry.name, "header block without data section");
            return Ok(Classification {
                category: ArtifactCategory::Chip,
                layout: None,
                header: self.parse_report_header(header_block, None),
            });
        };

        let table_start = lines[data + 1..]
            .iter()
            .position(|line| !line.trim().is_empty())
            .map(|offset| data + 1 + offset)
            .ok_or(ClassifyError::MissingHeader)?;
        let layout = self.detect_layout(&lines, table_start, REPORT_KEY_COLUMN)?;
        let header = self.parse_report_header(header_block, Some(&layout.delimiter));

        Ok(Classification {
            category: ArtifactCategory::Genotype,
            layout: Some(layout),
            header,
        })
    }

    /// Pick the separator for the table whose column header sits at `header_line`.
    fn detect_layout(
        &self,
        lines: &[&str],
        header_line: usize,
        key_column: &str,
    ) -> Result<TableLayout, ClassifyError> {
        let header = lines[header_line];
        let sampled: Vec<&str> = lines[header_line + 1..]
            .iter()
            .filter(|line| !line.trim().is_empty())
            .take(self.sample_rows)
            .copied()
            .collect();

        let viable: Vec<(&Delimiter, Vec<String>)> = self
            .candidates
            .iter()
            .filter_map(|delimiter| {
                let columns: Vec<String> =
                    delimiter.split(header).into_iter().map(str::to_string).collect();
                if columns.len() < 2 {
                    return None;
                }
                let consistent = sampled
                    .iter()
                    .all(|row| delimiter.split(row).len() == columns.len());
                consistent.then_some((delimiter, columns))
            })
            .collect();

        let keyed: Vec<&(&Delimiter, Vec<String>)> = viable
            .iter()
            .filter(|(_, columns)| columns.iter().any(|c| c == key_column))
            .collect();
        let pool: Vec<&(&Delimiter, Vec<String>)> = if keyed.is_empty() {
            viable.iter().collect()
        } else {
            keyed
        };

        let (delimiter, columns) = pool.first().ok_or(ClassifyError::NoDelimiterMatch)?;
        let conflicting: Vec<String> = pool
            .iter()
            .filter(|(_, other)| other != columns)
            .map(|(d, _)| d.name())
            .collect();
        if !conflicting.is_empty() {
            let mut names = vec![delimiter.name()];
            names.extend(conflicting);
            return Err(ClassifyError::AmbiguousFormat(names));
        }

        debug!(delimiter = %delimiter, columns = columns.len(), "delimiter selected");
        Ok(TableLayout {
            delimiter: (*delimiter).clone(),
            header_line,
            columns: columns.clone(),
        })
    }

    /// Key/value pairs of the `[Header]` block. The value is the last non-empty
    /// field after the key, which covers `Content<TAB><TAB>chip.bpm`.
    fn parse_report_header(&self, block: &[&str], preferred: Option<&Delimiter>) -> ReportHeader {
        let mut header = ReportHeader::default();
        let order: Vec<&Delimiter> = preferred
            .into_iter()
            .chain(self.candidates.iter())
            .collect();

        for line in block.iter().filter(|line| !line.trim().is_empty()) {
            let parsed = order.iter().find_map(|delimiter| {
                let fields = delimiter.split(line);
                let (key, rest) = fields.split_first()?;
                let value = rest.iter().rev().find(|v| !v.is_empty())?;
                (!key.is_empty()).then(|| (key.to_string(), value.to_string()))
            });
            if let Some((key, value)) = parsed {
                header.fields.entry(key).or_insert(value);
            }
        }
        header
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> Classifier {
        Classifier::new(
            ["\t", ",", " ", "-", ";"].into_iter().map(Delimiter::new).collect(),
            20,
        )
    }

    fn entry(text: &str) -> ArtifactEntry {
        ArtifactEntry::new("file.txt", text.as_bytes().to_vec())
    }

    const REPORT: &str = "[Header]\nGSGT Version\t2.0.4\nContent\t\tBovineSNP50_v3.bpm\nNum Samples\t2\n[Data]\nSNP Name\tSample ID\tAllele1 - AB\tAllele2 - AB\nARS-BFGL-1\tS1\tA\tB\nARS-BFGL-1\tS2\t-\t-\n";

    #[test]
    fn final_report_is_detected_with_tab() {
        let c = classifier().classify(&entry(REPORT)).unwrap();
        assert_eq!(c.category, ArtifactCategory::Genotype);
        let layout = c.layout.unwrap();
        assert_eq!(layout.delimiter, Delimiter::tab());
        assert_eq!(layout.header_line, 5);
        assert_eq!(layout.column("Allele2 - AB"), Some(3));
        assert_eq!(c.header.content(), Some("BovineSNP50_v3.bpm"));
        assert_eq!(c.header.num_samples(), Some(2));
    }

    #[test]
    fn comma_report_header_uses_table_delimiter() {
        let text = "[Header]\nContent,Chip60.bpm\n[Data]\nSNP Name,Sample ID,Allele1 - AB,Allele2 - AB\nX1,S1,A,A\n";
        let c = classifier().classify(&entry(text)).unwrap();
        assert_eq!(c.layout.unwrap().delimiter, Delimiter::new(","));
        assert_eq!(c.header.content(), Some("Chip60.bpm"));
    }

    #[test]
    fn map_table_is_default_category() {
        let text = "Index;Name;Chromosome;Position\n1;SNP1;1;100\n2;SNP2;1;200\n";
        let c = classifier().classify(&entry(text)).unwrap();
        assert_eq!(c.category, ArtifactCategory::Map);
        let layout = c.layout.unwrap();
        assert_eq!(layout.delimiter, Delimiter::new(";"));
        assert_eq!(layout.column("Name"), Some(1));
    }

    #[test]
    fn header_without_data_is_a_chip_descriptor() {
        let text = "[Header]\nContent\tChip50.bpm\n";
        let c = classifier().classify(&entry(text)).unwrap();
        assert_eq!(c.category, ArtifactCategory::Chip);
        assert!(c.layout.is_none());
        assert_eq!(c.header.content(), Some("Chip50.bpm"));
    }

    #[test]
    fn inconsistent_rows_match_no_delimiter() {
        let text = "Index\tName\n1\tA\t\textra\n";
        let c = Classifier::new(vec![Delimiter::tab()], 20);
        assert_eq!(c.classify(&entry(text)), Err(ClassifyError::NoDelimiterMatch));
    }

    #[test]
    fn disagreeing_candidates_are_ambiguous() {
        let text = "Index,Name;Pos\n1,A;5\n";
        let c = Classifier::new(vec![Delimiter::new(","), Delimiter::new(";")], 20);
        assert!(matches!(c.classify(&entry(text)), Err(ClassifyError::AmbiguousFormat(_))));
    }

    #[test]
    fn key_column_breaks_ties() {
        // hyphen splits header and rows into three fields too, without "SNP Name"
        let text = "[Header]\n[Data]\nSNP Name\tSample ID\tAllele1 - AB\tAllele2 - AB\nARS-BFGL-1\tS1\tA\tB\nARS-BFGL-2\tS1\tB\tB\n";
        let c = classifier().classify(&entry(text)).unwrap();
        let layout = c.layout.unwrap();
        assert_eq!(layout.delimiter, Delimiter::tab());
        assert_eq!(layout.columns[0], "SNP Name");
    }

    #[test]
    fn empty_and_binary_content_is_rejected() {
        assert_eq!(classifier().classify(&entry("  \n\n")), Err(ClassifyError::Empty));
        let binary = ArtifactEntry::new("x", vec![0xff, 0xfe, 0x00]);
        assert_eq!(classifier().classify(&binary), Err(ClassifyError::Unreadable));
        assert_eq!(
            classifier().classify(&entry("[Header]\nContent\tX\n[Data]\n\n")),
            Err(ClassifyError::MissingHeader)
        );
    }
}
