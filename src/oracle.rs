//! Interfaces of the AI collaborators the data layer feeds.
//!
//! Both oracles are opaque: the core neither retries them nor judges their
//! confidence. It only prepares their inputs and resolves their answers
//! against the taxonomy.

use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

use crate::error::Result;
use crate::taxonomy::{ChapterLocation, ChapterRef, TaxonomyIndex};
use crate::vault::StoredFile;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Categorization {
    pub chapter_id: String,
    /// 0..=1 as reported by the oracle.
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub mastery_percentage: f64,
    #[serde(default)]
    pub missing_concepts: Vec<String>,
    #[serde(default)]
    pub quiz: Vec<serde_json::Value>,
}

pub trait Categorizer: Send + Sync {
    fn categorize(&self, file_name: &str, context: &[ChapterRef]) -> Result<Categorization>;
}

pub trait ContentAnalyzer: Send + Sync {
    fn analyze(&self, aggregated_text: &str, chapter_name: &str) -> Result<HealthReport>;
}

/// Largest prefix of `s` no longer than `limit` bytes that ends on a
/// grapheme boundary.
pub fn truncate_at_grapheme_boundary(s: &str, limit: usize) -> &str {
    if s.len() <= limit {
        return s;
    }
    let mut end = 0usize;
    for (idx, grapheme) in s.grapheme_indices(true) {
        let next = idx + grapheme.len();
        if next > limit {
            break;
        }
        end = next;
    }
    &s[..end]
}

/// Extracted texts joined by blank lines, bounded to `limit` bytes.
pub fn analysis_input(files: &[StoredFile], limit: usize) -> String {
    let joined = files
        .iter()
        .map(|f| f.extracted_text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");
    truncate_at_grapheme_boundary(&joined, limit).to_string()
}

/// Ask the oracle for a chapter and map the answer onto the taxonomy.
/// `None` when the oracle names a chapter that does not exist.
pub fn categorize_upload<'a>(
    oracle: &dyn Categorizer,
    taxonomy: &'a TaxonomyIndex,
    file_name: &str,
) -> Result<Option<(ChapterLocation<'a>, f64)>> {
    let answer = oracle.categorize(file_name, &taxonomy.all_chapters())?;
    Ok(resolve_categorization(taxonomy, &answer).map(|loc| (loc, answer.confidence)))
}

pub fn resolve_categorization<'a>(
    taxonomy: &'a TaxonomyIndex,
    answer: &Categorization,
) -> Option<ChapterLocation<'a>> {
    let found = taxonomy.find_chapter(&answer.chapter_id);
    if found.is_none() {
        tracing::debug!(target: "studyvault::oracle", chapter_id = %answer.chapter_id, "categorizer named an unknown chapter");
    }
    found
}

pub fn analyze_chapter(
    analyzer: &dyn ContentAnalyzer,
    files: &[StoredFile],
    chapter_name: &str,
    limit: usize,
) -> Result<HealthReport> {
    analyzer.analyze(&analysis_input(files, limit), chapter_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::Subject;
    use crate::vault::Category;

    struct FixedCategorizer(&'static str, f64);

    impl Categorizer for FixedCategorizer {
        fn categorize(&self, _file_name: &str, context: &[ChapterRef]) -> Result<Categorization> {
            assert!(!context.is_empty());
            Ok(Categorization {
                chapter_id: self.0.to_string(),
                confidence: self.1,
            })
        }
    }

    struct LengthAnalyzer;

    impl ContentAnalyzer for LengthAnalyzer {
        fn analyze(&self, text: &str, chapter_name: &str) -> Result<HealthReport> {
            Ok(HealthReport {
                mastery_percentage: text.len() as f64,
                missing_concepts: vec![chapter_name.to_string()],
                quiz: Vec::new(),
            })
        }
    }

    fn file(text: &str) -> StoredFile {
        StoredFile {
            id: "f".to_string(),
            chapter_id: "BIO_11_03".to_string(),
            category: Category::Notes,
            file_name: "n.txt".to_string(),
            file_type: "text/plain".to_string(),
            upload_date: "2026-01-01T00:00:00Z".to_string(),
            extracted_text: text.to_string(),
            size_bytes: text.len() as u64,
        }
    }

    #[test]
    fn truncation_respects_graphemes() {
        assert_eq!(truncate_at_grapheme_boundary("abc", 10), "abc");
        // "é" as e + combining acute is one grapheme of 3 bytes.
        let s = "ae\u{301}z";
        assert_eq!(truncate_at_grapheme_boundary(s, 2), "a");
        assert_eq!(truncate_at_grapheme_boundary(s, 4), "ae\u{301}");
    }

    #[test]
    fn analysis_input_joins_and_bounds() {
        let files = vec![file("alpha"), file("beta")];
        assert_eq!(analysis_input(&files, 1000), "alpha\n\nbeta");
        assert_eq!(analysis_input(&files, 7), "alpha\n\n");
    }

    #[test]
    fn low_confidence_is_passed_through() {
        let taxonomy = TaxonomyIndex::seeded();
        let (loc, confidence) =
            categorize_upload(&FixedCategorizer("BIO_11_03", 0.05), &taxonomy, "algae.pdf")
                .unwrap()
                .unwrap();
        assert_eq!(loc.subject, Subject::Biology);
        assert!((confidence - 0.05).abs() < f64::EPSILON);
    }

    #[test]
    fn unknown_chapter_is_none() {
        let taxonomy = TaxonomyIndex::seeded();
        let out = categorize_upload(&FixedCategorizer("XYZ_99", 0.99), &taxonomy, "x.pdf").unwrap();
        assert!(out.is_none());
    }

    #[test]
    fn analyzer_receives_bounded_text() {
        let files = vec![file(&"x".repeat(500))];
        let report = analyze_chapter(&LengthAnalyzer, &files, "Plant Kingdom", 100).unwrap();
        assert_eq!(report.mastery_percentage, 100.0);
        assert_eq!(report.missing_concepts, vec!["Plant Kingdom".to_string()]);
    }
}
