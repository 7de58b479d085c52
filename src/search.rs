//! Read-only queries composed over the taxonomy and the vault.

use serde::Serialize;

use crate::error::Result;
use crate::oracle::analysis_input;
use crate::taxonomy::{ChapterMatch, ResourceLink, Subject, TaxonomyIndex};
use crate::vault::{Category, StoredFile, Vault};

pub struct Library<'a> {
    taxonomy: &'a TaxonomyIndex,
    vault: &'a Vault,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterDetail {
    pub id: String,
    pub name: String,
    pub subject: Subject,
    pub class_level: u8,
    pub unit: String,
    pub resource_links: Vec<ResourceLink>,
    pub files: Vec<StoredFile>,
}

impl<'a> Library<'a> {
    pub fn new(taxonomy: &'a TaxonomyIndex, vault: &'a Vault) -> Self {
        Self { taxonomy, vault }
    }

    pub fn search_chapters(&self, term: &str) -> Vec<ChapterMatch> {
        self.taxonomy.search(term)
    }

    /// Files in a chapter, optionally narrowed to one category and to file
    /// names containing `name_filter` (case-insensitive). Sorted by upload
    /// date, newest first.
    pub async fn chapter_files(
        &self,
        chapter_id: &str,
        category: Option<Category>,
        name_filter: Option<&str>,
    ) -> Result<Vec<StoredFile>> {
        let mut files = match category {
            Some(category) => {
                self.vault
                    .get_by_chapter_and_category(chapter_id, category)
                    .await?
            }
            None => self.vault.get_by_chapter(chapter_id).await?,
        };
        if let Some(term) = name_filter.map(str::trim).filter(|t| !t.is_empty()) {
            let term = term.to_lowercase();
            files.retain(|f| f.file_name.to_lowercase().contains(&term));
        }
        files.sort_by(|a, b| b.upload_date.cmp(&a.upload_date));
        Ok(files)
    }

    /// `None` when the chapter id is not in the taxonomy.
    pub async fn chapter_detail(&self, chapter_id: &str) -> Result<Option<ChapterDetail>> {
        let Some(loc) = self.taxonomy.find_chapter(chapter_id) else {
            return Ok(None);
        };
        let files = self.chapter_files(chapter_id, None, None).await?;
        Ok(Some(ChapterDetail {
            id: loc.chapter.id.clone(),
            name: loc.chapter.name.clone(),
            subject: loc.subject,
            class_level: loc.class_level,
            unit: loc.unit.to_string(),
            resource_links: loc.chapter.resource_links.clone(),
            files,
        }))
    }

    /// Aggregated extracted text for the content-analysis oracle.
    pub async fn analysis_text(&self, chapter_id: &str, limit: usize) -> Result<String> {
        let files = self.vault.get_by_chapter(chapter_id).await?;
        Ok(analysis_input(&files, limit))
    }
}
