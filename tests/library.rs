//! End-to-end flows over the taxonomy, vault and upload pipeline.

use studyvault::extract::EXTRACTION_FAILED_TEXT;
use studyvault::kv::JsonStore;
use studyvault::taxonomy::ResourceKind;
use studyvault::{
    Category, Library, ResourceLink, Subject, TaxonomyIndex, UploadRequest, Vault, upload,
};
use tempfile::TempDir;

fn text_upload(chapter: &str, category: Category, name: &str, body: &str) -> UploadRequest {
    UploadRequest {
        chapter_id: chapter.to_string(),
        category,
        file_name: name.to_string(),
        file_type: "text/plain".to_string(),
        bytes: body.as_bytes().to_vec(),
    }
}

#[tokio::test]
async fn upload_then_view_chapter() {
    let dir = TempDir::new().unwrap();
    let vault = Vault::open(&dir.path().join("vault.sqlite")).unwrap();
    let taxonomy = TaxonomyIndex::seeded();

    let hits = taxonomy.search("plant");
    let plant = hits.iter().find(|h| h.name == "Plant Kingdom").unwrap();
    assert_eq!(plant.subject, Subject::Biology);

    let notes = upload(
        &vault,
        text_upload(&plant.id, Category::Notes, "algae-notes.txt", "Algae are thalloid"),
    )
    .await
    .unwrap();
    upload(
        &vault,
        text_upload(&plant.id, Category::Pyq, "pyq-2024.txt", "Q1. Which is a bryophyte?"),
    )
    .await
    .unwrap();

    let library = Library::new(&taxonomy, &vault);
    let detail = library.chapter_detail(&plant.id).await.unwrap().unwrap();
    assert_eq!(detail.name, "Plant Kingdom");
    assert_eq!(detail.unit, "Diversity in Living World");
    assert_eq!(detail.files.len(), 2);

    let only_notes = library
        .chapter_files(&plant.id, Some(Category::Notes), None)
        .await
        .unwrap();
    assert_eq!(only_notes, vec![notes.file]);

    let by_name = library
        .chapter_files(&plant.id, None, Some("PYQ"))
        .await
        .unwrap();
    assert_eq!(by_name.len(), 1);
    assert_eq!(by_name[0].file_name, "pyq-2024.txt");
}

#[tokio::test]
async fn unknown_chapter_detail_is_none() {
    let vault = Vault::open_in_memory().unwrap();
    let taxonomy = TaxonomyIndex::seeded();
    let library = Library::new(&taxonomy, &vault);
    assert!(library.chapter_detail("NOPE").await.unwrap().is_none());
    assert!(library.search_chapters("zzz").is_empty());
}

#[tokio::test]
async fn analysis_text_is_bounded() {
    let vault = Vault::open_in_memory().unwrap();
    let taxonomy = TaxonomyIndex::seeded();
    let body = "photosynthesis ".repeat(100);
    upload(&vault, text_upload("BIO_11_03", Category::Notes, "a.txt", &body))
        .await
        .unwrap();
    upload(
        &vault,
        UploadRequest {
            file_type: "application/pdf".to_string(),
            bytes: b"not a pdf".to_vec(),
            ..text_upload("BIO_11_03", Category::Notes, "broken.pdf", "")
        },
    )
    .await
    .unwrap();

    let library = Library::new(&taxonomy, &vault);
    let text = library.analysis_text("BIO_11_03", 50).await.unwrap();
    assert!(text.len() <= 50);

    let full = library.analysis_text("BIO_11_03", 1_000_000).await.unwrap();
    assert!(full.contains(EXTRACTION_FAILED_TEXT));
    assert!(full.contains("photosynthesis"));
}

#[tokio::test]
async fn delete_twice_never_errors() {
    let vault = Vault::open_in_memory().unwrap();
    let outcome = upload(
        &vault,
        text_upload("PHY_11_03", Category::Formula, "f.txt", "F = ma"),
    )
    .await
    .unwrap();
    vault.delete(&outcome.file.id).await.unwrap();
    vault.delete(&outcome.file.id).await.unwrap();
    assert!(vault.get_by_chapter("PHY_11_03").await.unwrap().is_empty());
}

#[test]
fn taxonomy_state_persists_across_restart() {
    let dir = TempDir::new().unwrap();
    let store = JsonStore::new(dir.path());

    let mut taxonomy = TaxonomyIndex::load(&store).unwrap();
    let id = taxonomy
        .add_chapter(Subject::Physics, "Optics", "Ray Optics")
        .unwrap();
    assert!(taxonomy.append_resource(
        "PHY_12_01",
        ResourceLink {
            file_name: "coulomb.pdf".to_string(),
            file_type: ResourceKind::NcertPdf,
            upload_date: "2026-04-01T08:00:00Z".to_string(),
        },
    ));
    taxonomy.persist(&store).unwrap();
    drop(taxonomy);

    let reloaded = TaxonomyIndex::load(&store).unwrap();
    assert_eq!(reloaded.links_for_chapter("PHY_12_01").len(), 1);
    let hits = reloaded.search("ray optics");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, id);
    assert_eq!(hits[0].class_level, 11);
}
