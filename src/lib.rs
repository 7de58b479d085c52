//! Client-resident data layer for a study planner: a durable vault of
//! uploaded study files, best-effort text extraction, the syllabus
//! taxonomy, and the study session state container.

pub mod config;
pub mod error;
pub mod extract;
pub mod kv;
pub mod oracle;
pub mod search;
pub mod store;
pub mod taxonomy;
pub mod upload;
pub mod vault;

pub use error::{Result, StudyVaultError};
pub use extract::{Extraction, extract};
pub use kv::JsonStore;
pub use search::{ChapterDetail, Library};
pub use store::{StudySnapshot, StudyStore, StudyView, XpCredit};
pub use taxonomy::{ChapterMatch, ResourceLink, Subject, TaxonomyIndex};
pub use upload::{UploadOutcome, UploadRequest, upload};
pub use vault::{Category, StoredFile, Vault};
