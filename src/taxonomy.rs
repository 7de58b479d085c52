//! Subject → class level → unit → chapter hierarchy.
//!
//! The hierarchy is seeded from a static syllabus. Resource links and
//! chapters added at runtime are the only mutable parts; both are persisted
//! through [`JsonStore`] and replayed onto the seed at load time.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StudyVaultError};
use crate::kv::{CUSTOM_CHAPTERS_KEY, JsonStore, RESOURCES_KEY};

// ── Subject ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Subject {
    Physics,
    Chemistry,
    Biology,
}

impl Subject {
    pub const ALL: [Subject; 3] = [Self::Physics, Self::Chemistry, Self::Biology];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Physics => "Physics",
            Self::Chemistry => "Chemistry",
            Self::Biology => "Biology",
        }
    }

    /// Case-insensitive parse of a subject name.
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|s| s.as_str().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Resource links ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceKind {
    #[serde(rename = "NCERT_PDF")]
    NcertPdf,
    Notes,
    #[serde(rename = "PYQ")]
    Pyq,
    #[serde(rename = "Formula_Sheet")]
    FormulaSheet,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceLink {
    pub file_name: String,
    pub file_type: ResourceKind,
    pub upload_date: String,
}

// ── Hierarchy ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    pub id: String,
    pub name: String,
    pub resource_links: Vec<ResourceLink>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub name: String,
    pub chapters: Vec<Chapter>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassLevel {
    pub level: u8,
    pub units: Vec<Unit>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectTree {
    pub subject: Subject,
    pub class_levels: Vec<ClassLevel>,
}

/// A chapter matched by name, tagged with where it lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterMatch {
    pub id: String,
    pub name: String,
    pub subject: Subject,
    pub class_level: u8,
    pub unit: String,
}

#[derive(Debug, Clone, Copy)]
pub struct ChapterLocation<'a> {
    pub subject: Subject,
    pub class_level: u8,
    pub unit: &'a str,
    pub chapter: &'a Chapter,
}

/// Flattened `{id, name, subject}` entry handed to the categorization oracle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChapterRef {
    pub id: String,
    pub name: String,
    pub subject: Subject,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CustomChapter {
    id: String,
    subject: Subject,
    unit: String,
    name: String,
}

// ── Index ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct TaxonomyIndex {
    subjects: Vec<SubjectTree>,
    custom: Vec<CustomChapter>,
}

impl Default for TaxonomyIndex {
    fn default() -> Self {
        Self::seeded()
    }
}

impl TaxonomyIndex {
    pub fn seeded() -> Self {
        Self {
            subjects: seed_syllabus(),
            custom: Vec::new(),
        }
    }

    /// Seed hierarchy with persisted custom chapters and resource links applied.
    pub fn load(store: &JsonStore) -> Result<Self> {
        let mut index = Self::seeded();

        match store.get::<Vec<CustomChapter>>(CUSTOM_CHAPTERS_KEY) {
            Ok(Some(custom)) => {
                for entry in custom {
                    if index.insert_chapter(entry.subject, &entry.unit, &entry.id, &entry.name) {
                        index.custom.push(entry);
                    } else {
                        tracing::warn!(target: "studyvault::taxonomy", id = %entry.id, "dropping custom chapter with no class level");
                    }
                }
            }
            Ok(None) => {}
            Err(StudyVaultError::Json(err)) => {
                tracing::warn!(target: "studyvault::taxonomy", error = %err, "discarding malformed custom chapters");
            }
            Err(err) => return Err(err),
        }

        match store.get::<BTreeMap<String, Vec<ResourceLink>>>(RESOURCES_KEY) {
            Ok(Some(map)) => index.rehydrate_resources(&map),
            Ok(None) => {}
            Err(StudyVaultError::Json(err)) => {
                tracing::warn!(target: "studyvault::taxonomy", error = %err, "discarding malformed resource links");
            }
            Err(err) => return Err(err),
        }

        Ok(index)
    }

    pub fn persist(&self, store: &JsonStore) -> Result<()> {
        store.put(RESOURCES_KEY, &self.resource_map())?;
        store.put(CUSTOM_CHAPTERS_KEY, &self.custom)?;
        Ok(())
    }

    pub fn subjects(&self) -> &[SubjectTree] {
        &self.subjects
    }

    pub fn subject(&self, subject: Subject) -> Option<&SubjectTree> {
        self.subjects.iter().find(|s| s.subject == subject)
    }

    fn locations(&self) -> impl Iterator<Item = ChapterLocation<'_>> {
        self.subjects.iter().flat_map(|tree| {
            tree.class_levels.iter().flat_map(move |class| {
                class.units.iter().flat_map(move |unit| {
                    unit.chapters.iter().map(move |chapter| ChapterLocation {
                        subject: tree.subject,
                        class_level: class.level,
                        unit: &unit.name,
                        chapter,
                    })
                })
            })
        })
    }

    fn chapter_mut(&mut self, id: &str) -> Option<&mut Chapter> {
        self.subjects
            .iter_mut()
            .flat_map(|tree| tree.class_levels.iter_mut())
            .flat_map(|class| class.units.iter_mut())
            .flat_map(|unit| unit.chapters.iter_mut())
            .find(|chapter| chapter.id == id)
    }

    pub fn find_chapter(&self, id: &str) -> Option<ChapterLocation<'_>> {
        self.locations().find(|loc| loc.chapter.id == id)
    }

    /// Case-insensitive substring match on chapter names, in hierarchy order.
    pub fn search(&self, term: &str) -> Vec<ChapterMatch> {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return Vec::new();
        }
        self.locations()
            .filter(|loc| loc.chapter.name.to_lowercase().contains(&term))
            .map(|loc| ChapterMatch {
                id: loc.chapter.id.clone(),
                name: loc.chapter.name.clone(),
                subject: loc.subject,
                class_level: loc.class_level,
                unit: loc.unit.to_string(),
            })
            .collect()
    }

    pub fn all_chapters(&self) -> Vec<ChapterRef> {
        self.locations()
            .map(|loc| ChapterRef {
                id: loc.chapter.id.clone(),
                name: loc.chapter.name.clone(),
                subject: loc.subject,
            })
            .collect()
    }

    /// Returns `false` when no chapter carries `chapter_id`.
    pub fn append_resource(&mut self, chapter_id: &str, link: ResourceLink) -> bool {
        match self.chapter_mut(chapter_id) {
            Some(chapter) => {
                chapter.resource_links.push(link);
                true
            }
            None => {
                tracing::debug!(target: "studyvault::taxonomy", chapter_id, "resource link for unknown chapter");
                false
            }
        }
    }

    /// Adds a chapter under the first unit named `unit_name` (any class level
    /// of `subject`), or under a new unit in the subject's first class level.
    /// Returns the generated chapter id, `None` if the subject has no levels.
    pub fn add_chapter(
        &mut self,
        subject: Subject,
        unit_name: &str,
        chapter_name: &str,
    ) -> Option<String> {
        let id = format!("CUST_{}", uuid::Uuid::new_v4().simple());
        if !self.insert_chapter(subject, unit_name, &id, chapter_name) {
            return None;
        }
        self.custom.push(CustomChapter {
            id: id.clone(),
            subject,
            unit: unit_name.to_string(),
            name: chapter_name.to_string(),
        });
        Some(id)
    }

    fn insert_chapter(&mut self, subject: Subject, unit_name: &str, id: &str, name: &str) -> bool {
        if self.find_chapter(id).is_some() {
            return true;
        }
        let Some(tree) = self.subjects.iter_mut().find(|s| s.subject == subject) else {
            return false;
        };
        let chapter = Chapter {
            id: id.to_string(),
            name: name.to_string(),
            resource_links: Vec::new(),
        };

        let existing = tree
            .class_levels
            .iter_mut()
            .flat_map(|class| class.units.iter_mut())
            .find(|unit| unit.name.to_lowercase() == unit_name.to_lowercase());
        if let Some(unit) = existing {
            unit.chapters.push(chapter);
            return true;
        }

        match tree.class_levels.first_mut() {
            Some(class) => {
                class.units.push(Unit {
                    name: unit_name.to_string(),
                    chapters: vec![chapter],
                });
                true
            }
            None => false,
        }
    }

    pub fn links_for_chapter(&self, chapter_id: &str) -> &[ResourceLink] {
        self.find_chapter(chapter_id)
            .map(|loc| loc.chapter.resource_links.as_slice())
            .unwrap_or_default()
    }

    /// Non-empty resource link lists keyed by chapter id.
    pub fn resource_map(&self) -> BTreeMap<String, Vec<ResourceLink>> {
        self.locations()
            .filter(|loc| !loc.chapter.resource_links.is_empty())
            .map(|loc| (loc.chapter.id.clone(), loc.chapter.resource_links.clone()))
            .collect()
    }

    pub fn rehydrate_resources(&mut self, map: &BTreeMap<String, Vec<ResourceLink>>) {
        for (id, links) in map {
            if let Some(chapter) = self.chapter_mut(id) {
                chapter.resource_links = links.clone();
            }
        }
    }
}

// ── Seed syllabus ────────────────────────────────────────────────────────

fn chapter(id: &str, name: &str) -> Chapter {
    Chapter {
        id: id.to_string(),
        name: name.to_string(),
        resource_links: Vec::new(),
    }
}

fn unit(name: &str, chapters: Vec<Chapter>) -> Unit {
    Unit {
        name: name.to_string(),
        chapters,
    }
}

fn seed_syllabus() -> Vec<SubjectTree> {
    vec![
        SubjectTree {
            subject: Subject::Physics,
            class_levels: vec![
                ClassLevel {
                    level: 11,
                    units: vec![
                        unit(
                            "Kinematics",
                            vec![
                                chapter("PHY_11_01", "Motion in a Straight Line"),
                                chapter("PHY_11_02", "Motion in a Plane"),
                            ],
                        ),
                        unit("Laws of Motion", vec![chapter("PHY_11_03", "Laws of Motion")]),
                        unit(
                            "Work, Energy and Power",
                            vec![chapter("PHY_11_04", "Work, Energy and Power")],
                        ),
                    ],
                },
                ClassLevel {
                    level: 12,
                    units: vec![
                        unit(
                            "Electrostatics",
                            vec![
                                chapter("PHY_12_01", "Electric Charges and Fields"),
                                chapter("PHY_12_02", "Electrostatic Potential and Capacitance"),
                            ],
                        ),
                        unit(
                            "Current Electricity",
                            vec![chapter("PHY_12_03", "Current Electricity")],
                        ),
                    ],
                },
            ],
        },
        SubjectTree {
            subject: Subject::Chemistry,
            class_levels: vec![
                ClassLevel {
                    level: 11,
                    units: vec![
                        unit("Structure of Atom", vec![chapter("CHE_11_01", "Structure of Atom")]),
                        unit(
                            "Chemical Bonding",
                            vec![chapter("CHE_11_02", "Chemical Bonding and Molecular Structure")],
                        ),
                        unit("Thermodynamics", vec![chapter("CHE_11_03", "Thermodynamics")]),
                    ],
                },
                ClassLevel {
                    level: 12,
                    units: vec![
                        unit("Solutions", vec![chapter("CHE_12_01", "Solutions")]),
                        unit("Electrochemistry", vec![chapter("CHE_12_02", "Electrochemistry")]),
                        unit("Chemical Kinetics", vec![chapter("CHE_12_03", "Chemical Kinetics")]),
                    ],
                },
            ],
        },
        SubjectTree {
            subject: Subject::Biology,
            class_levels: vec![
                ClassLevel {
                    level: 11,
                    units: vec![
                        unit(
                            "Diversity in Living World",
                            vec![
                                chapter("BIO_11_01", "The Living World"),
                                chapter("BIO_11_02", "Biological Classification"),
                                chapter("BIO_11_03", "Plant Kingdom"),
                                chapter("BIO_11_04", "Animal Kingdom"),
                            ],
                        ),
                        unit(
                            "Human Physiology",
                            vec![
                                chapter("BIO_11_05", "Breathing and Exchange of Gases"),
                                chapter("BIO_11_06", "Body Fluids and Circulation"),
                            ],
                        ),
                    ],
                },
                ClassLevel {
                    level: 12,
                    units: vec![
                        unit(
                            "Reproduction",
                            vec![
                                chapter("BIO_12_01", "Sexual Reproduction in Flowering Plants"),
                                chapter("BIO_12_02", "Human Reproduction"),
                                chapter("BIO_12_03", "Reproductive Health"),
                            ],
                        ),
                        unit(
                            "Genetics and Evolution",
                            vec![
                                chapter("BIO_12_04", "Principles of Inheritance and Variation"),
                                chapter("BIO_12_05", "Molecular Basis of Inheritance"),
                            ],
                        ),
                    ],
                },
            ],
        },
    ]
}
