use studyvault::taxonomy::{ChapterMatch, SubjectTree};
use studyvault::{ChapterDetail, StoredFile, StudyView};

pub(crate) fn files(files: &[StoredFile]) {
    if files.is_empty() {
        println!("No files.");
    }
    for f in files {
        println!(
            "{}  [{}]  {}  {} bytes  {}",
            f.id, f.category, f.file_name, f.size_bytes, f.upload_date
        );
    }
}

pub(crate) fn matches(hits: &[ChapterMatch]) {
    for hit in hits {
        println!(
            "{}  {}  ({} {}, {})",
            hit.id, hit.name, hit.subject, hit.class_level, hit.unit
        );
    }
}

pub(crate) fn tree(tree: &SubjectTree) {
    for class in &tree.class_levels {
        println!("{} Class {}", tree.subject, class.level);
        for unit in &class.units {
            println!("  {}", unit.name);
            for chapter in &unit.chapters {
                println!(
                    "    {}  {}  ({} links)",
                    chapter.id,
                    chapter.name,
                    chapter.resource_links.len()
                );
            }
        }
    }
}

pub(crate) fn detail(detail: &ChapterDetail) {
    println!(
        "{}  {}  ({} {}, {})",
        detail.id, detail.name, detail.subject, detail.class_level, detail.unit
    );
    for link in &detail.resource_links {
        println!("  link  {}  {:?}  {}", link.file_name, link.file_type, link.upload_date);
    }
    files(&detail.files);
}

pub(crate) fn status(view: &StudyView) {
    println!(
        "{}: level {} {} ({} XP)",
        view.user_name, view.study_level, view.level_title, view.xp
    );
    println!("streak={} days  study hours={}", view.streak, view.total_study_hours);
    println!(
        "routine {}/{} ({:.0}%)",
        view.completed_tasks, view.total_tasks, view.progress_percent
    );
}
