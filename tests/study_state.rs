//! Study state persistence across store lifetimes.

use serde_json::json;
use studyvault::kv::{JsonStore, STATE_KEY};
use studyvault::store::{SettingsPatch, Task, TaskType};
use studyvault::{StudyStore, XpCredit};
use tempfile::TempDir;

fn task(start: &str) -> Task {
    Task {
        time_start: start.to_string(),
        time_end: "23:00".to_string(),
        activity: format!("Block at {start}"),
        subject: "Chemistry".to_string(),
        kind: TaskType::Revision,
        description: String::new(),
        completed: false,
        xp_awarded: false,
    }
}

#[test]
fn state_round_trips_through_disk() {
    let dir = TempDir::new().unwrap();
    {
        let mut store = StudyStore::load(JsonStore::new(dir.path()), 4).unwrap();
        store.set_routine(vec![task("08:00"), task("10:00")]).unwrap();
        store.toggle_task(1).unwrap();
        store
            .add_log_with_credit(
                "Physics",
                90,
                XpCredit {
                    task_completed: true,
                    accuracy_percent: 0.0,
                },
            )
            .unwrap();
        store
            .update_settings(SettingsPatch {
                wake_up_time: Some("05:15".to_string()),
                ..Default::default()
            })
            .unwrap();
        store.set_user_name("Kavya").unwrap();
    }

    let mut store = StudyStore::load(JsonStore::new(dir.path()), 4).unwrap();
    let snapshot = store.snapshot();
    assert_eq!(snapshot.user_name, "Kavya");
    assert_eq!(snapshot.xp, 120);
    assert_eq!(snapshot.settings.wake_up_time, "05:15");
    assert_eq!(store.progress_percent(), 50.0);

    // The restored task remembers its XP was already granted.
    store.toggle_task(1).unwrap();
    store.toggle_task(1).unwrap();
    assert_eq!(store.snapshot().xp, 120);
}

#[test]
fn persisted_json_omits_study_level() {
    let dir = TempDir::new().unwrap();
    let kv = JsonStore::new(dir.path());
    {
        let mut store = StudyStore::load(kv.clone(), 1).unwrap();
        store.add_log("Biology", 60).unwrap();
    }
    let raw: serde_json::Value = kv.get(STATE_KEY).unwrap().unwrap();
    assert!(raw.get("studyLevel").is_none());
    assert_eq!(raw["xp"], 40);
    assert_eq!(raw["logs"][0]["durationMinutes"], 60);
}

#[test]
fn corrupt_field_keeps_the_rest() {
    let dir = TempDir::new().unwrap();
    let kv = JsonStore::new(dir.path());
    kv.put(
        STATE_KEY,
        &json!({
            "userName": "Ishaan",
            "streak": 9,
            "xp": "lots",
            "logs": [{"date": "2026-05-01T00:00:00Z", "subject": "Physics", "durationMinutes": 45}],
            "settings": "dark"
        }),
    )
    .unwrap();

    let store = StudyStore::load(kv, 1).unwrap();
    let snapshot = store.snapshot();
    assert_eq!(snapshot.user_name, "Ishaan");
    assert_eq!(snapshot.streak, 9);
    assert_eq!(snapshot.xp, 0);
    assert_eq!(snapshot.logs.len(), 1);
    assert_eq!(snapshot.settings.daily_goal, 6);
}

#[test]
fn unparseable_snapshot_starts_fresh() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("study_state.json"), b"{{{").unwrap();
    let store = StudyStore::load(JsonStore::new(dir.path()), 1).unwrap();
    assert_eq!(store.study_level(), 1);
    assert_eq!(store.progress_percent(), 0.0);
}
