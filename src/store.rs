//! Study session state: routine, logs, mistakes, settings and XP.
//!
//! [`StudyStore`] is the single writer. Mutations mark the state dirty and
//! the snapshot is written once `flush_every` mutations are pending, on an
//! explicit [`StudyStore::flush`], or when the store is dropped. Dependents
//! observe derived values through a `watch` channel.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::watch;

use crate::error::Result;
use crate::kv::{JsonStore, STATE_KEY};

pub const DEFAULT_USER_NAME: &str = "Aspirant";
pub const XP_PER_LEVEL: u64 = 100;

const HOURS_WEIGHT: f64 = 0.4;
const TASK_WEIGHT: f64 = 0.3;
const ACCURACY_WEIGHT: f64 = 0.3;

// ── Persisted types ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskType {
    Study,
    Break,
    Revision,
    MockTest,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub time_start: String,
    pub time_end: String,
    pub activity: String,
    pub subject: String,
    #[serde(rename = "type")]
    pub kind: TaskType,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub completed: bool,
    /// Set on the first completion; completion XP is never granted twice.
    #[serde(default, rename = "xpAwarded")]
    pub xp_awarded: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyLog {
    pub date: String,
    pub subject: String,
    pub duration_minutes: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MistakeEntry {
    pub id: String,
    pub chapter_id: String,
    pub date: String,
    pub question_text: String,
    #[serde(default)]
    pub analysis: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Chronotype {
    #[default]
    EarlyBird,
    NightOwl,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserSettings {
    pub wake_up_time: String,
    /// Hours.
    pub daily_goal: u32,
    pub dark_mode: bool,
    pub chronotype: Chronotype,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            wake_up_time: "06:00".to_string(),
            daily_goal: 6,
            dark_mode: false,
            chronotype: Chronotype::EarlyBird,
        }
    }
}

/// Partial settings update; absent fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsPatch {
    pub wake_up_time: Option<String>,
    pub daily_goal: Option<u32>,
    pub dark_mode: Option<bool>,
    pub chronotype: Option<Chronotype>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudySnapshot {
    pub user_name: String,
    pub streak: u32,
    pub streak_freezes: u32,
    pub xp: u64,
    pub daily_routine: Vec<Task>,
    pub logs: Vec<StudyLog>,
    pub mistake_log: Vec<MistakeEntry>,
    pub settings: UserSettings,
}

impl Default for StudySnapshot {
    fn default() -> Self {
        Self {
            user_name: DEFAULT_USER_NAME.to_string(),
            streak: 0,
            streak_freezes: 0,
            xp: 0,
            daily_routine: Vec::new(),
            logs: Vec::new(),
            mistake_log: Vec::new(),
            settings: UserSettings::default(),
        }
    }
}

impl StudySnapshot {
    /// Decode each field independently; a missing or malformed field takes
    /// its default without discarding the others.
    pub fn from_json_lenient(value: &Value) -> Self {
        let defaults = Self::default();
        let Some(obj) = value.as_object() else {
            tracing::warn!(target: "studyvault::store", "snapshot is not an object, using defaults");
            return defaults;
        };
        let field = |key: &str| obj.get(key).filter(|v| !v.is_null());

        let user_name = lenient::<String>(field("userName"), "userName")
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(defaults.user_name);

        let xp = lenient::<u64>(field("xp"), "xp").unwrap_or_else(|| {
            lenient::<u64>(field("studyLevel"), "studyLevel")
                .map(|level| level.saturating_sub(1) * XP_PER_LEVEL)
                .unwrap_or(0)
        });

        Self {
            user_name,
            streak: lenient(field("streak"), "streak").unwrap_or(defaults.streak),
            streak_freezes: lenient(field("streakFreezes"), "streakFreezes")
                .unwrap_or(defaults.streak_freezes),
            xp,
            daily_routine: lenient(field("dailyRoutine"), "dailyRoutine")
                .unwrap_or(defaults.daily_routine),
            logs: lenient(field("logs"), "logs").unwrap_or(defaults.logs),
            mistake_log: lenient(field("mistakeLog"), "mistakeLog")
                .unwrap_or(defaults.mistake_log),
            settings: lenient(field("settings"), "settings").unwrap_or(defaults.settings),
        }
    }
}

fn lenient<T: DeserializeOwned>(value: Option<&Value>, name: &str) -> Option<T> {
    let value = value?;
    match serde_json::from_value(value.clone()) {
        Ok(v) => Some(v),
        Err(err) => {
            tracing::warn!(target: "studyvault::store", field = name, error = %err, "malformed snapshot field, using default");
            None
        }
    }
}

// ── Derived values ───────────────────────────────────────────────────────

pub fn study_level(xp: u64) -> u64 {
    xp / XP_PER_LEVEL + 1
}

pub fn level_title(level: u64) -> &'static str {
    match level {
        0..=4 => "Novice",
        5..=14 => "Scholar",
        15..=29 => "Expert",
        _ => "Bio-Master",
    }
}

/// Percentage of completed tasks, exactly `0.0` for an empty routine.
pub fn progress_percent(tasks: &[Task]) -> f64 {
    if tasks.is_empty() {
        return 0.0;
    }
    let done = tasks.iter().filter(|t| t.completed).count();
    done as f64 / tasks.len() as f64 * 100.0
}

/// Context that earns XP beyond study time.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct XpCredit {
    pub task_completed: bool,
    /// 0..=100; values outside are clamped.
    pub accuracy_percent: f64,
}

/// `floor(hours*100*0.4 + [task]*100*0.3 + accuracy/100*100*0.3)`.
pub fn xp_gain(minutes: u32, credit: XpCredit) -> u64 {
    let hours_score = (f64::from(minutes) / 60.0) * 100.0 * HOURS_WEIGHT;
    let task_score = if credit.task_completed {
        100.0 * TASK_WEIGHT
    } else {
        0.0
    };
    let accuracy = if credit.accuracy_percent.is_finite() {
        credit.accuracy_percent.clamp(0.0, 100.0)
    } else {
        0.0
    };
    let accuracy_score = (accuracy / 100.0) * 100.0 * ACCURACY_WEIGHT;
    // Absorb binary rounding so exact integers do not floor to n-1.
    (hours_score + task_score + accuracy_score + 1e-9).floor() as u64
}

/// Derived view broadcast to observers after every mutation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyView {
    pub user_name: String,
    pub xp: u64,
    pub study_level: u64,
    pub level_title: &'static str,
    pub streak: u32,
    pub progress_percent: f64,
    pub completed_tasks: usize,
    pub total_tasks: usize,
    pub total_study_hours: u64,
}

impl StudyView {
    fn of(state: &StudySnapshot) -> Self {
        let level = study_level(state.xp);
        let minutes: u64 = state.logs.iter().map(|l| u64::from(l.duration_minutes)).sum();
        Self {
            user_name: state.user_name.clone(),
            xp: state.xp,
            study_level: level,
            level_title: level_title(level),
            streak: state.streak,
            progress_percent: progress_percent(&state.daily_routine),
            completed_tasks: state.daily_routine.iter().filter(|t| t.completed).count(),
            total_tasks: state.daily_routine.len(),
            total_study_hours: minutes / 60,
        }
    }
}

fn is_padded_hhmm(time: &str) -> bool {
    let b = time.as_bytes();
    b.len() == 5
        && b[2] == b':'
        && [0, 1, 3, 4].iter().all(|&i| b[i].is_ascii_digit())
}

// ═════════════════════════════════════════════════════════════════════════
// StudyStore
// ═════════════════════════════════════════════════════════════════════════

pub struct StudyStore {
    state: StudySnapshot,
    store: JsonStore,
    flush_every: usize,
    pending: usize,
    view_tx: watch::Sender<StudyView>,
}

impl StudyStore {
    /// Load the persisted snapshot, or start from defaults on first run.
    pub fn load(store: JsonStore, flush_every: usize) -> Result<Self> {
        let state = match store.get_raw(STATE_KEY)? {
            Some(raw) => match serde_json::from_str::<Value>(&raw) {
                Ok(value) => StudySnapshot::from_json_lenient(&value),
                Err(err) => {
                    tracing::warn!(target: "studyvault::store", error = %err, "unparseable snapshot, using defaults");
                    StudySnapshot::default()
                }
            },
            None => StudySnapshot::default(),
        };
        let (view_tx, _) = watch::channel(StudyView::of(&state));
        Ok(Self {
            state,
            store,
            flush_every: flush_every.max(1),
            pending: 0,
            view_tx,
        })
    }

    pub fn snapshot(&self) -> &StudySnapshot {
        &self.state
    }

    pub fn subscribe(&self) -> watch::Receiver<StudyView> {
        self.view_tx.subscribe()
    }

    pub fn view(&self) -> StudyView {
        StudyView::of(&self.state)
    }

    pub fn study_level(&self) -> u64 {
        study_level(self.state.xp)
    }

    pub fn level_title(&self) -> &'static str {
        level_title(self.study_level())
    }

    pub fn progress_percent(&self) -> f64 {
        progress_percent(&self.state.daily_routine)
    }

    pub fn total_study_hours(&self) -> u64 {
        self.view().total_study_hours
    }

    pub fn mistakes_for_chapter(&self, chapter_id: &str) -> Vec<&MistakeEntry> {
        self.state
            .mistake_log
            .iter()
            .filter(|m| m.chapter_id == chapter_id)
            .collect()
    }

    pub fn is_dirty(&self) -> bool {
        self.pending > 0
    }

    /// Write the snapshot if anything changed since the last write.
    pub fn flush(&mut self) -> Result<()> {
        if self.pending == 0 {
            return Ok(());
        }
        self.store.put(STATE_KEY, &self.state)?;
        tracing::debug!(target: "studyvault::store", mutations = self.pending, "snapshot flushed");
        self.pending = 0;
        Ok(())
    }

    fn mutated(&mut self) -> Result<()> {
        self.pending += 1;
        self.view_tx.send_replace(StudyView::of(&self.state));
        if self.pending >= self.flush_every {
            self.flush()?;
        }
        Ok(())
    }

    // ── Mutations ────────────────────────────────────────────────────

    pub fn add_log(&mut self, subject: &str, minutes: u32) -> Result<u64> {
        self.add_log_with_credit(subject, minutes, XpCredit::default())
    }

    /// Append a study log and grant XP. Returns the XP gained.
    pub fn add_log_with_credit(
        &mut self,
        subject: &str,
        minutes: u32,
        credit: XpCredit,
    ) -> Result<u64> {
        self.state.logs.push(StudyLog {
            date: chrono::Utc::now().to_rfc3339(),
            subject: subject.to_string(),
            duration_minutes: minutes,
        });
        let gain = xp_gain(minutes, credit);
        self.state.xp = self.state.xp.saturating_add(gain);
        tracing::debug!(target: "studyvault::store", subject, minutes, gain, "study logged");
        self.mutated()?;
        Ok(gain)
    }

    /// Flip a task's completion. Returns the new flag, or `None` for a bad index.
    pub fn toggle_task(&mut self, index: usize) -> Result<Option<bool>> {
        let Some(task) = self.state.daily_routine.get_mut(index) else {
            return Ok(None);
        };
        task.completed = !task.completed;
        let completed = task.completed;
        if completed && !task.xp_awarded {
            task.xp_awarded = true;
            let gain = xp_gain(
                0,
                XpCredit {
                    task_completed: true,
                    accuracy_percent: 0.0,
                },
            );
            self.state.xp = self.state.xp.saturating_add(gain);
        }
        self.mutated()?;
        Ok(Some(completed))
    }

    /// Replace the routine; every task starts incomplete.
    pub fn set_routine(&mut self, tasks: Vec<Task>) -> Result<()> {
        self.state.daily_routine = tasks
            .into_iter()
            .map(|t| Task {
                completed: false,
                xp_awarded: false,
                ..t
            })
            .collect();
        self.mutated()
    }

    /// Insert and re-sort by start time. Ordering is lexicographic, so start
    /// times must be zero-padded `HH:MM`.
    pub fn add_task(&mut self, task: Task) -> Result<()> {
        if !is_padded_hhmm(&task.time_start) {
            tracing::warn!(target: "studyvault::store", time_start = %task.time_start, "start time is not zero-padded HH:MM; ordering may be wrong");
        }
        self.state.daily_routine.push(task);
        self.state
            .daily_routine
            .sort_by(|a, b| a.time_start.cmp(&b.time_start));
        self.mutated()
    }

    pub fn update_settings(&mut self, patch: SettingsPatch) -> Result<()> {
        let settings = &mut self.state.settings;
        if let Some(wake) = patch.wake_up_time {
            settings.wake_up_time = wake;
        }
        if let Some(goal) = patch.daily_goal {
            settings.daily_goal = goal;
        }
        if let Some(dark) = patch.dark_mode {
            settings.dark_mode = dark;
        }
        if let Some(chronotype) = patch.chronotype {
            settings.chronotype = chronotype;
        }
        self.mutated()
    }

    pub fn add_mistake(&mut self, entry: MistakeEntry) -> Result<()> {
        self.state.mistake_log.insert(0, entry);
        self.mutated()
    }

    pub fn remove_mistake(&mut self, id: &str) -> Result<bool> {
        let before = self.state.mistake_log.len();
        self.state.mistake_log.retain(|m| m.id != id);
        if self.state.mistake_log.len() == before {
            return Ok(false);
        }
        self.mutated()?;
        Ok(true)
    }

    pub fn set_user_name(&mut self, name: &str) -> Result<()> {
        self.state.user_name = name.to_string();
        self.mutated()
    }

    pub fn set_streak(&mut self, streak: u32, freezes: u32) -> Result<()> {
        self.state.streak = streak;
        self.state.streak_freezes = freezes;
        self.mutated()
    }
}

impl Drop for StudyStore {
    fn drop(&mut self) {
        if let Err(err) = self.flush() {
            tracing::error!(target: "studyvault::store", error = %err, "failed to flush study state on shutdown");
        }
    }
}
