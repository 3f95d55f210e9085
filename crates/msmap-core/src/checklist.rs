//! Personal progress tracking over the last wizard result.
//!
//! Progress is kept locally only. It never feeds back into document status.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::storage::{io_error, write_json_atomic};
use crate::{ChecklistItem, MapError, Result, WizardResult};

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistState {
    #[serde(default)]
    pub checklist: Vec<ChecklistItem>,
    #[serde(default)]
    pub checklist_progress: BTreeMap<String, bool>,
    #[serde(default)]
    pub is_open: bool,
}

impl ChecklistState {
    /// Replace the checklist wholesale with a fresh, uncompleted copy of the result's.
    ///
    /// The progress map is kept; only `reset` clears it.
    pub fn generate(&mut self, result: &WizardResult) {
        self.checklist = result
            .checklist
            .iter()
            .enumerate()
            .map(|(i, item)| ChecklistItem {
                order: i + 1,
                completed: false,
                ..item.clone()
            })
            .collect();
        self.is_open = true;
    }

    /// Set one item's completion flag. Unknown ids are ignored and return `false`.
    pub fn update_item(&mut self, id: &str, completed: bool) -> bool {
        match self.checklist.iter_mut().find(|item| item.id == id) {
            Some(item) => {
                item.completed = completed;
                self.checklist_progress.insert(id.to_string(), completed);
                true
            }
            None => false,
        }
    }

    pub fn reset(&mut self) {
        self.checklist.clear();
        self.checklist_progress.clear();
    }

    pub fn completed_count(&self) -> usize {
        self.checklist.iter().filter(|i| i.completed).count()
    }

    pub fn remaining(&self) -> usize {
        self.checklist.len() - self.completed_count()
    }

    pub fn progress_label(&self) -> String {
        format!("{}/{} completed", self.completed_count(), self.checklist.len())
    }

    pub fn export(&self, now: DateTime<Utc>) -> ChecklistExport {
        ChecklistExport {
            title: EXPORT_TITLE.to_string(),
            generated_at: now.to_rfc3339(),
            progress: self.progress_label(),
            items: self
                .checklist
                .iter()
                .map(|item| ExportItem {
                    title: item.title.clone(),
                    description: item.description.clone(),
                    completed: item.completed,
                    order: item.order,
                })
                .collect(),
        }
    }
}

// --- Export ---

const EXPORT_TITLE: &str = "Compliance Checklist";

/// Downloadable snapshot of the checklist. No schema version is promised.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistExport {
    pub title: String,
    pub generated_at: String,
    pub progress: String,
    pub items: Vec<ExportItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExportItem {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub completed: bool,
    pub order: usize,
}

pub fn export_file_name(date: NaiveDate) -> String {
    format!("compliance-checklist-{}.json", date.format("%Y-%m-%d"))
}

// --- Store ---

/// Checklist state bound to its local JSON file. Every mutation is persisted.
#[derive(Debug)]
pub struct ChecklistStore {
    path: PathBuf,
    state: ChecklistState,
}

impl ChecklistStore {
    /// Open the store at `path`. A missing file starts empty; a corrupt one is an error.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let state = if path.exists() {
            let raw = fs::read_to_string(&path).map_err(|source| io_error(&path, source))?;
            serde_json::from_str(&raw)
                .map_err(|e| MapError::Store(format!("{}: {}", path.display(), e)))?
        } else {
            ChecklistState::default()
        };
        Ok(Self { path, state })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> &ChecklistState {
        &self.state
    }

    pub fn generate(&mut self, result: &WizardResult) -> Result<()> {
        self.state.generate(result);
        tracing::info!(items = self.state.checklist.len(), "generated checklist");
        self.save()
    }

    /// Returns whether the id was known. Unknown ids leave the file untouched.
    pub fn update_item(&mut self, id: &str, completed: bool) -> Result<bool> {
        if !self.state.update_item(id, completed) {
            tracing::debug!(id, "ignoring update for unknown checklist item");
            return Ok(false);
        }
        self.save()?;
        Ok(true)
    }

    pub fn reset(&mut self) -> Result<()> {
        self.state.reset();
        self.save()
    }

    /// Write the export document into `dir`, returning the file path.
    pub fn export_to(&self, dir: &Path, now: DateTime<Utc>) -> Result<PathBuf> {
        let path = dir.join(export_file_name(now.date_naive()));
        write_json_atomic(&path, &self.state.export(now))?;
        tracing::info!(path = %path.display(), "exported checklist");
        Ok(path)
    }

    fn save(&self) -> Result<()> {
        write_json_atomic(&self.path, &self.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn item(id: &str, order: usize) -> ChecklistItem {
        ChecklistItem {
            id: id.to_string(),
            node_id: id.to_string(),
            title: format!("{id} title"),
            description: Some(format!("Complete policy: {id} title")),
            completed: true,
            order,
            link: None,
        }
    }

    fn result(ids: &[&str]) -> WizardResult {
        WizardResult {
            path: Vec::new(),
            checklist: ids.iter().enumerate().map(|(i, id)| item(id, i + 10)).collect(),
            estimated_time: "0 minutes".to_string(),
        }
    }

    #[test]
    fn generate_starts_items_uncompleted_and_renumbers() {
        let mut state = ChecklistState::default();
        state.checklist_progress.insert("old".to_string(), true);
        state.generate(&result(&["a", "b"]));

        assert_eq!(state.checklist.len(), 2);
        assert!(state.checklist.iter().all(|i| !i.completed));
        assert_eq!(state.checklist.iter().map(|i| i.order).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(state.checklist_progress.get("old"), Some(&true));
        assert!(state.is_open);
    }

    #[test]
    fn regenerating_keeps_recorded_progress() {
        let mut state = ChecklistState::default();
        state.generate(&result(&["a", "b"]));
        state.update_item("a", true);
        state.generate(&result(&["a", "b"]));

        assert_eq!(state.checklist_progress.get("a"), Some(&true));
        assert!(state.checklist.iter().all(|i| !i.completed));
        assert_eq!(state.progress_label(), "0/2 completed");
    }

    #[test]
    fn update_touches_exactly_one_item() {
        let mut state = ChecklistState::default();
        state.generate(&result(&["a", "b", "c"]));
        assert!(state.update_item("b", true));

        let flags: Vec<bool> = state.checklist.iter().map(|i| i.completed).collect();
        assert_eq!(flags, vec![false, true, false]);
        assert_eq!(state.checklist_progress.get("b"), Some(&true));
        assert_eq!(state.progress_label(), "1/3 completed");
        assert_eq!(state.remaining(), 2);
    }

    #[test]
    fn unknown_id_is_a_no_op() {
        let mut state = ChecklistState::default();
        state.generate(&result(&["a"]));
        let before = state.clone();
        assert!(!state.update_item("ghost", true));
        assert_eq!(state, before);
    }

    #[test]
    fn reset_clears_everything() {
        let mut state = ChecklistState::default();
        state.generate(&result(&["a"]));
        state.update_item("a", true);
        state.reset();
        assert!(state.checklist.is_empty());
        assert!(state.checklist_progress.is_empty());
    }

    #[test]
    fn export_shape() {
        let mut state = ChecklistState::default();
        state.generate(&result(&["a", "b"]));
        state.update_item("a", true);
        let now = Utc.with_ymd_and_hms(2025, 3, 4, 10, 0, 0).unwrap();
        let export = state.export(now);

        assert_eq!(export.title, "Compliance Checklist");
        assert_eq!(export.progress, "1/2 completed");
        assert!(export.items[0].completed);
        assert_eq!(export.items[1].order, 2);
        assert_eq!(export_file_name(now.date_naive()), "compliance-checklist-2025-03-04.json");
    }

    #[test]
    fn progress_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("checklist.json");

        let mut store = ChecklistStore::open(&path).unwrap();
        store.generate(&result(&["a", "b"])).unwrap();
        assert!(store.update_item("b", true).unwrap());
        assert!(!store.update_item("zzz", true).unwrap());

        let reopened = ChecklistStore::open(&path).unwrap();
        assert_eq!(reopened.state(), store.state());
        assert_eq!(reopened.state().checklist_progress.get("b"), Some(&true));

        store.generate(&result(&["b", "c"])).unwrap();
        let reopened = ChecklistStore::open(&path).unwrap();
        assert_eq!(reopened.state().checklist_progress.get("b"), Some(&true));
    }

    #[test]
    fn corrupt_store_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("checklist.json");
        fs::write(&path, "[1, 2").unwrap();
        assert!(matches!(ChecklistStore::open(&path), Err(MapError::Store(_))));
    }

    #[test]
    fn export_writes_dated_file() {
        let dir = tempdir().unwrap();
        let mut store = ChecklistStore::open(dir.path().join("state.json")).unwrap();
        store.generate(&result(&["a"])).unwrap();
        let now = Utc.with_ymd_and_hms(2025, 12, 31, 23, 0, 0).unwrap();

        let path = store.export_to(dir.path(), now).unwrap();
        assert_eq!(path, dir.path().join("compliance-checklist-2025-12-31.json"));
        let export: ChecklistExport =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(export.items.len(), 1);
        assert_eq!(export.progress, "0/1 completed");
    }
}
