use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use msmap_core::checklist::ChecklistStore;
use msmap_core::storage::{self, Settings};
use msmap_core::view::ViewSettings;
use msmap_core::{ManagementMap, Result};

/// Outcome of the one-shot map load.
#[derive(Debug, Clone)]
pub enum MapSlot {
    Loaded(Arc<ManagementMap>),
    Failed(String),
}

/// State owned by the server: the read-only map, the checklist store and
/// the settings they were resolved from.
///
/// Built once in `main` and shared with every tool call.
#[derive(Debug)]
pub struct Session {
    data_dir: PathBuf,
    map_path: PathBuf,
    map: RwLock<MapSlot>,
    checklist: Mutex<ChecklistStore>,
    settings: Mutex<Settings>,
}

impl Session {
    /// Read the settings in `data_dir` and open the session.
    pub fn from_data_dir(data_dir: &Path) -> Result<Self> {
        Self::open(data_dir, storage::read_settings(data_dir))
    }

    /// A map that fails to load leaves the session in the failed state; a
    /// corrupt checklist store is an error.
    pub fn open(data_dir: &Path, settings: Settings) -> Result<Self> {
        let map_path = settings.map_path(data_dir);
        let checklist = ChecklistStore::open(settings.checklist_path(data_dir))?;
        let slot = load_slot(&map_path);
        Ok(Self {
            data_dir: data_dir.to_path_buf(),
            map_path,
            map: RwLock::new(slot),
            checklist: Mutex::new(checklist),
            settings: Mutex::new(settings),
        })
    }

    pub fn map_path(&self) -> &Path {
        &self.map_path
    }

    pub fn map(&self) -> MapSlot {
        match self.map.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Full reload from disk, replacing whatever was loaded before.
    pub fn reload(&self) -> MapSlot {
        let slot = load_slot(&self.map_path);
        let mut guard = match self.map.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = slot.clone();
        slot
    }

    pub fn checklist(&self) -> MutexGuard<'_, ChecklistStore> {
        match self.checklist.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn view_settings(&self) -> ViewSettings {
        self.settings().view
    }

    /// Store new view toggles in settings.json. Memory only changes once the write succeeds.
    pub fn set_view_settings(&self, view: ViewSettings) -> Result<()> {
        let mut settings = self.settings();
        let updated = Settings {
            view,
            ..settings.clone()
        };
        storage::write_settings(&self.data_dir, &updated)?;
        *settings = updated;
        Ok(())
    }

    fn settings(&self) -> MutexGuard<'_, Settings> {
        match self.settings.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

fn load_slot(path: &Path) -> MapSlot {
    match ManagementMap::load(path) {
        Ok(map) => MapSlot::Loaded(Arc::new(map)),
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "management map failed to load");
            MapSlot::Failed(e.to_string())
        }
    }
}
