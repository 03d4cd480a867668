use tracing::info;

use crate::store::{SavedJobIds, Storage};

pub struct SavedJobs<'a> {
    storage: &'a mut Storage,
}

impl<'a> SavedJobs<'a> {
    pub fn new(storage: &'a mut Storage) -> Self {
        Self { storage }
    }

    /// Saves or unsaves `job_id`. Returns true when the job is now saved.
    pub fn toggle(&mut self, job_id: &str) -> bool {
        let SavedJobIds(mut ids) = self.storage.load();
        let now_saved = if let Some(pos) = ids.iter().position(|id| id == job_id) {
            ids.remove(pos);
            false
        } else {
            ids.push(job_id.to_string());
            true
        };
        self.storage.save(&SavedJobIds(ids));
        info!(job_id, saved = now_saved, "saved jobs updated");
        now_saved
    }

    pub fn is_saved(&mut self, job_id: &str) -> bool {
        self.ids().iter().any(|id| id == job_id)
    }

    /// In the order they were saved.
    pub fn ids(&mut self) -> Vec<String> {
        self.storage.load::<SavedJobIds>().0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{KEY_SAVED_JOB_IDS, KeyValueStore, MemoryStore};

    #[test]
    fn test_toggle_saves_and_unsaves() {
        let mut storage = Storage::in_memory();
        let mut saved = SavedJobs::new(&mut storage);

        assert!(saved.toggle("j1"));
        assert!(saved.toggle("j2"));
        assert!(saved.is_saved("j1"));
        assert_eq!(saved.ids(), vec!["j1", "j2"]);

        assert!(!saved.toggle("j1"));
        assert!(!saved.is_saved("j1"));
        assert_eq!(saved.ids(), vec!["j2"]);
    }

    #[test]
    fn test_malformed_saved_ids_start_empty() {
        let mut backend = MemoryStore::new();
        backend.set(KEY_SAVED_JOB_IDS, r#"{"j1": true}"#).unwrap();
        let mut storage = Storage::new(Box::new(backend));
        let mut saved = SavedJobs::new(&mut storage);
        assert!(saved.ids().is_empty());
        assert!(saved.toggle("j1"));
        assert_eq!(saved.ids(), vec!["j1"]);
    }
}
