use chrono::{DateTime, Utc};
use tracing::info;

use crate::models::{JobStatus, StatusHistoryItem};
use crate::store::{HISTORY_LIMIT, StatusHistory, StatusMap, Storage};

/// Owns the status map and the status history. Both records change only
/// through `set_status`, which writes them in one batch.
pub struct StatusTracker<'a> {
    storage: &'a mut Storage,
}

impl<'a> StatusTracker<'a> {
    pub fn new(storage: &'a mut Storage) -> Self {
        Self { storage }
    }

    pub fn set_status(&mut self, job_id: &str, status: JobStatus, title: &str, company: &str) {
        self.set_status_at(job_id, status, title, company, Utc::now());
    }

    pub fn set_status_at(
        &mut self,
        job_id: &str,
        status: JobStatus,
        title: &str,
        company: &str,
        timestamp: DateTime<Utc>,
    ) {
        let mut statuses: StatusMap = self.storage.load();
        statuses.0.insert(job_id.to_string(), status);

        let StatusHistory(mut history) = self.storage.load();
        history.insert(
            0,
            StatusHistoryItem {
                job_id: job_id.to_string(),
                status,
                timestamp,
                title: title.to_string(),
                company: company.to_string(),
            },
        );
        history.truncate(HISTORY_LIMIT);

        self.storage.save_pair(&statuses, &StatusHistory(history));
        info!(job_id, status = %status, "job status updated");
    }

    pub fn get_status(&mut self, job_id: &str) -> JobStatus {
        self.statuses().get(job_id)
    }

    pub fn statuses(&mut self) -> StatusMap {
        self.storage.load()
    }

    /// Newest first.
    pub fn history(&mut self) -> Vec<StatusHistoryItem> {
        self.storage.load::<StatusHistory>().0
    }
}
