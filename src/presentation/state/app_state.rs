use std::sync::Arc;

use crate::application::services::{JobQueue, StatusService, SubmissionService};
use crate::presentation::config::Settings;

#[derive(Clone)]
pub struct AppState {
    pub submission_service: Arc<SubmissionService>,
    pub status_service: Arc<StatusService>,
    pub queue: JobQueue,
    pub worker_count: usize,
    pub settings: Settings,
}
