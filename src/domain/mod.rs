mod job_id;
pub mod job_layout;
mod job_state;
mod organism;
mod stage;
mod submission;

pub use job_id::{JobId, JobIdError};
pub use job_state::JobState;
pub use organism::Organism;
pub use stage::Stage;
pub use submission::{
    DEFAULT_COUNTRY, GcaCode, SubmissionForm, SubmissionFormError, validate_email,
};
