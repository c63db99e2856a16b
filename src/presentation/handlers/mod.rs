mod error;
mod health;
mod job_status;
mod results;
mod submit;

pub use error::{ErrorResponse, error_response};
pub use health::health_handler;
pub use job_status::{check_job_handler, job_status_handler};
pub use results::{download_handler, query_table_handler, result_files_handler};
pub use submit::submit_job_handler;
