mod job_queue;
mod pipeline_runner;
mod status_service;
mod submission_service;
mod worker_pool;

pub use job_queue::{JobQueue, QueueError};
pub use pipeline_runner::{
    AB_COMPARISON_ALLELIC_TOOL, AB_COMPARISON_TOOL, CG_PROFILER_TOOL, DENDRO_PLOTTER_TOOL,
    HITS_SUMMARY_MIN_FIELDS, HitsSummaryRow, PipelineConfig, PipelineError, PipelineOutcome,
    PipelineRunner, QUERY_PROFILE_TOOL, ShortRowPolicy, StageError, TAX_ASSIGN_TOOL,
    parse_hits_summary,
};
pub use status_service::{
    DownloadedFile, RESULT_EXTENSIONS, StatusError, StatusService, parse_uniform_table,
};
pub use submission_service::{
    SubmissionError, SubmissionReceipt, SubmissionRequest, SubmissionService, UploadedAssembly,
};
pub use worker_pool::WorkerPool;
