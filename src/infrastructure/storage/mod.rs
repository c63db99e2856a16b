mod fs_job_store;

pub use fs_job_store::FsJobStore;
