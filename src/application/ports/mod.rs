mod job_store;
mod tool_runner;

pub use job_store::{JobStore, JobStoreError};
pub use tool_runner::{ToolError, ToolInvocation, ToolOutput, ToolRunner};
