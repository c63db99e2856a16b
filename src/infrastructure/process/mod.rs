mod mock_tool_runner;
mod process_tool_runner;

pub use mock_tool_runner::{MockToolRunner, ToolScript};
pub use process_tool_runner::ProcessToolRunner;
