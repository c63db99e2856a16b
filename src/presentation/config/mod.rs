mod environment;
mod scaffold_config;
mod settings;

pub use environment::Environment;
pub use scaffold_config::ScaffoldConfig;
pub use settings::{
    LoggingSettings, PipelineSettings, ServerSettings, Settings, StorageSettings, WorkerSettings,
};
