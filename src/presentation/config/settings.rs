use std::path::PathBuf;
use std::time::Duration;

use config::{Config, ConfigError, File};
use serde::Deserialize;

use super::Environment;
use crate::application::services::{PipelineConfig, ShortRowPolicy};

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub storage: StorageSettings,
    pub pipeline: PipelineSettings,
    pub workers: WorkerSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    pub jobs_root: String,
    pub max_upload_size_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineSettings {
    pub tool_dir: Option<String>,
    #[serde(default)]
    pub search_path: Vec<String>,
    pub silva_db: String,
    pub cgmlst_db: String,
    pub rscript: String,
    pub heatmap_script: String,
    pub genome_download_script: String,
    pub threads: u32,
    pub tool_timeout_secs: Option<u64>,
    #[serde(default)]
    pub short_row_policy: ShortRowPolicy,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkerSettings {
    pub count: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    pub level: String,
    pub enable_json: bool,
}

impl Settings {
    /// Defaults, then `appsettings.{env}` (optional), then `APP_*` variables
    /// with `__` between sections, e.g. `APP_WORKERS__COUNT=8`.
    pub fn load(environment: Environment) -> Result<Self, ConfigError> {
        Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 40000_i64)?
            .set_default("storage.jobs_root", "anti_form_jobs")?
            .set_default("storage.max_upload_size_bytes", 1_073_741_824_i64)?
            .set_default("pipeline.search_path", Vec::<String>::new())?
            .set_default(
                "pipeline.silva_db",
                "/home/chieh/antibiogram_platform/databases/silva/silva_db_all",
            )?
            .set_default(
                "pipeline.cgmlst_db",
                "/home/chieh/antibiogram_platform/databases/cgMLST_db",
            )?
            .set_default("pipeline.rscript", "/home/ngp/R-4.3.2/bin/Rscript")?
            .set_default(
                "pipeline.heatmap_script",
                "/home/ngp/R_code/5NosoAE/12_13_heatmap_new.R",
            )?
            .set_default(
                "pipeline.genome_download_script",
                "/home/chieh/antibiogram_platform/bin/0.Download-GenomeSeq.pl",
            )?
            .set_default("pipeline.threads", 12_i64)?
            .set_default("pipeline.short_row_policy", "skip")?
            .set_default("workers.count", 5_i64)?
            .set_default("logging.level", "info,amr_backend=debug,tower_http=debug")?
            .set_default("logging.enable_json", false)?
            .add_source(File::with_name(&environment.settings_file()).required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(":")
                    .with_list_parse_key("pipeline.search_path"),
            )
            .build()?
            .try_deserialize()
    }
}

impl PipelineSettings {
    pub fn tool_timeout(&self) -> Option<Duration> {
        self.tool_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    pub fn search_dirs(&self) -> Vec<PathBuf> {
        self.search_path.iter().map(PathBuf::from).collect()
    }
}

impl From<&PipelineSettings> for PipelineConfig {
    fn from(settings: &PipelineSettings) -> Self {
        Self {
            tool_dir: settings.tool_dir.as_ref().map(PathBuf::from),
            silva_db: PathBuf::from(&settings.silva_db),
            cgmlst_db: PathBuf::from(&settings.cgmlst_db),
            rscript: PathBuf::from(&settings.rscript),
            heatmap_script: PathBuf::from(&settings.heatmap_script),
            threads: settings.threads,
            short_row_policy: settings.short_row_policy,
        }
    }
}
