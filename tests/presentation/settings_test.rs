use std::path::PathBuf;

use amr_backend::application::services::{PipelineConfig, ShortRowPolicy};
use amr_backend::presentation::{Environment, Settings};

#[test]
fn given_no_overrides_when_loading_settings_then_defaults_apply() {
    let settings = Settings::load(Environment::Test).unwrap();

    assert_eq!(settings.server.port, 40000);
    assert_eq!(settings.storage.jobs_root, "anti_form_jobs");
    assert_eq!(settings.workers.count, 5);
    assert_eq!(settings.pipeline.threads, 12);
    assert_eq!(settings.pipeline.short_row_policy, ShortRowPolicy::Skip);
    assert!(settings.pipeline.tool_timeout().is_none());
}

#[test]
fn given_pipeline_settings_when_converting_then_paths_carried_over() {
    let settings = Settings::load(Environment::Test).unwrap();

    let config = PipelineConfig::from(&settings.pipeline);

    assert_eq!(config.threads, 12);
    assert_eq!(config.silva_db, PathBuf::from(&settings.pipeline.silva_db));
    assert_eq!(config.rscript, PathBuf::from(&settings.pipeline.rscript));
}

#[test]
fn given_environment_names_when_parsing_then_aliases_accepted() {
    assert_eq!(
        Environment::try_from("production".to_string()),
        Ok(Environment::Prod)
    );
    assert_eq!(Environment::try_from("Dev".to_string()), Ok(Environment::Local));
    assert!(Environment::try_from("staging".to_string()).is_err());
    assert_eq!(Environment::Test.settings_file(), "appsettings.test");
}
