use std::sync::Arc;

use amr_backend::application::ports::JobStore;
use amr_backend::application::services::{
    AB_COMPARISON_ALLELIC_TOOL, AB_COMPARISON_TOOL, CG_PROFILER_TOOL, DENDRO_PLOTTER_TOOL,
    PipelineOutcome, PipelineRunner, QUERY_PROFILE_TOOL, ShortRowPolicy, StageError,
    TAX_ASSIGN_TOOL, parse_hits_summary,
};
use amr_backend::domain::job_layout::{COMPLETE_MARKER, COUNTRY_FILE, ERROR_LOG, HITS_SUMMARY};
use amr_backend::domain::{JobState, Organism, Stage};
use amr_backend::infrastructure::process::MockToolRunner;

use crate::helpers::{job_with_assembly, pipeline_config, test_store, writes};

const UNKNOWN_SPECIES: &str = "Escherichia_coli\t99.0\n";
const SHORT_ROW_SUMMARY: &str = "country\tstrain\tAMK\tCIP\tGEN\tMEM\tTGC\nTW\tref_1\tS\n";

#[tokio::test]
async fn given_supported_species_when_running_then_all_five_stages_complete_in_order() {
    let (_dir, store) = test_store();
    let job_id = job_with_assembly(&store).await;
    let tools = Arc::new(MockToolRunner::scaffold());
    let runner = PipelineRunner::new(store.clone(), tools.clone(), pipeline_config());

    let outcome = runner.run(&job_id).await.unwrap();

    assert_eq!(
        outcome,
        PipelineOutcome::Completed {
            organism: Some(Organism::AcinetobacterBaumannii)
        }
    );
    assert_eq!(
        tools.called_programs(),
        vec![
            TAX_ASSIGN_TOOL,
            QUERY_PROFILE_TOOL,
            AB_COMPARISON_ALLELIC_TOOL,
            CG_PROFILER_TOOL,
            DENDRO_PLOTTER_TOOL,
            "Rscript",
        ]
    );
    assert_eq!(store.stage_markers(&job_id).await.unwrap(), Stage::ALL.to_vec());
    let job_dir = store.job_dir(&job_id);
    assert!(job_dir.join(COMPLETE_MARKER).is_file());
    assert!(job_dir.join(COUNTRY_FILE).is_file());
    assert!(!job_dir.join(ERROR_LOG).exists());
    assert_eq!(store.query_state(&job_id).await.unwrap(), JobState::Done);
}

#[tokio::test]
async fn given_supported_species_when_running_then_tools_receive_expected_arguments() {
    let (_dir, store) = test_store();
    let job_id = job_with_assembly(&store).await;
    let tools = Arc::new(MockToolRunner::scaffold());
    let runner = PipelineRunner::new(store.clone(), tools.clone(), pipeline_config());

    runner.run(&job_id).await.unwrap();

    let job_dir = store.job_dir(&job_id);
    let calls = tools.calls();
    let contig = job_dir.join("contigFile.fa").to_string_lossy().into_owned();
    let allele_matrix = job_dir
        .join("2.QueryProfile/alleleMatrix.1")
        .to_string_lossy()
        .into_owned();

    let tax = &calls[0];
    assert_eq!(tax.value_of("-i"), Some(contig.as_str()));
    assert_eq!(tax.value_of("-d"), Some("/db/silva/silva_db_all"));
    assert_eq!(tax.value_of("-p"), Some("12"));

    let query = &calls[1];
    assert_eq!(query.value_of("-b"), Some("AB"));
    assert_eq!(query.value_of("-d"), Some("/db/cgMLST_db"));

    let ab = &calls[2];
    assert_eq!(ab.value_of("-j"), Some(allele_matrix.as_str()));

    let heatmap = &calls[5];
    assert_eq!(
        heatmap.args,
        vec![
            "/opt/R_code/heatmap.R".to_string(),
            job_dir.to_string_lossy().into_owned()
        ]
    );
}

#[tokio::test]
async fn given_unsupported_species_when_running_then_only_simplified_branch_runs() {
    let (_dir, store) = test_store();
    let job_id = job_with_assembly(&store).await;
    let tools = Arc::new(
        MockToolRunner::scaffold().on(TAX_ASSIGN_TOOL, writes("taxAssign.result", UNKNOWN_SPECIES)),
    );
    let runner = PipelineRunner::new(store.clone(), tools.clone(), pipeline_config());

    let outcome = runner.run(&job_id).await.unwrap();

    assert_eq!(outcome, PipelineOutcome::Completed { organism: None });
    assert_eq!(
        tools.called_programs(),
        vec![TAX_ASSIGN_TOOL, AB_COMPARISON_TOOL]
    );
    assert_eq!(
        store.stage_markers(&job_id).await.unwrap(),
        vec![Stage::TaxAssign, Stage::AbProfilesCmp]
    );
    assert!(store.job_dir(&job_id).join(COMPLETE_MARKER).is_file());
}

#[tokio::test]
async fn given_taxonomic_assignment_fails_when_running_then_error_logged_and_nothing_else_runs() {
    let (_dir, store) = test_store();
    let job_id = job_with_assembly(&store).await;
    let tools = Arc::new(MockToolRunner::scaffold().failing(TAX_ASSIGN_TOOL, "blast: db missing"));
    let runner = PipelineRunner::new(store.clone(), tools.clone(), pipeline_config());

    let outcome = runner.run(&job_id).await.unwrap();

    assert_eq!(
        outcome,
        PipelineOutcome::Failed {
            step: "Taxonomic Assignment"
        }
    );
    assert_eq!(tools.called_programs(), vec![TAX_ASSIGN_TOOL]);
    assert!(store.stage_markers(&job_id).await.unwrap().is_empty());

    let job_dir = store.job_dir(&job_id);
    let log = std::fs::read_to_string(job_dir.join(ERROR_LOG)).unwrap();
    assert!(log.starts_with("Taxonomic Assignment failed:"));
    assert!(log.contains("blast: db missing"));
    assert!(!job_dir.join(COMPLETE_MARKER).exists());
}

#[tokio::test]
async fn given_middle_stage_fails_when_running_then_earlier_markers_remain() {
    let (_dir, store) = test_store();
    let job_id = job_with_assembly(&store).await;
    let tools = Arc::new(MockToolRunner::scaffold().failing(CG_PROFILER_TOOL, "profiler crashed"));
    let runner = PipelineRunner::new(store.clone(), tools.clone(), pipeline_config());

    let outcome = runner.run(&job_id).await.unwrap();

    assert_eq!(
        outcome,
        PipelineOutcome::Failed {
            step: "cgMLST-Profiler"
        }
    );
    assert_eq!(
        store.stage_markers(&job_id).await.unwrap(),
        vec![Stage::TaxAssign, Stage::QueryProfile, Stage::AbProfilesCmp]
    );
    assert!(!tools.called_programs().contains(&DENDRO_PLOTTER_TOOL.to_string()));
    assert!(matches!(
        store.query_state(&job_id).await.unwrap(),
        JobState::Failed(_)
    ));
}

#[tokio::test]
async fn given_tool_exits_cleanly_without_output_when_running_then_stage_fails() {
    let (_dir, store) = test_store();
    let job_id = job_with_assembly(&store).await;
    let tools = Arc::new(MockToolRunner::new());
    let runner = PipelineRunner::new(store.clone(), tools, pipeline_config());

    let outcome = runner.run(&job_id).await.unwrap();

    assert_eq!(
        outcome,
        PipelineOutcome::Failed {
            step: "Taxonomic Assignment"
        }
    );
    let log = std::fs::read_to_string(store.job_dir(&job_id).join(ERROR_LOG)).unwrap();
    assert!(log.contains("taxAssign.result"));
    assert!(store.stage_markers(&job_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn given_short_rows_and_fail_policy_when_running_then_parsing_step_fails() {
    let (_dir, store) = test_store();
    let job_id = job_with_assembly(&store).await;
    let tools = Arc::new(
        MockToolRunner::new()
            .on(TAX_ASSIGN_TOOL, writes("taxAssign.result", UNKNOWN_SPECIES))
            .on(AB_COMPARISON_TOOL, writes(HITS_SUMMARY, SHORT_ROW_SUMMARY)),
    );
    let mut config = pipeline_config();
    config.short_row_policy = ShortRowPolicy::Fail;
    let runner = PipelineRunner::new(store.clone(), tools, config);

    let outcome = runner.run(&job_id).await.unwrap();

    assert_eq!(
        outcome,
        PipelineOutcome::Failed {
            step: "Parsing hits_summary"
        }
    );
    assert!(!store.job_dir(&job_id).join(COMPLETE_MARKER).exists());
}

#[tokio::test]
async fn given_short_rows_and_skip_policy_when_running_then_job_completes() {
    let (_dir, store) = test_store();
    let job_id = job_with_assembly(&store).await;
    let tools = Arc::new(
        MockToolRunner::new()
            .on(TAX_ASSIGN_TOOL, writes("taxAssign.result", UNKNOWN_SPECIES))
            .on(AB_COMPARISON_TOOL, writes(HITS_SUMMARY, SHORT_ROW_SUMMARY)),
    );
    let runner = PipelineRunner::new(store.clone(), tools, pipeline_config());

    let outcome = runner.run(&job_id).await.unwrap();

    assert_eq!(outcome, PipelineOutcome::Completed { organism: None });
}

#[test]
fn given_summary_with_short_and_blank_rows_when_skipping_then_only_full_rows_kept() {
    let content = "country\ta\tb\tc\td\te\tf\nTW\t1\t2\t3\t4\t5\t6\n\nJP\t1\n-1\t1\t2\t3\t4\t5\t6\t7\n";

    let rows = parse_hits_summary(content, ShortRowPolicy::Skip).unwrap();

    let countries: Vec<&str> = rows.iter().map(|r| r.country.as_str()).collect();
    assert_eq!(countries, vec!["TW", "-1"]);
    assert_eq!(rows[1].fields.len(), 8);
}

#[test]
fn given_empty_summary_when_parsing_then_malformed() {
    let result = parse_hits_summary("", ShortRowPolicy::Skip);

    assert!(matches!(result, Err(StageError::MalformedTable(_))));
}

#[test]
fn given_header_only_summary_when_parsing_then_no_rows() {
    let rows = parse_hits_summary("country\ta\tb\n", ShortRowPolicy::Fail).unwrap();

    assert!(rows.is_empty());
}
