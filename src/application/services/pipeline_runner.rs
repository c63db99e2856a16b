use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use tracing::instrument;

use crate::application::ports::{JobStore, JobStoreError, ToolError, ToolInvocation, ToolRunner};
use crate::domain::job_layout::{
    ALLELE_MATRIX, CONTIG_FILE, HITS_SUMMARY, HITS_TABLE, TAX_ASSIGN_RESULT,
};
use crate::domain::{JobId, Organism, Stage};

pub const TAX_ASSIGN_TOOL: &str = "1.Taxonomic-Assignments.pl";
pub const QUERY_PROFILE_TOOL: &str = "2.Query-Profiling.pl";
pub const AB_COMPARISON_ALLELIC_TOOL: &str = "3.Antibiogram-Comparison-alleticDist.pl";
pub const AB_COMPARISON_TOOL: &str = "3.Antibiogram-Comparison.pl";
pub const CG_PROFILER_TOOL: &str = "4.cgMLST-Profiler-alleticDist.pl";
pub const DENDRO_PLOTTER_TOOL: &str = "5.Dendro-Plotter_NJ.pl";

/// Minimum tab-separated fields in a `hits_summary.tsv` data row.
pub const HITS_SUMMARY_MIN_FIELDS: usize = 7;

/// What to do with `hits_summary.tsv` rows that have too few fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShortRowPolicy {
    #[default]
    Skip,
    Fail,
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Directory holding the numbered pipeline scripts; `None` resolves them on `PATH`.
    pub tool_dir: Option<PathBuf>,
    pub silva_db: PathBuf,
    pub cgmlst_db: PathBuf,
    pub rscript: PathBuf,
    pub heatmap_script: PathBuf,
    pub threads: u32,
    pub short_row_policy: ShortRowPolicy,
}

impl PipelineConfig {
    fn tool(&self, name: &str) -> String {
        match &self.tool_dir {
            Some(dir) => dir.join(name).to_string_lossy().into_owned(),
            None => name.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    Completed { organism: Option<Organism> },
    Failed { step: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HitsSummaryRow {
    pub country: String,
    pub fields: Vec<String>,
}

/// Failure of one pipeline step. Recorded in `error.log`, fatal to the job.
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error(transparent)]
    Tool(#[from] ToolError),
    #[error("expected output missing: {}", .0.display())]
    MissingOutput(PathBuf),
    #[error("malformed table: {0}")]
    MalformedTable(String),
    #[error("job store: {0}")]
    Store(#[from] JobStoreError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors the runner could not record in the job directory itself.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("recording failure of '{step}': {source}")]
    RecordFailure {
        step: &'static str,
        #[source]
        source: JobStoreError,
    },
    #[error("finalizing job: {0}")]
    Finalize(#[source] JobStoreError),
}

struct StepFailure {
    step: &'static str,
    error: StageError,
}

trait StepContext<T> {
    fn step(self, step: &'static str) -> Result<T, StepFailure>;
}

impl<T, E: Into<StageError>> StepContext<T> for Result<T, E> {
    fn step(self, step: &'static str) -> Result<T, StepFailure> {
        self.map_err(|e| StepFailure {
            step,
            error: e.into(),
        })
    }
}

/// Executes the analysis stages for one job directory, leaving either
/// `complete_ok` or an `error.log` entry behind.
pub struct PipelineRunner {
    store: Arc<dyn JobStore>,
    tools: Arc<dyn ToolRunner>,
    config: PipelineConfig,
}

impl PipelineRunner {
    pub fn new(store: Arc<dyn JobStore>, tools: Arc<dyn ToolRunner>, config: PipelineConfig) -> Self {
        Self {
            store,
            tools,
            config,
        }
    }

    /// Tool failures come back as `Ok(PipelineOutcome::Failed)`; `Err` only
    /// when the outcome itself could not be written.
    #[instrument(skip(self), fields(job_id = %job_id))]
    pub async fn run(&self, job_id: &JobId) -> Result<PipelineOutcome, PipelineError> {
        match self.execute(job_id).await {
            Ok(organism) => {
                self.store
                    .write_country_placeholder(job_id)
                    .await
                    .map_err(PipelineError::Finalize)?;
                self.store
                    .mark_complete(job_id)
                    .await
                    .map_err(PipelineError::Finalize)?;
                tracing::info!(organism = ?organism.map(|o| o.abbreviation()), "Pipeline completed");
                Ok(PipelineOutcome::Completed { organism })
            }
            Err(StepFailure { step, error }) => {
                tracing::warn!(step, error = %error, "Pipeline step failed");
                self.store
                    .append_error(job_id, &format!("{} failed:\n{}\n", step, error))
                    .await
                    .map_err(|source| PipelineError::RecordFailure { step, source })?;
                Ok(PipelineOutcome::Failed { step })
            }
        }
    }

    async fn execute(&self, job_id: &JobId) -> Result<Option<Organism>, StepFailure> {
        let job_dir = self.store.job_dir(job_id);
        let fasta = job_dir.join(CONTIG_FILE);
        let threads = self.config.threads.to_string();

        const TAX_STEP: &str = "Taxonomic Assignment";
        let tax_dir = self
            .store
            .prepare_stage_dir(job_id, Stage::TaxAssign)
            .await
            .step(TAX_STEP)?;
        let tax_assign = ToolInvocation::new(self.config.tool(TAX_ASSIGN_TOOL))
            .option("-i", &fasta)
            .option("-d", &self.config.silva_db)
            .option("-o", &tax_dir)
            .arg("-p")
            .arg(&threads);
        self.run_stage(job_id, Stage::TaxAssign, &[tax_assign], &tax_dir, &[TAX_ASSIGN_RESULT])
            .await
            .step(TAX_STEP)?;

        let organism = resolve_organism(&tax_dir.join(TAX_ASSIGN_RESULT)).await;
        tracing::info!(
            organism = organism.map(|o| o.abbreviation()).unwrap_or("unrecognized"),
            "Species resolved"
        );

        match organism {
            Some(organism) => {
                self.run_known_species(job_id, &job_dir, &fasta, organism, &threads)
                    .await?
            }
            None => self.run_unknown_species(job_id, &fasta, &threads).await?,
        }

        Ok(organism)
    }

    async fn run_known_species(
        &self,
        job_id: &JobId,
        job_dir: &Path,
        fasta: &Path,
        organism: Organism,
        threads: &str,
    ) -> Result<(), StepFailure> {
        let abbreviation = organism.abbreviation();

        const QUERY_STEP: &str = "Query-Profiling";
        let query_dir = self
            .store
            .prepare_stage_dir(job_id, Stage::QueryProfile)
            .await
            .step(QUERY_STEP)?;
        let query_profile = ToolInvocation::new(self.config.tool(QUERY_PROFILE_TOOL))
            .option("-i", fasta)
            .option("-d", &self.config.cgmlst_db)
            .arg("-b")
            .arg(abbreviation)
            .option("-o", &query_dir)
            .arg("-p")
            .arg(threads);
        self.run_stage(job_id, Stage::QueryProfile, &[query_profile], &query_dir, &[ALLELE_MATRIX])
            .await
            .step(QUERY_STEP)?;

        const AB_STEP: &str = "Ab-Comparison-alleticDist";
        let ab_dir = self
            .store
            .prepare_stage_dir(job_id, Stage::AbProfilesCmp)
            .await
            .step(AB_STEP)?;
        let ab_comparison = ToolInvocation::new(self.config.tool(AB_COMPARISON_ALLELIC_TOOL))
            .option("-i", fasta)
            .option("-j", query_dir.join(ALLELE_MATRIX))
            .arg("-b")
            .arg(abbreviation)
            .option("-o", &ab_dir)
            .arg("-p")
            .arg(threads);
        self.run_stage(job_id, Stage::AbProfilesCmp, &[ab_comparison], &ab_dir, &[HITS_TABLE])
            .await
            .step(AB_STEP)?;

        const CG_STEP: &str = "cgMLST-Profiler";
        let cg_dir = self
            .store
            .prepare_stage_dir(job_id, Stage::CgProfiles)
            .await
            .step(CG_STEP)?;
        let cg_profiler = ToolInvocation::new(self.config.tool(CG_PROFILER_TOOL))
            .option("-i", &query_dir)
            .option("-d", &self.config.cgmlst_db)
            .option("-h", ab_dir.join(HITS_TABLE))
            .arg("-b")
            .arg(abbreviation)
            .option("-o", &cg_dir)
            .arg("-p")
            .arg(threads);
        self.run_stage(job_id, Stage::CgProfiles, &[cg_profiler], &cg_dir, &[])
            .await
            .step(CG_STEP)?;

        const DENDRO_STEP: &str = "Dendrogram or Heatmap";
        let dendro_dir = self
            .store
            .prepare_stage_dir(job_id, Stage::DendroPlot)
            .await
            .step(DENDRO_STEP)?;
        let dendro_plot = ToolInvocation::new(self.config.tool(DENDRO_PLOTTER_TOOL))
            .option("-i", &cg_dir)
            .option("-o", &dendro_dir);
        let heatmap = ToolInvocation::new(self.config.rscript.to_string_lossy())
            .arg(self.config.heatmap_script.to_string_lossy())
            .arg(job_dir.to_string_lossy());
        self.run_stage(job_id, Stage::DendroPlot, &[dendro_plot, heatmap], &dendro_dir, &[])
            .await
            .step(DENDRO_STEP)?;

        Ok(())
    }

    async fn run_unknown_species(
        &self,
        job_id: &JobId,
        fasta: &Path,
        threads: &str,
    ) -> Result<(), StepFailure> {
        const AB_STEP: &str = "Simple Ab-Comparison";
        let ab_dir = self
            .store
            .prepare_stage_dir(job_id, Stage::AbProfilesCmp)
            .await
            .step(AB_STEP)?;
        let ab_comparison = ToolInvocation::new(self.config.tool(AB_COMPARISON_TOOL))
            .option("-i", fasta)
            .option("-o", &ab_dir)
            .arg("-p")
            .arg(threads);
        self.run_stage(job_id, Stage::AbProfilesCmp, &[ab_comparison], &ab_dir, &[])
            .await
            .step(AB_STEP)?;

        const PARSE_STEP: &str = "Parsing hits_summary";
        let content = tokio::fs::read_to_string(ab_dir.join(HITS_SUMMARY))
            .await
            .step(PARSE_STEP)?;
        let rows =
            parse_hits_summary(&content, self.config.short_row_policy).step(PARSE_STEP)?;
        tracing::debug!(rows = rows.len(), "Parsed hits summary");

        Ok(())
    }

    /// Runs the stage's tools in order, checks the expected outputs and writes
    /// the stage marker.
    async fn run_stage(
        &self,
        job_id: &JobId,
        stage: Stage,
        invocations: &[ToolInvocation],
        out_dir: &Path,
        expected_outputs: &[&str],
    ) -> Result<(), StageError> {
        tracing::info!(stage = %stage, ordinal = stage.ordinal(), "Stage started");

        for invocation in invocations {
            self.tools.run(invocation).await?;
        }

        for name in expected_outputs {
            let path = out_dir.join(name);
            if !tokio::fs::try_exists(&path).await? {
                return Err(StageError::MissingOutput(path));
            }
        }

        self.store.mark_stage_ok(job_id, stage).await?;
        tracing::info!(stage = %stage, "Stage succeeded");
        Ok(())
    }
}

/// Unreadable or unrecognized results resolve to `None`, which selects the
/// simplified branch rather than failing the job.
async fn resolve_organism(result_file: &Path) -> Option<Organism> {
    match tokio::fs::read_to_string(result_file).await {
        Ok(content) => content.lines().next().and_then(Organism::from_tax_result_line),
        Err(e) => {
            tracing::warn!(error = %e, path = %result_file.display(), "Could not read taxonomic result");
            None
        }
    }
}

/// Parses `hits_summary.tsv`: a header line followed by tab-separated rows
/// whose first field is the strain's country.
pub fn parse_hits_summary(
    content: &str,
    policy: ShortRowPolicy,
) -> Result<Vec<HitsSummaryRow>, StageError> {
    let mut lines = content.lines();
    if lines.next().is_none() {
        return Err(StageError::MalformedTable(format!("{} is empty", HITS_SUMMARY)));
    }

    let mut rows = Vec::new();
    for (index, line) in lines.enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<String> = line.split('\t').map(str::to_string).collect();
        if fields.len() < HITS_SUMMARY_MIN_FIELDS {
            match policy {
                ShortRowPolicy::Skip => {
                    tracing::debug!(row = index + 2, fields = fields.len(), "Skipping short row");
                    continue;
                }
                ShortRowPolicy::Fail => {
                    return Err(StageError::MalformedTable(format!(
                        "{} row {} has {} fields, expected at least {}",
                        HITS_SUMMARY,
                        index + 2,
                        fields.len(),
                        HITS_SUMMARY_MIN_FIELDS
                    )));
                }
            }
        }
        rows.push(HitsSummaryRow {
            country: fields[0].clone(),
            fields,
        });
    }
    Ok(rows)
}
