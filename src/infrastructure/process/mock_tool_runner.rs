use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::application::ports::{ToolError, ToolInvocation, ToolOutput, ToolRunner};
use crate::application::services::{
    AB_COMPARISON_ALLELIC_TOOL, AB_COMPARISON_TOOL, QUERY_PROFILE_TOOL, TAX_ASSIGN_TOOL,
};
use crate::domain::job_layout::{
    ALLELE_MATRIX, HITS_PROFILE, HITS_SUMMARY, HITS_TABLE, QUERY_TABLE, TAX_ASSIGN_RESULT,
};

pub type ToolScript =
    Arc<dyn Fn(&ToolInvocation) -> Result<ToolOutput, ToolError> + Send + Sync>;

/// Stand-in for the external tools, keyed by program file name.
///
/// Unscripted programs succeed without side effects. Every call is recorded,
/// and the number of calls in flight at once is tracked so tests can observe
/// how many pipelines overlap.
#[derive(Default)]
pub struct MockToolRunner {
    scripts: HashMap<String, ToolScript>,
    delay: Option<Duration>,
    calls: Mutex<Vec<ToolInvocation>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockToolRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on<F>(mut self, program_name: &str, script: F) -> Self
    where
        F: Fn(&ToolInvocation) -> Result<ToolOutput, ToolError> + Send + Sync + 'static,
    {
        self.scripts
            .insert(program_name.to_string(), Arc::new(script));
        self
    }

    /// Makes `program_name` exit with status 1 and the given stderr.
    pub fn failing(self, program_name: &str, stderr: &str) -> Self {
        let stderr = stderr.to_string();
        self.on(program_name, move |inv| {
            Err(ToolError::Failed {
                program: inv.program.clone(),
                code: Some(1),
                stderr: stderr.clone(),
            })
        })
    }

    /// Tools that write placeholder outputs into their `-o` directory, enough
    /// for a job to walk the full five-stage branch.
    pub fn scaffold() -> Self {
        Self::new()
            .on(TAX_ASSIGN_TOOL, |inv| {
                write_output(inv, TAX_ASSIGN_RESULT, "Acinetobacter_baumannii\t100.0\n")
            })
            .on(QUERY_PROFILE_TOOL, |inv| {
                write_output(inv, ALLELE_MATRIX, "#FILE\tlocus_1\tlocus_2\nquery\t1\t2\n")
            })
            .on(AB_COMPARISON_ALLELIC_TOOL, |inv| {
                write_output(inv, HITS_TABLE, "strain\tdistance\nref_1\t12\n")?;
                write_output(inv, HITS_PROFILE, "strain\tAMK\tCIP\nref_1\tS\tR\n")?;
                write_output(inv, QUERY_TABLE, "antibiotic\tprediction\nAMK\tS\nCIP\tR\n")
            })
            .on(AB_COMPARISON_TOOL, |inv| {
                write_output(
                    inv,
                    HITS_SUMMARY,
                    "country\tstrain\tAMK\tCIP\tGEN\tMEM\tTGC\n-1\tref_1\tS\tR\tS\tS\tS\n",
                )
            })
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<ToolInvocation> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn called_programs(&self) -> Vec<String> {
        self.calls()
            .iter()
            .map(|c| c.program_name().to_string())
            .collect()
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

fn write_output(
    invocation: &ToolInvocation,
    name: &str,
    content: &str,
) -> Result<ToolOutput, ToolError> {
    let Some(out_dir) = invocation.value_of("-o") else {
        return Ok(ToolOutput::default());
    };
    std::fs::write(Path::new(out_dir).join(name), content).map_err(|source| ToolError::Spawn {
        program: invocation.program.clone(),
        source,
    })?;
    Ok(ToolOutput::default())
}

#[async_trait]
impl ToolRunner for MockToolRunner {
    async fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput, ToolError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(invocation.clone());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let result = match self.scripts.get(invocation.program_name()) {
            Some(script) => script(invocation),
            None => Ok(ToolOutput::default()),
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}
