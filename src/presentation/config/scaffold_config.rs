use std::time::Duration;

/// Scaffold mode swaps the external tools for stubs that write placeholder
/// outputs, so the service can run on a machine without the pipeline installed.
#[derive(Debug, Clone)]
pub struct ScaffoldConfig {
    pub enabled: bool,
    pub tool_delay_ms: u64,
}

impl ScaffoldConfig {
    pub fn tool_delay(&self) -> Option<Duration> {
        (self.tool_delay_ms > 0).then(|| Duration::from_millis(self.tool_delay_ms))
    }
}

impl Default for ScaffoldConfig {
    fn default() -> Self {
        Self {
            enabled: std::env::var("SCAFFOLD_MODE")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(false),
            tool_delay_ms: std::env::var("SCAFFOLD_TOOL_DELAY_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
        }
    }
}
