use std::fmt;

/// One step of the analysis pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    TaxAssign,
    QueryProfile,
    AbProfilesCmp,
    CgProfiles,
    DendroPlot,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::TaxAssign,
        Stage::QueryProfile,
        Stage::AbProfilesCmp,
        Stage::CgProfiles,
        Stage::DendroPlot,
    ];

    pub fn ordinal(&self) -> u8 {
        match self {
            Stage::TaxAssign => 1,
            Stage::QueryProfile => 2,
            Stage::AbProfilesCmp => 3,
            Stage::CgProfiles => 4,
            Stage::DendroPlot => 5,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::TaxAssign => "taxAssign",
            Stage::QueryProfile => "queryProfile",
            Stage::AbProfilesCmp => "abProfilesCmp",
            Stage::CgProfiles => "cgProfiles",
            Stage::DendroPlot => "DendroPlot",
        }
    }

    /// Output subdirectory under the job directory.
    pub fn output_dir(&self) -> &'static str {
        match self {
            Stage::TaxAssign => "1.taxAssign",
            Stage::QueryProfile => "2.QueryProfile",
            Stage::AbProfilesCmp => "3.abProfilesCmp",
            Stage::CgProfiles => "4.cgProfiles",
            Stage::DendroPlot => "5.DendroPlot",
        }
    }

    /// Zero-byte file written into the job directory when the stage succeeds.
    pub fn marker_file(&self) -> String {
        format!("{}_ok", self.as_str())
    }

    pub fn from_ordinal(ordinal: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.ordinal() == ordinal)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
