//! File names making up the on-disk job directory contract read by the
//! reporting layer.

pub const FORM_DATA_FILE: &str = "formData.json";
pub const CONTIG_FILE: &str = "contigFile.fa";
pub const COMPLETE_MARKER: &str = "complete_ok";
pub const ERROR_LOG: &str = "error.log";
pub const PIPELINE_ERROR_LOG: &str = "pipeline_error.log";
pub const COUNTRY_FILE: &str = "country";

pub const TAX_ASSIGN_RESULT: &str = "taxAssign.result";
pub const ALLELE_MATRIX: &str = "alleleMatrix.1";
pub const HITS_TABLE: &str = "hits_table.tsv";
pub const HITS_PROFILE: &str = "hits_profile.tsv";
pub const HITS_SUMMARY: &str = "hits_summary.tsv";
pub const QUERY_TABLE: &str = "query_table.tsv";
