use std::fmt;
use std::str::FromStr;

use rand::Rng;
use rand::distr::Alphanumeric;

const SEGMENT_LENGTHS: [usize; 3] = [4, 4, 8];

/// Identifier of one submitted job, `YYYYMMDDss-XXXX-XXXX-XXXXXXXX`.
///
/// The leading part is the submission date followed by a two-digit daily
/// sequence number; the three trailing segments are random `[0-9A-Za-z]`.
/// The identifier doubles as the job's directory name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(String);

impl JobId {
    pub fn generate(date: &str, sequence: u32) -> Self {
        let mut rng = rand::rng();
        let mut segments = Vec::with_capacity(SEGMENT_LENGTHS.len());
        for len in SEGMENT_LENGTHS {
            let segment: String = (&mut rng)
                .sample_iter(&Alphanumeric)
                .take(len)
                .map(char::from)
                .collect();
            segments.push(segment);
        }
        Self(format!("{}{:02}-{}", date, sequence % 100, segments.join("-")))
    }

    pub fn parse(raw: &str) -> Result<Self, JobIdError> {
        let mut parts = raw.split('-');
        let prefix = parts.next().unwrap_or_default();
        if prefix.len() != 10 || !prefix.bytes().all(|b| b.is_ascii_digit()) {
            return Err(JobIdError::Malformed(raw.to_string()));
        }
        for len in SEGMENT_LENGTHS {
            match parts.next() {
                Some(seg) if seg.len() == len && seg.bytes().all(|b| b.is_ascii_alphanumeric()) => {}
                _ => return Err(JobIdError::Malformed(raw.to_string())),
            }
        }
        if parts.next().is_some() {
            return Err(JobIdError::Malformed(raw.to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    /// `YYYYMMDD` part of the identifier.
    pub fn date(&self) -> &str {
        &self.0[..8]
    }

    pub fn sequence(&self) -> u32 {
        self.0[8..10].parse().unwrap_or(0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for JobId {
    type Err = JobIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JobIdError {
    #[error("malformed job id: {0}")]
    Malformed(String),
}
