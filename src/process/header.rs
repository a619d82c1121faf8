use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::PipelineError;
use crate::process::raw_table::Cell;

/// Tokens that must all appear as whole cell values in the header row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct HeaderSignature {
    tokens: Vec<String>,
}

impl HeaderSignature {
    pub fn new<I, S>(tokens: I) -> Result<Self, PipelineError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut upper: Vec<String> = tokens
            .into_iter()
            .map(|t| t.as_ref().to_uppercase())
            .collect();
        upper.dedup();
        if upper.is_empty() {
            return Err(PipelineError::EmptySignature);
        }
        Ok(Self { tokens: upper })
    }

    /// Built-in signatures; callers pass non-empty literal token lists.
    pub(crate) fn from_builtin(tokens: &[&str]) -> Self {
        Self {
            tokens: tokens.iter().map(|t| t.to_uppercase()).collect(),
        }
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// True when every token equals (case-insensitively) some cell of `row`.
    pub fn matches(&self, row: &[Cell]) -> bool {
        let cells: Vec<String> = row
            .iter()
            .filter_map(|c| c.as_string())
            .map(|s| s.to_uppercase())
            .collect();
        self.tokens.iter().all(|t| cells.iter().any(|c| c == t))
    }
}

impl TryFrom<Vec<String>> for HeaderSignature {
    type Error = PipelineError;

    fn try_from(tokens: Vec<String>) -> Result<Self, Self::Error> {
        HeaderSignature::new(tokens)
    }
}

impl From<HeaderSignature> for Vec<String> {
    fn from(sig: HeaderSignature) -> Self {
        sig.tokens
    }
}

/// Index of the first row carrying the whole signature.
pub fn locate_header(rows: &[Vec<Cell>], signature: &HeaderSignature) -> Result<usize, PipelineError> {
    match rows.iter().position(|row| signature.matches(row)) {
        Some(idx) => {
            debug!(row = idx, tokens = ?signature.tokens(), "header row located");
            Ok(idx)
        }
        None => Err(PipelineError::HeaderNotFound {
            tokens: signature.tokens().to_vec(),
            scanned: rows.len(),
        }),
    }
}
