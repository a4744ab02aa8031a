use shared::ClassificationResult;
use std::sync::Arc;

use super::RecognitionError;
use super::catalog::SpeciesCatalog;
use super::classifier::CandidateLabel;

/// Picks "the fish" out of a ranked label list.
///
/// A fish label anywhere in the list beats higher-ranked non-fish labels.
/// Without any fish label the top candidate is returned as a best guess.
#[derive(Debug, Clone)]
pub struct ResultSelector {
    catalog: Arc<SpeciesCatalog>,
}

impl ResultSelector {
    pub fn new(catalog: Arc<SpeciesCatalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &SpeciesCatalog {
        &self.catalog
    }

    pub fn select(
        &self,
        labels: &[CandidateLabel],
    ) -> Result<ClassificationResult, RecognitionError> {
        let selected = labels
            .iter()
            .find(|label| self.catalog.is_fish(&label.name))
            .or_else(|| labels.first())
            .ok_or(RecognitionError::NoResult)?;

        let description = match selected.description.as_deref() {
            Some(provided) if !provided.trim().is_empty() => provided.to_string(),
            _ => self
                .catalog
                .describe(&selected.name)
                .unwrap_or(self.catalog.placeholder.as_str())
                .to_string(),
        };

        Ok(ClassificationResult {
            name: selected.name.clone(),
            score: selected.confidence_score,
            description,
        })
    }
}
