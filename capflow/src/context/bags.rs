//! Insertion-ordered record of stage outputs.

use crate::core::{StageId, StagePayload};
use crate::errors::OutputConflictError;

/// Raw outputs of the stages that completed in one run.
///
/// Keys are unique and iteration follows execution order. The bag is owned
/// by a single run, so it needs no locking.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageOutputs {
    entries: Vec<(StageId, StagePayload)>,
}

impl StageOutputs {
    /// Creates a new empty output bag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the output of a stage.
    ///
    /// # Errors
    ///
    /// Returns `OutputConflictError` if the stage already has an output.
    pub fn record(&mut self, stage: StageId, payload: StagePayload) -> Result<(), OutputConflictError> {
        if self.contains(stage) {
            return Err(OutputConflictError::new(stage.as_str()));
        }
        self.entries.push((stage, payload));
        Ok(())
    }

    /// Gets the output of a stage.
    #[must_use]
    pub fn get(&self, stage: StageId) -> Option<&StagePayload> {
        self.entries
            .iter()
            .find(|(id, _)| *id == stage)
            .map(|(_, payload)| payload)
    }

    /// Checks if output exists for a stage.
    #[must_use]
    pub fn contains(&self, stage: StageId) -> bool {
        self.entries.iter().any(|(id, _)| *id == stage)
    }

    /// Returns the stages with outputs, in execution order.
    #[must_use]
    pub fn stages(&self) -> Vec<StageId> {
        self.entries.iter().map(|(id, _)| *id).collect()
    }

    /// Iterates over outputs in execution order.
    pub fn iter(&self) -> impl Iterator<Item = &(StageId, StagePayload)> {
        self.entries.iter()
    }

    /// Returns the number of recorded outputs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no outputs have been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns a copy of all entries.
    #[must_use]
    pub fn to_vec(&self) -> Vec<(StageId, StagePayload)> {
        self.entries.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_get() {
        let mut outputs = StageOutputs::new();
        outputs.record(StageId::Generate, StagePayload::text("answer")).unwrap();

        assert_eq!(outputs.get(StageId::Generate).unwrap().text.as_deref(), Some("answer"));
        assert!(outputs.get(StageId::Summarize).is_none());
        assert_eq!(outputs.len(), 1);
    }

    #[test]
    fn test_duplicate_stage_conflicts() {
        let mut outputs = StageOutputs::new();
        outputs.record(StageId::Extract, StagePayload::text("a")).unwrap();

        let err = outputs.record(StageId::Extract, StagePayload::text("b")).unwrap_err();
        assert_eq!(err.stage, "extract");
        assert_eq!(outputs.get(StageId::Extract).unwrap().text.as_deref(), Some("a"));
    }

    #[test]
    fn test_insertion_order_preserved() {
        let mut outputs = StageOutputs::new();
        outputs.record(StageId::TranslateToPivot, StagePayload::empty()).unwrap();
        outputs.record(StageId::Generate, StagePayload::empty()).unwrap();
        outputs.record(StageId::Recommend, StagePayload::empty()).unwrap();

        assert_eq!(
            outputs.stages(),
            vec![StageId::TranslateToPivot, StageId::Generate, StageId::Recommend]
        );
    }
}
