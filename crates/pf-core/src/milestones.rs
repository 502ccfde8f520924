use crate::error::MilestoneError;
use crate::types::{
    CreateMilestoneInput, Milestone, MilestoneFieldChanges, MilestoneFilter, MilestoneId,
};

pub trait MilestoneRepository {
    fn create(&self, input: CreateMilestoneInput) -> Result<Milestone, MilestoneError>;
    fn list(&self, filter: MilestoneFilter) -> Result<Vec<Milestone>, MilestoneError>;
    fn apply(
        &self,
        id: &MilestoneId,
        changes: &MilestoneFieldChanges,
    ) -> Result<Milestone, MilestoneError>;
}
