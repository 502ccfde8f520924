use crate::error::ProjectError;
use crate::types::{CreateProjectInput, GroupId, PlanUpdate, Project, ProjectId};

pub trait ProjectRepository {
    fn create(&self, input: CreateProjectInput) -> Result<Project, ProjectError>;
    fn get(&self, id: &ProjectId) -> Result<Option<Project>, ProjectError>;
    fn list_by_group(&self, group_id: &GroupId) -> Result<Vec<Project>, ProjectError>;
    /// Supersedes the plan fields. The caller supplies the next version;
    /// the row is never deleted.
    fn update_plan(&self, id: &ProjectId, update: PlanUpdate) -> Result<Project, ProjectError>;
}
