use crate::oracle::{OracleResponse, ProposedMilestone, ProposedTask};
use crate::types::{
    CreateMilestoneInput, CreateTaskInput, Milestone, MilestoneFieldChanges, MilestoneId,
    ProjectId, Task, TaskFieldChanges, TaskId,
};
use std::collections::{HashMap, HashSet};

/// Everything one reconciliation intends to write, computed up front so
/// the persistence step is a straight replay inside one transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergePlan {
    pub task_creates: Vec<CreateTaskInput>,
    pub task_updates: Vec<(TaskId, TaskFieldChanges)>,
    pub milestone_creates: Vec<CreateMilestoneInput>,
    pub milestone_updates: Vec<(MilestoneId, MilestoneFieldChanges)>,
}

impl MergePlan {
    pub fn is_empty(&self) -> bool {
        self.task_creates.is_empty()
            && self.task_updates.is_empty()
            && self.milestone_creates.is_empty()
            && self.milestone_updates.is_empty()
    }
}

/// Reconciles the oracle's proposal against current state.
///
/// Identity is the case-insensitive, trimmed title; there is no stronger
/// id scheme on the oracle side. Matched items get a field-level diff,
/// unmatched proposals become creates, and current items absent from the
/// proposal are left untouched: deletion is never inferred from omission.
pub fn plan_merge(
    project_id: &ProjectId,
    current_tasks: &[Task],
    current_milestones: &[Milestone],
    proposal: &OracleResponse,
) -> MergePlan {
    let mut plan = MergePlan::default();

    let tasks_by_title: HashMap<String, &Task> = current_tasks
        .iter()
        .map(|task| (normalize_title(&task.title), task))
        .collect();
    let mut seen = HashSet::new();
    for proposed in &proposal.tasks {
        let key = normalize_title(&proposed.title);
        if !seen.insert(key.clone()) {
            // Duplicate titles within one proposal would break convergence.
            continue;
        }
        match tasks_by_title.get(&key) {
            Some(current) => {
                let changes = diff_task(current, proposed);
                if !changes.is_empty() {
                    plan.task_updates.push((current.id.clone(), changes));
                }
            }
            None => plan.task_creates.push(CreateTaskInput {
                project_id: project_id.clone(),
                title: proposed.title.clone(),
                description: proposed.description.clone(),
                status: proposed.status,
                priority: proposed.priority,
                assignee: proposed.assignee.clone(),
                deadline: proposed.deadline,
            }),
        }
    }

    let milestones_by_title: HashMap<String, &Milestone> = current_milestones
        .iter()
        .map(|milestone| (normalize_title(&milestone.title), milestone))
        .collect();
    let mut seen = HashSet::new();
    for proposed in &proposal.milestones {
        let key = normalize_title(&proposed.title);
        if !seen.insert(key.clone()) {
            continue;
        }
        match milestones_by_title.get(&key) {
            Some(current) => {
                let changes = diff_milestone(current, proposed);
                if !changes.is_empty() {
                    plan.milestone_updates.push((current.id.clone(), changes));
                }
            }
            None => plan.milestone_creates.push(CreateMilestoneInput {
                project_id: project_id.clone(),
                title: proposed.title.clone(),
                date: proposed.date,
                status: proposed.status,
                description: proposed.description.clone(),
            }),
        }
    }

    plan
}

pub fn diff_task(current: &Task, proposed: &ProposedTask) -> TaskFieldChanges {
    let mut changes = TaskFieldChanges::default();
    if current.status != proposed.status {
        changes.status = Some(proposed.status);
    }
    if current.priority != proposed.priority {
        changes.priority = Some(proposed.priority);
    }
    if current.assignee != proposed.assignee {
        changes.assignee = Some(proposed.assignee.clone());
    }
    if current.deadline != proposed.deadline {
        changes.deadline = Some(proposed.deadline);
    }
    if current.description != proposed.description {
        changes.description = Some(proposed.description.clone());
    }
    changes
}

pub fn diff_milestone(current: &Milestone, proposed: &ProposedMilestone) -> MilestoneFieldChanges {
    let mut changes = MilestoneFieldChanges::default();
    if current.status != proposed.status {
        changes.status = Some(proposed.status);
    }
    if current.date != proposed.date {
        changes.date = Some(proposed.date);
    }
    if current.description != proposed.description {
        changes.description = Some(proposed.description.clone());
    }
    changes
}

fn normalize_title(title: &str) -> String {
    title.trim().to_lowercase()
}
