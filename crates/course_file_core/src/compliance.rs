//! Compliance aggregation over Department → Semester → Class → Assignment → Task,
//! plus overdue-task alerts. Read-only.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::domain::{
    Actor, AlertScope, AssignmentProgress, Class, OverdueTask, Role, Task, TaskStatus,
};
use crate::engine::WorkflowEngine;
use crate::ports::{PortError, PortResult};

/// `round(count / total * 100)`, with an empty total reported as 0%.
pub fn percentage(count: u64, total: u64) -> u32 {
    if total == 0 {
        return 0;
    }
    ((count as f64 / total as f64) * 100.0).round() as u32
}

/// Raw counters accumulated while walking the tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub total_tasks: u64,
    pub completed: u64,
    pub cc_reviewed: u64,
    pub hod_reviewed: u64,
}

impl Tally {
    pub fn add_task(&mut self, task: &Task) {
        self.total_tasks += 1;
        if task.status == TaskStatus::Completed {
            self.completed += 1;
        }
        if task.cc_status.is_decided() {
            self.cc_reviewed += 1;
        }
        if task.hod_status.is_decided() {
            self.hod_reviewed += 1;
        }
    }

    pub fn merge(&mut self, other: &Tally) {
        self.total_tasks += other.total_tasks;
        self.completed += other.completed;
        self.cc_reviewed += other.cc_reviewed;
        self.hod_reviewed += other.hod_reviewed;
    }
}

/// Counts and their percentages of `total_tasks`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ComplianceStats {
    pub total_tasks: u64,
    pub completed: u64,
    pub cc_reviewed: u64,
    pub hod_reviewed: u64,
    pub completed_pct: u32,
    pub cc_reviewed_pct: u32,
    pub hod_reviewed_pct: u32,
}

impl From<Tally> for ComplianceStats {
    fn from(t: Tally) -> Self {
        Self {
            total_tasks: t.total_tasks,
            completed: t.completed,
            cc_reviewed: t.cc_reviewed,
            hod_reviewed: t.hod_reviewed,
            completed_pct: percentage(t.completed, t.total_tasks),
            cc_reviewed_pct: percentage(t.cc_reviewed, t.total_tasks),
            hod_reviewed_pct: percentage(t.hod_reviewed, t.total_tasks),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassCompliance {
    pub class_id: Uuid,
    pub class_name: String,
    pub assignments: u64,
    pub stats: ComplianceStats,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SemesterCompliance {
    pub semester_id: Uuid,
    pub number: i32,
    pub classes: Vec<ClassCompliance>,
    pub stats: ComplianceStats,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DepartmentCompliance {
    pub department_id: Uuid,
    pub department_name: String,
    pub semesters: Vec<SemesterCompliance>,
    pub totals: ComplianceStats,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ComplianceSummary {
    pub departments: Vec<DepartmentCompliance>,
    pub totals: ComplianceStats,
}

impl WorkflowEngine {
    pub async fn assignment_progress(&self, assignment_id: Uuid) -> PortResult<AssignmentProgress> {
        self.store.get_assignment(assignment_id).await?;
        let tasks = self.store.list_tasks(assignment_id).await?;
        let completed = tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Completed)
            .count() as u64;

        Ok(AssignmentProgress {
            completed,
            total: tasks.len() as u64,
        })
    }

    /// Per-semester compliance for every department the actor heads.
    ///
    /// A department head with no department gets an empty summary.
    pub async fn department_compliance_summary(
        &self,
        actor: &Actor,
    ) -> PortResult<ComplianceSummary> {
        match actor.role {
            Role::Hod => {}
            Role::Cc | Role::Faculty | Role::Student => {
                return Err(PortError::Unauthorized(
                    "Only a department head can view the compliance summary".to_string(),
                ))
            }
        }

        let mut summary = ComplianceSummary::default();
        let mut grand_total = Tally::default();

        for department in self.store.departments_headed_by(actor.id).await? {
            let mut department_total = Tally::default();
            let mut semesters = Vec::new();

            for semester in self.store.list_semesters(department.id).await? {
                let mut semester_total = Tally::default();
                let mut classes = Vec::new();

                for class in self.store.list_classes(semester.id).await? {
                    let (assignments, tally) = self.tally_class(&class).await?;
                    semester_total.merge(&tally);
                    classes.push(ClassCompliance {
                        class_id: class.id,
                        class_name: class.name,
                        assignments,
                        stats: tally.into(),
                    });
                }

                department_total.merge(&semester_total);
                semesters.push(SemesterCompliance {
                    semester_id: semester.id,
                    number: semester.number,
                    classes,
                    stats: semester_total.into(),
                });
            }

            grand_total.merge(&department_total);
            summary.departments.push(DepartmentCompliance {
                department_id: department.id,
                department_name: department.name,
                semesters,
                totals: department_total.into(),
            });
        }

        summary.totals = grand_total.into();
        debug!(
            departments = summary.departments.len(),
            total_tasks = summary.totals.total_tasks,
            "Compliance summary computed"
        );
        Ok(summary)
    }

    async fn tally_class(&self, class: &Class) -> PortResult<(u64, Tally)> {
        let assignments = self.store.list_assignments_for_class(class.id).await?;
        let mut tally = Tally::default();
        for assignment in &assignments {
            for task in self.store.list_tasks(assignment.id).await? {
                tally.add_task(&task);
            }
        }
        Ok((assignments.len() as u64, tally))
    }

    /// Overdue, never-completed tasks visible to the actor.
    ///
    /// HODs see their departments, CCs their class, faculty their own
    /// assignments. Students have no view.
    pub async fn compliance_alerts(
        &self,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> PortResult<Vec<OverdueTask>> {
        let scope = match actor.role {
            Role::Hod if !actor.departments_headed.is_empty() => {
                AlertScope::Departments(actor.departments_headed.clone())
            }
            Role::Cc | Role::Hod => match actor.class_coordinated {
                Some(class_id) => AlertScope::Class(class_id),
                None => AlertScope::Faculty(actor.id),
            },
            Role::Faculty => AlertScope::Faculty(actor.id),
            Role::Student => {
                return Err(PortError::Unauthorized(
                    "Students cannot view compliance alerts".to_string(),
                ))
            }
        };
        self.compliance_alerts_in(&scope, now).await
    }

    /// Overdue tasks in an explicit scope, for system callers.
    pub async fn compliance_alerts_in(
        &self,
        scope: &AlertScope,
        now: DateTime<Utc>,
    ) -> PortResult<Vec<OverdueTask>> {
        self.store
            .overdue_tasks(scope, now, self.settings.alert_limit)
            .await
    }
}
