//! In-memory store (non-persistent).
//!
//! Every operation takes the single lock once, so multi-row writes such as
//! assignment creation and batch review are atomic with respect to each other.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::domain::{
    AlertScope, Assignment, AuditFilter, AuditLogEntry, Class, Department, OverdueTask,
    ReviewStatus, Semester, Subject, Task, TaskState, TaskStatus, TaskTemplate, TaskView, User,
};
use crate::ports::{AuditLogService, PortError, PortResult, WorkflowStore};
use crate::transitions::{apply_batch_review, is_batch_eligible};

/// Organisational data (and optionally a template catalog) to preload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrgSeed {
    #[serde(default)]
    pub departments: Vec<Department>,
    #[serde(default)]
    pub semesters: Vec<Semester>,
    #[serde(default)]
    pub classes: Vec<Class>,
    #[serde(default)]
    pub subjects: Vec<Subject>,
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub templates: Vec<TaskTemplate>,
}

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    departments: HashMap<Uuid, Department>,
    semesters: HashMap<Uuid, Semester>,
    classes: HashMap<Uuid, Class>,
    subjects: HashMap<Uuid, Subject>,
    templates: HashMap<Uuid, TaskTemplate>,
    assignments: HashMap<Uuid, Assignment>,
    tasks: HashMap<Uuid, Task>,
    audit: Vec<AuditLogEntry>,
}

#[derive(Default)]
pub struct InMemoryStore {
    inner: RwLock<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seed(seed: OrgSeed) -> PortResult<Self> {
        let store = Self::new();
        store.load_seed(seed)?;
        Ok(store)
    }

    /// Inserts (or replaces) every record of the seed.
    pub fn load_seed(&self, seed: OrgSeed) -> PortResult<()> {
        let mut inner = self.write()?;
        inner
            .departments
            .extend(seed.departments.into_iter().map(|d| (d.id, d)));
        inner
            .semesters
            .extend(seed.semesters.into_iter().map(|s| (s.id, s)));
        inner
            .classes
            .extend(seed.classes.into_iter().map(|c| (c.id, c)));
        inner
            .subjects
            .extend(seed.subjects.into_iter().map(|s| (s.id, s)));
        inner.users.extend(seed.users.into_iter().map(|u| (u.id, u)));
        inner
            .templates
            .extend(seed.templates.into_iter().map(|t| (t.id, t)));
        Ok(())
    }

    fn read(&self) -> PortResult<RwLockReadGuard<'_, Inner>> {
        self.inner
            .read()
            .map_err(|_| PortError::Unexpected("In-memory store lock poisoned".to_string()))
    }

    fn write(&self) -> PortResult<RwLockWriteGuard<'_, Inner>> {
        self.inner
            .write()
            .map_err(|_| PortError::Unexpected("In-memory store lock poisoned".to_string()))
    }
}

fn found<T: Clone>(map: &HashMap<Uuid, T>, id: Uuid, kind: &str) -> PortResult<T> {
    map.get(&id)
        .cloned()
        .ok_or_else(|| PortError::NotFound(format!("{} {} not found", kind, id)))
}

fn sort_templates(templates: &mut [TaskTemplate]) {
    templates.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.title.cmp(&b.title)));
}

impl Inner {
    fn department_of_class(&self, class: &Class) -> Option<Uuid> {
        self.semesters
            .get(&class.semester_id)
            .map(|semester| semester.department_id)
    }

    fn in_scope(&self, scope: &AlertScope, assignment: &Assignment, class: &Class) -> bool {
        match scope {
            AlertScope::Global => true,
            AlertScope::Departments(ids) => self
                .department_of_class(class)
                .map_or(false, |id| ids.contains(&id)),
            AlertScope::Class(class_id) => assignment.class_id == *class_id,
            AlertScope::Faculty(faculty_id) => assignment.faculty_id == *faculty_id,
        }
    }
}

//=========================================================================================
// `WorkflowStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl WorkflowStore for InMemoryStore {
    async fn get_user(&self, user_id: Uuid) -> PortResult<User> {
        found(&self.read()?.users, user_id, "User")
    }

    async fn get_department(&self, department_id: Uuid) -> PortResult<Department> {
        found(&self.read()?.departments, department_id, "Department")
    }

    async fn get_semester(&self, semester_id: Uuid) -> PortResult<Semester> {
        found(&self.read()?.semesters, semester_id, "Semester")
    }

    async fn get_class(&self, class_id: Uuid) -> PortResult<Class> {
        found(&self.read()?.classes, class_id, "Class")
    }

    async fn get_subject(&self, subject_id: Uuid) -> PortResult<Subject> {
        found(&self.read()?.subjects, subject_id, "Subject")
    }

    async fn departments_headed_by(&self, user_id: Uuid) -> PortResult<Vec<Department>> {
        let inner = self.read()?;
        let mut departments: Vec<Department> = inner
            .departments
            .values()
            .filter(|d| d.head_user_id == Some(user_id))
            .cloned()
            .collect();
        departments.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(departments)
    }

    async fn class_coordinated_by(&self, user_id: Uuid) -> PortResult<Option<Class>> {
        let inner = self.read()?;
        Ok(inner
            .classes
            .values()
            .filter(|c| c.coordinator_user_id == Some(user_id))
            .min_by(|a, b| a.name.cmp(&b.name))
            .cloned())
    }

    async fn list_semesters(&self, department_id: Uuid) -> PortResult<Vec<Semester>> {
        let inner = self.read()?;
        let mut semesters: Vec<Semester> = inner
            .semesters
            .values()
            .filter(|s| s.department_id == department_id)
            .cloned()
            .collect();
        semesters.sort_by_key(|s| s.number);
        Ok(semesters)
    }

    async fn list_classes(&self, semester_id: Uuid) -> PortResult<Vec<Class>> {
        let inner = self.read()?;
        let mut classes: Vec<Class> = inner
            .classes
            .values()
            .filter(|c| c.semester_id == semester_id)
            .cloned()
            .collect();
        classes.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(classes)
    }

    async fn list_templates(&self, active_only: bool) -> PortResult<Vec<TaskTemplate>> {
        let inner = self.read()?;
        let mut templates: Vec<TaskTemplate> = inner
            .templates
            .values()
            .filter(|t| !active_only || t.is_active)
            .cloned()
            .collect();
        sort_templates(&mut templates);
        Ok(templates)
    }

    async fn get_template(&self, template_id: Uuid) -> PortResult<TaskTemplate> {
        found(&self.read()?.templates, template_id, "Template")
    }

    async fn insert_template(&self, template: TaskTemplate) -> PortResult<TaskTemplate> {
        self.write()?
            .templates
            .insert(template.id, template.clone());
        Ok(template)
    }

    async fn update_template(&self, template: TaskTemplate) -> PortResult<TaskTemplate> {
        let mut inner = self.write()?;
        let slot = inner
            .templates
            .get_mut(&template.id)
            .ok_or_else(|| PortError::NotFound(format!("Template {} not found", template.id)))?;
        *slot = template.clone();
        Ok(template)
    }

    async fn create_assignment_with_tasks(
        &self,
        assignment: Assignment,
        tasks: Vec<Task>,
    ) -> PortResult<Assignment> {
        let mut inner = self.write()?;
        let duplicate = inner.assignments.values().any(|a| {
            a.subject_id == assignment.subject_id
                && a.faculty_id == assignment.faculty_id
                && a.class_id == assignment.class_id
        });
        if duplicate {
            return Err(PortError::Conflict(
                "An assignment already exists for this subject, faculty and class".to_string(),
            ));
        }

        inner.assignments.insert(assignment.id, assignment.clone());
        inner.tasks.extend(tasks.into_iter().map(|t| (t.id, t)));
        Ok(assignment)
    }

    async fn get_assignment(&self, assignment_id: Uuid) -> PortResult<Assignment> {
        found(&self.read()?.assignments, assignment_id, "Assignment")
    }

    async fn find_assignment(
        &self,
        subject_id: Uuid,
        faculty_id: Uuid,
        class_id: Uuid,
    ) -> PortResult<Option<Assignment>> {
        let inner = self.read()?;
        Ok(inner
            .assignments
            .values()
            .find(|a| {
                a.subject_id == subject_id && a.faculty_id == faculty_id && a.class_id == class_id
            })
            .cloned())
    }

    async fn list_assignments_for_class(&self, class_id: Uuid) -> PortResult<Vec<Assignment>> {
        let inner = self.read()?;
        let mut assignments: Vec<Assignment> = inner
            .assignments
            .values()
            .filter(|a| a.class_id == class_id)
            .cloned()
            .collect();
        assignments.sort_by_key(|a| a.created_at);
        Ok(assignments)
    }

    async fn delete_assignment(&self, assignment_id: Uuid) -> PortResult<u64> {
        let mut inner = self.write()?;
        if inner.assignments.remove(&assignment_id).is_none() {
            return Err(PortError::NotFound(format!(
                "Assignment {} not found",
                assignment_id
            )));
        }
        let before = inner.tasks.len();
        inner.tasks.retain(|_, t| t.assignment_id != assignment_id);
        Ok((before - inner.tasks.len()) as u64)
    }

    async fn get_task(&self, task_id: Uuid) -> PortResult<Task> {
        found(&self.read()?.tasks, task_id, "Task")
    }

    async fn list_tasks(&self, assignment_id: Uuid) -> PortResult<Vec<Task>> {
        Ok(self
            .list_task_views(assignment_id)
            .await?
            .into_iter()
            .map(|view| view.task)
            .collect())
    }

    async fn list_task_views(&self, assignment_id: Uuid) -> PortResult<Vec<TaskView>> {
        let inner = self.read()?;
        let mut views: Vec<TaskView> = inner
            .tasks
            .values()
            .filter(|t| t.assignment_id == assignment_id)
            .map(|task| {
                let template = inner.templates.get(&task.template_id);
                TaskView {
                    task: task.clone(),
                    template_title: template.map(|t| t.title.clone()).unwrap_or_default(),
                    template_order: template.map_or(i32::MAX, |t| t.order),
                }
            })
            .collect();
        views.sort_by(|a, b| {
            a.template_order
                .cmp(&b.template_order)
                .then_with(|| a.template_title.cmp(&b.template_title))
        });
        Ok(views)
    }

    async fn update_task_if(&self, task: &Task, expected: TaskState) -> PortResult<Option<Task>> {
        let mut inner = self.write()?;
        let stored = inner
            .tasks
            .get_mut(&task.id)
            .ok_or_else(|| PortError::NotFound(format!("Task {} not found", task.id)))?;
        if stored.state() != expected {
            return Ok(None);
        }

        stored.status = task.status;
        stored.completed_at = task.completed_at;
        stored.cc_status = task.cc_status;
        stored.cc_remarks = task.cc_remarks.clone();
        stored.cc_review_date = task.cc_review_date;
        stored.hod_status = task.hod_status;
        stored.hod_remarks = task.hod_remarks.clone();
        stored.hod_review_date = task.hod_review_date;
        Ok(Some(stored.clone()))
    }

    async fn update_task_deadline(
        &self,
        task_id: Uuid,
        deadline: DateTime<Utc>,
    ) -> PortResult<Task> {
        let mut inner = self.write()?;
        let stored = inner
            .tasks
            .get_mut(&task_id)
            .ok_or_else(|| PortError::NotFound(format!("Task {} not found", task_id)))?;
        stored.deadline = deadline;
        Ok(stored.clone())
    }

    async fn batch_review_hod(
        &self,
        assignment_id: Uuid,
        decision: ReviewStatus,
        remarks: &str,
        at: DateTime<Utc>,
    ) -> PortResult<u64> {
        let mut inner = self.write()?;
        let mut count = 0;
        for task in inner
            .tasks
            .values_mut()
            .filter(|t| t.assignment_id == assignment_id && is_batch_eligible(t.state()))
        {
            apply_batch_review(task, decision, remarks, at);
            count += 1;
        }
        Ok(count)
    }

    async fn overdue_tasks(
        &self,
        scope: &AlertScope,
        now: DateTime<Utc>,
        limit: u32,
    ) -> PortResult<Vec<OverdueTask>> {
        let inner = self.read()?;
        let mut overdue: Vec<OverdueTask> = inner
            .tasks
            .values()
            .filter(|t| t.status == TaskStatus::Pending && t.deadline < now)
            .filter_map(|task| {
                let assignment = inner.assignments.get(&task.assignment_id)?;
                let class = inner.classes.get(&assignment.class_id)?;
                if !inner.in_scope(scope, assignment, class) {
                    return None;
                }
                let subject = inner.subjects.get(&assignment.subject_id)?;
                let template = inner.templates.get(&task.template_id)?;
                Some(OverdueTask {
                    task: task.clone(),
                    template_title: template.title.clone(),
                    assignment_id: assignment.id,
                    faculty_id: assignment.faculty_id,
                    class_name: class.name.clone(),
                    subject_name: subject.name.clone(),
                    days_overdue: (now - task.deadline).num_days(),
                })
            })
            .collect();
        overdue.sort_by_key(|o| o.task.deadline);
        overdue.truncate(limit as usize);
        Ok(overdue)
    }
}

//=========================================================================================
// `AuditLogService` Trait Implementation
//=========================================================================================

#[async_trait]
impl AuditLogService for InMemoryStore {
    async fn append(&self, entry: AuditLogEntry) -> PortResult<()> {
        self.write()?.audit.push(entry);
        Ok(())
    }

    async fn list(&self, filter: &AuditFilter) -> PortResult<Vec<AuditLogEntry>> {
        let inner = self.read()?;
        let limit = filter.limit.map_or(usize::MAX, |l| l as usize);
        Ok(inner
            .audit
            .iter()
            .rev()
            .filter(|e| filter.assignment_id.map_or(true, |id| e.assignment_id == Some(id)))
            .filter(|e| filter.actor_id.map_or(true, |id| e.actor_id == id))
            .filter(|e| filter.action.map_or(true, |action| e.action == action))
            .take(limit)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Role;

    fn template(title: &str, order: i32, is_active: bool) -> TaskTemplate {
        TaskTemplate {
            id: Uuid::new_v4(),
            title: title.to_string(),
            description: String::new(),
            order,
            is_active,
        }
    }

    #[tokio::test]
    async fn conflicting_assignment_writes_no_tasks() {
        let store = InMemoryStore::new();
        let assignment = Assignment {
            id: Uuid::new_v4(),
            subject_id: Uuid::new_v4(),
            faculty_id: Uuid::new_v4(),
            class_id: Uuid::new_v4(),
            created_at: Utc::now(),
        };
        let task = Task::new_pending(assignment.id, Uuid::new_v4(), Utc::now());
        store
            .create_assignment_with_tasks(assignment.clone(), vec![task])
            .await
            .unwrap();

        let duplicate = Assignment {
            id: Uuid::new_v4(),
            ..assignment
        };
        let orphan = Task::new_pending(duplicate.id, Uuid::new_v4(), Utc::now());
        let err = store
            .create_assignment_with_tasks(duplicate.clone(), vec![orphan.clone()])
            .await
            .unwrap_err();

        assert!(matches!(err, PortError::Conflict(_)));
        assert!(store.get_task(orphan.id).await.is_err());
        assert!(store.list_tasks(duplicate.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn stale_expected_state_is_not_written() {
        let store = InMemoryStore::new();
        let assignment_id = Uuid::new_v4();
        let task = Task::new_pending(assignment_id, Uuid::new_v4(), Utc::now());
        store
            .create_assignment_with_tasks(
                Assignment {
                    id: assignment_id,
                    subject_id: Uuid::new_v4(),
                    faculty_id: Uuid::new_v4(),
                    class_id: Uuid::new_v4(),
                    created_at: Utc::now(),
                },
                vec![task.clone()],
            )
            .await
            .unwrap();

        let mut next = task.clone();
        next.status = TaskStatus::Completed;
        let stale = TaskState {
            status: TaskStatus::Completed,
            cc_status: ReviewStatus::Pending,
            hod_status: ReviewStatus::Pending,
        };

        assert!(store.update_task_if(&next, stale).await.unwrap().is_none());
        let written = store.update_task_if(&next, task.state()).await.unwrap();
        assert_eq!(written.map(|t| t.status), Some(TaskStatus::Completed));
    }

    #[tokio::test]
    async fn batch_review_requires_completion_cc_yes_and_hod_pending() {
        let store = InMemoryStore::new();
        let assignment_id = Uuid::new_v4();
        let shaped = |status, cc_status| {
            let mut task = Task::new_pending(assignment_id, Uuid::new_v4(), Utc::now());
            task.status = status;
            task.cc_status = cc_status;
            task
        };
        let eligible = shaped(TaskStatus::Completed, ReviewStatus::Yes);
        let rejected = shaped(TaskStatus::Completed, ReviewStatus::No);
        let incomplete = shaped(TaskStatus::Pending, ReviewStatus::Yes);
        store
            .create_assignment_with_tasks(
                Assignment {
                    id: assignment_id,
                    subject_id: Uuid::new_v4(),
                    faculty_id: Uuid::new_v4(),
                    class_id: Uuid::new_v4(),
                    created_at: Utc::now(),
                },
                vec![eligible.clone(), rejected.clone(), incomplete.clone()],
            )
            .await
            .unwrap();

        let count = store
            .batch_review_hod(assignment_id, ReviewStatus::Yes, "Batch Approved", Utc::now())
            .await
            .unwrap();

        assert_eq!(count, 1);
        let hod_of = |task: Task| task.hod_status;
        assert_eq!(hod_of(store.get_task(eligible.id).await.unwrap()), ReviewStatus::Yes);
        assert_eq!(hod_of(store.get_task(rejected.id).await.unwrap()), ReviewStatus::Pending);
        assert_eq!(hod_of(store.get_task(incomplete.id).await.unwrap()), ReviewStatus::Pending);
    }

    #[tokio::test]
    async fn templates_sort_by_order_then_title() {
        let store = InMemoryStore::from_seed(OrgSeed {
            templates: vec![
                template("Lesson Plan", 2, true),
                template("Attendance", 2, true),
                template("Syllabus Copy", 1, true),
                template("Retired", 0, false),
            ],
            ..OrgSeed::default()
        })
        .unwrap();

        let active: Vec<_> = store
            .list_templates(true)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(active, vec!["Syllabus Copy", "Attendance", "Lesson Plan"]);
        assert_eq!(store.list_templates(false).await.unwrap().len(), 4);
    }

    #[test]
    fn seed_parses_from_json() {
        let json = r#"{
            "departments": [{"id": "6f1c1d7e-8a55-4a8e-9a55-0d3c2b7a6a01", "name": "CSE", "head_user_id": null}],
            "users": [{"id": "6f1c1d7e-8a55-4a8e-9a55-0d3c2b7a6a02", "name": "Asha", "role": "FACULTY", "home_class_id": null}]
        }"#;
        let seed: OrgSeed = serde_json::from_str(json).unwrap();
        assert_eq!(seed.departments.len(), 1);
        assert_eq!(seed.users[0].role, Role::Faculty);
        assert!(seed.classes.is_empty());
    }
}
