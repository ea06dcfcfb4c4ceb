//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `WorkflowStore` and `AuditLogService` ports from the `core` crate. It
//! handles all interactions with the PostgreSQL database using `sqlx`.
//!
//! Task mutations are conditional `UPDATE`s keyed on the status triple the engine
//! read, so Postgres row locking gives the compare-and-set semantics the engine
//! relies on.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use course_file_core::domain::{
    AlertScope, Assignment, AuditAction, AuditFilter, AuditLogEntry, Class, Department,
    OverdueTask, ReviewStatus, Role, Semester, Subject, Task, TaskState, TaskStatus,
    TaskTemplate, TaskView, User,
};
use course_file_core::ports::{AuditLogService, PortError, PortResult, WorkflowStore};
use sqlx::{FromRow, PgPool};
use tracing::{debug, error};
use uuid::Uuid;

const UNIQUE_VIOLATION: &str = "23505";
const CHECK_VIOLATION: &str = "23514";

const TASK_COLUMNS: &str = "t.id, t.assignment_id, t.template_id, t.deadline, t.status, \
     t.completed_at, t.cc_status, t.cc_remarks, t.cc_review_date, t.hod_status, \
     t.hod_remarks, t.hod_review_date";

const TEMPLATE_COLUMNS: &str = "id, title, description, sort_order, is_active";

const AUDIT_COLUMNS: &str = "id, action, message, actor_id, actor_name, assignment_id, \
     class_name, subject_name, task_title, metadata, created_at";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the workflow ports on PostgreSQL.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

/// Maps a `sqlx` error onto the port error vocabulary.
fn db_error(e: sqlx::Error, not_found: impl FnOnce() -> String) -> PortError {
    match e {
        sqlx::Error::RowNotFound => PortError::NotFound(not_found()),
        sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
            PortError::Conflict(db.message().to_string())
        }
        sqlx::Error::Database(db) if db.code().as_deref() == Some(CHECK_VIOLATION) => {
            PortError::InvalidState(db.message().to_string())
        }
        other => {
            error!("Database error: {:?}", other);
            PortError::Unexpected(other.to_string())
        }
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    db_error(e, || "Row not found".to_string())
}

fn parse_column<T>(raw: &str, column: &str) -> PortResult<T>
where
    T: FromStr<Err = String>,
{
    raw.parse::<T>()
        .map_err(|e| PortError::Unexpected(format!("Corrupt {} column: {}", column, e)))
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    id: Uuid,
    name: String,
    role: String,
    home_class_id: Option<Uuid>,
}
impl UserRecord {
    fn to_domain(self) -> PortResult<User> {
        Ok(User {
            id: self.id,
            name: self.name,
            role: parse_column::<Role>(&self.role, "role")?,
            home_class_id: self.home_class_id,
        })
    }
}

#[derive(FromRow)]
struct DepartmentRecord {
    id: Uuid,
    name: String,
    head_user_id: Option<Uuid>,
}
impl DepartmentRecord {
    fn to_domain(self) -> Department {
        Department {
            id: self.id,
            name: self.name,
            head_user_id: self.head_user_id,
        }
    }
}

#[derive(FromRow)]
struct SemesterRecord {
    id: Uuid,
    number: i32,
    department_id: Uuid,
}
impl SemesterRecord {
    fn to_domain(self) -> Semester {
        Semester {
            id: self.id,
            number: self.number,
            department_id: self.department_id,
        }
    }
}

#[derive(FromRow)]
struct ClassRecord {
    id: Uuid,
    name: String,
    semester_id: Uuid,
    coordinator_user_id: Option<Uuid>,
}
impl ClassRecord {
    fn to_domain(self) -> Class {
        Class {
            id: self.id,
            name: self.name,
            semester_id: self.semester_id,
            coordinator_user_id: self.coordinator_user_id,
        }
    }
}

#[derive(FromRow)]
struct SubjectRecord {
    id: Uuid,
    name: String,
    semester_id: Uuid,
    faculty_ids: Vec<Uuid>,
}
impl SubjectRecord {
    fn to_domain(self) -> Subject {
        Subject {
            id: self.id,
            name: self.name,
            semester_id: self.semester_id,
            faculty_ids: self.faculty_ids,
        }
    }
}

#[derive(FromRow)]
struct TemplateRecord {
    id: Uuid,
    title: String,
    description: String,
    sort_order: i32,
    is_active: bool,
}
impl TemplateRecord {
    fn to_domain(self) -> TaskTemplate {
        TaskTemplate {
            id: self.id,
            title: self.title,
            description: self.description,
            order: self.sort_order,
            is_active: self.is_active,
        }
    }
}

#[derive(FromRow)]
struct AssignmentRecord {
    id: Uuid,
    subject_id: Uuid,
    faculty_id: Uuid,
    class_id: Uuid,
    created_at: DateTime<Utc>,
}
impl AssignmentRecord {
    fn to_domain(self) -> Assignment {
        Assignment {
            id: self.id,
            subject_id: self.subject_id,
            faculty_id: self.faculty_id,
            class_id: self.class_id,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct TaskRecord {
    id: Uuid,
    assignment_id: Uuid,
    template_id: Uuid,
    deadline: DateTime<Utc>,
    status: String,
    completed_at: Option<DateTime<Utc>>,
    cc_status: String,
    cc_remarks: Option<String>,
    cc_review_date: Option<DateTime<Utc>>,
    hod_status: String,
    hod_remarks: Option<String>,
    hod_review_date: Option<DateTime<Utc>>,
}
impl TaskRecord {
    fn to_domain(self) -> PortResult<Task> {
        Ok(Task {
            id: self.id,
            assignment_id: self.assignment_id,
            template_id: self.template_id,
            deadline: self.deadline,
            status: parse_column::<TaskStatus>(&self.status, "status")?,
            completed_at: self.completed_at,
            cc_status: parse_column::<ReviewStatus>(&self.cc_status, "cc_status")?,
            cc_remarks: self.cc_remarks,
            cc_review_date: self.cc_review_date,
            hod_status: parse_column::<ReviewStatus>(&self.hod_status, "hod_status")?,
            hod_remarks: self.hod_remarks,
            hod_review_date: self.hod_review_date,
        })
    }
}

#[derive(FromRow)]
struct TaskViewRecord {
    #[sqlx(flatten)]
    task: TaskRecord,
    template_title: String,
    template_order: i32,
}
impl TaskViewRecord {
    fn to_domain(self) -> PortResult<TaskView> {
        Ok(TaskView {
            task: self.task.to_domain()?,
            template_title: self.template_title,
            template_order: self.template_order,
        })
    }
}

#[derive(FromRow)]
struct OverdueRecord {
    #[sqlx(flatten)]
    task: TaskRecord,
    template_title: String,
    faculty_id: Uuid,
    class_name: String,
    subject_name: String,
}
impl OverdueRecord {
    fn to_domain(self, now: DateTime<Utc>) -> PortResult<OverdueTask> {
        let task = self.task.to_domain()?;
        Ok(OverdueTask {
            assignment_id: task.assignment_id,
            days_overdue: (now - task.deadline).num_days(),
            task,
            template_title: self.template_title,
            faculty_id: self.faculty_id,
            class_name: self.class_name,
            subject_name: self.subject_name,
        })
    }
}

#[derive(FromRow)]
struct AuditRecord {
    id: Uuid,
    action: String,
    message: String,
    actor_id: Uuid,
    actor_name: String,
    assignment_id: Option<Uuid>,
    class_name: Option<String>,
    subject_name: Option<String>,
    task_title: Option<String>,
    metadata: Option<serde_json::Value>,
    created_at: DateTime<Utc>,
}
impl AuditRecord {
    fn to_domain(self) -> PortResult<AuditLogEntry> {
        Ok(AuditLogEntry {
            id: self.id,
            action: parse_column::<AuditAction>(&self.action, "action")?,
            message: self.message,
            actor_id: self.actor_id,
            actor_name: self.actor_name,
            assignment_id: self.assignment_id,
            class_name: self.class_name,
            subject_name: self.subject_name,
            task_title: self.task_title,
            metadata: self.metadata,
            created_at: self.created_at,
        })
    }
}

//=========================================================================================
// `WorkflowStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl WorkflowStore for DbAdapter {
    async fn get_user(&self, user_id: Uuid) -> PortResult<User> {
        sqlx::query_as::<_, UserRecord>(
            "SELECT id, name, role, home_class_id FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error(e, || format!("User {} not found", user_id)))?
        .to_domain()
    }

    async fn get_department(&self, department_id: Uuid) -> PortResult<Department> {
        let record = sqlx::query_as::<_, DepartmentRecord>(
            "SELECT id, name, head_user_id FROM departments WHERE id = $1",
        )
        .bind(department_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error(e, || format!("Department {} not found", department_id)))?;
        Ok(record.to_domain())
    }

    async fn get_semester(&self, semester_id: Uuid) -> PortResult<Semester> {
        let record = sqlx::query_as::<_, SemesterRecord>(
            "SELECT id, number, department_id FROM semesters WHERE id = $1",
        )
        .bind(semester_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error(e, || format!("Semester {} not found", semester_id)))?;
        Ok(record.to_domain())
    }

    async fn get_class(&self, class_id: Uuid) -> PortResult<Class> {
        let record = sqlx::query_as::<_, ClassRecord>(
            "SELECT id, name, semester_id, coordinator_user_id FROM classes WHERE id = $1",
        )
        .bind(class_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error(e, || format!("Class {} not found", class_id)))?;
        Ok(record.to_domain())
    }

    async fn get_subject(&self, subject_id: Uuid) -> PortResult<Subject> {
        let record = sqlx::query_as::<_, SubjectRecord>(
            "SELECT s.id, s.name, s.semester_id, \
                    ARRAY(SELECT sf.user_id FROM subject_faculty sf \
                          WHERE sf.subject_id = s.id ORDER BY sf.user_id) AS faculty_ids \
             FROM subjects s WHERE s.id = $1",
        )
        .bind(subject_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error(e, || format!("Subject {} not found", subject_id)))?;
        Ok(record.to_domain())
    }

    async fn departments_headed_by(&self, user_id: Uuid) -> PortResult<Vec<Department>> {
        let records = sqlx::query_as::<_, DepartmentRecord>(
            "SELECT id, name, head_user_id FROM departments WHERE head_user_id = $1 ORDER BY name",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn class_coordinated_by(&self, user_id: Uuid) -> PortResult<Option<Class>> {
        let record = sqlx::query_as::<_, ClassRecord>(
            "SELECT id, name, semester_id, coordinator_user_id FROM classes \
             WHERE coordinator_user_id = $1 ORDER BY name LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.map(|r| r.to_domain()))
    }

    async fn list_semesters(&self, department_id: Uuid) -> PortResult<Vec<Semester>> {
        let records = sqlx::query_as::<_, SemesterRecord>(
            "SELECT id, number, department_id FROM semesters WHERE department_id = $1 ORDER BY number",
        )
        .bind(department_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn list_classes(&self, semester_id: Uuid) -> PortResult<Vec<Class>> {
        let records = sqlx::query_as::<_, ClassRecord>(
            "SELECT id, name, semester_id, coordinator_user_id FROM classes \
             WHERE semester_id = $1 ORDER BY name",
        )
        .bind(semester_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn list_templates(&self, active_only: bool) -> PortResult<Vec<TaskTemplate>> {
        let sql = format!(
            "SELECT {TEMPLATE_COLUMNS} FROM task_templates \
             WHERE ($1 = FALSE OR is_active) ORDER BY sort_order, title"
        );
        let records = sqlx::query_as::<_, TemplateRecord>(&sql)
            .bind(active_only)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn get_template(&self, template_id: Uuid) -> PortResult<TaskTemplate> {
        let sql = format!("SELECT {TEMPLATE_COLUMNS} FROM task_templates WHERE id = $1");
        let record = sqlx::query_as::<_, TemplateRecord>(&sql)
            .bind(template_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error(e, || format!("Template {} not found", template_id)))?;
        Ok(record.to_domain())
    }

    async fn insert_template(&self, template: TaskTemplate) -> PortResult<TaskTemplate> {
        let sql = format!(
            "INSERT INTO task_templates ({TEMPLATE_COLUMNS}) VALUES ($1, $2, $3, $4, $5) \
             RETURNING {TEMPLATE_COLUMNS}"
        );
        let record = sqlx::query_as::<_, TemplateRecord>(&sql)
            .bind(template.id)
            .bind(&template.title)
            .bind(&template.description)
            .bind(template.order)
            .bind(template.is_active)
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn update_template(&self, template: TaskTemplate) -> PortResult<TaskTemplate> {
        let sql = format!(
            "UPDATE task_templates SET title = $2, description = $3, sort_order = $4, is_active = $5 \
             WHERE id = $1 RETURNING {TEMPLATE_COLUMNS}"
        );
        let record = sqlx::query_as::<_, TemplateRecord>(&sql)
            .bind(template.id)
            .bind(&template.title)
            .bind(&template.description)
            .bind(template.order)
            .bind(template.is_active)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error(e, || format!("Template {} not found", template.id)))?;
        Ok(record.to_domain())
    }

    async fn create_assignment_with_tasks(
        &self,
        assignment: Assignment,
        tasks: Vec<Task>,
    ) -> PortResult<Assignment> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        let record = sqlx::query_as::<_, AssignmentRecord>(
            "INSERT INTO assignments (id, subject_id, faculty_id, class_id, created_at) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, subject_id, faculty_id, class_id, created_at",
        )
        .bind(assignment.id)
        .bind(assignment.subject_id)
        .bind(assignment.faculty_id)
        .bind(assignment.class_id)
        .bind(assignment.created_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match db_error(e, String::new) {
            PortError::Conflict(_) => PortError::Conflict(
                "An assignment already exists for this subject, faculty and class".to_string(),
            ),
            other => other,
        })?;

        for task in &tasks {
            sqlx::query(
                "INSERT INTO tasks (id, assignment_id, template_id, deadline, status, cc_status, hod_status) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(task.id)
            .bind(task.assignment_id)
            .bind(task.template_id)
            .bind(task.deadline)
            .bind(task.status.as_str())
            .bind(task.cc_status.as_str())
            .bind(task.hod_status.as_str())
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;
        }

        tx.commit().await.map_err(unexpected)?;
        debug!(assignment_id = %record.id, tasks = tasks.len(), "Assignment persisted");
        Ok(record.to_domain())
    }

    async fn get_assignment(&self, assignment_id: Uuid) -> PortResult<Assignment> {
        let record = sqlx::query_as::<_, AssignmentRecord>(
            "SELECT id, subject_id, faculty_id, class_id, created_at FROM assignments WHERE id = $1",
        )
        .bind(assignment_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error(e, || format!("Assignment {} not found", assignment_id)))?;
        Ok(record.to_domain())
    }

    async fn find_assignment(
        &self,
        subject_id: Uuid,
        faculty_id: Uuid,
        class_id: Uuid,
    ) -> PortResult<Option<Assignment>> {
        let record = sqlx::query_as::<_, AssignmentRecord>(
            "SELECT id, subject_id, faculty_id, class_id, created_at FROM assignments \
             WHERE subject_id = $1 AND faculty_id = $2 AND class_id = $3",
        )
        .bind(subject_id)
        .bind(faculty_id)
        .bind(class_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.map(|r| r.to_domain()))
    }

    async fn list_assignments_for_class(&self, class_id: Uuid) -> PortResult<Vec<Assignment>> {
        let records = sqlx::query_as::<_, AssignmentRecord>(
            "SELECT id, subject_id, faculty_id, class_id, created_at FROM assignments \
             WHERE class_id = $1 ORDER BY created_at",
        )
        .bind(class_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn delete_assignment(&self, assignment_id: Uuid) -> PortResult<u64> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        let removed_tasks = sqlx::query("DELETE FROM tasks WHERE assignment_id = $1")
            .bind(assignment_id)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?
            .rows_affected();

        let removed = sqlx::query("DELETE FROM assignments WHERE id = $1")
            .bind(assignment_id)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?
            .rows_affected();
        if removed == 0 {
            return Err(PortError::NotFound(format!(
                "Assignment {} not found",
                assignment_id
            )));
        }

        tx.commit().await.map_err(unexpected)?;
        Ok(removed_tasks)
    }

    async fn get_task(&self, task_id: Uuid) -> PortResult<Task> {
        let sql = format!("SELECT {TASK_COLUMNS} FROM tasks t WHERE t.id = $1");
        sqlx::query_as::<_, TaskRecord>(&sql)
            .bind(task_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error(e, || format!("Task {} not found", task_id)))?
            .to_domain()
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
        let sql = format!(
            "SELECT {TASK_COLUMNS}, tt.title AS template_title, tt.sort_order AS template_order \
             FROM tasks t JOIN task_templates tt ON tt.id = t.template_id \
             WHERE t.assignment_id = $1 ORDER BY tt.sort_order, tt.title"
        );
        let records = sqlx::query_as::<_, TaskViewRecord>(&sql)
            .bind(assignment_id)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn update_task_if(&self, task: &Task, expected: TaskState) -> PortResult<Option<Task>> {
        let sql = format!(
            "UPDATE tasks AS t SET status = $2, completed_at = $3, \
                    cc_status = $4, cc_remarks = $5, cc_review_date = $6, \
                    hod_status = $7, hod_remarks = $8, hod_review_date = $9 \
             WHERE t.id = $1 AND t.status = $10 AND t.cc_status = $11 AND t.hod_status = $12 \
             RETURNING {TASK_COLUMNS}"
        );
        let record = sqlx::query_as::<_, TaskRecord>(&sql)
            .bind(task.id)
            .bind(task.status.as_str())
            .bind(task.completed_at)
            .bind(task.cc_status.as_str())
            .bind(&task.cc_remarks)
            .bind(task.cc_review_date)
            .bind(task.hod_status.as_str())
            .bind(&task.hod_remarks)
            .bind(task.hod_review_date)
            .bind(expected.status.as_str())
            .bind(expected.cc_status.as_str())
            .bind(expected.hod_status.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?;

        match record {
            Some(record) => record.to_domain().map(Some),
            None => {
                // Distinguish a stale snapshot from a task that no longer exists.
                self.get_task(task.id).await?;
                Ok(None)
            }
        }
    }

    async fn update_task_deadline(
        &self,
        task_id: Uuid,
        deadline: DateTime<Utc>,
    ) -> PortResult<Task> {
        let sql = format!(
            "UPDATE tasks AS t SET deadline = $2 WHERE t.id = $1 RETURNING {TASK_COLUMNS}"
        );
        sqlx::query_as::<_, TaskRecord>(&sql)
            .bind(task_id)
            .bind(deadline)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error(e, || format!("Task {} not found", task_id)))?
            .to_domain()
    }

    async fn batch_review_hod(
        &self,
        assignment_id: Uuid,
        decision: ReviewStatus,
        remarks: &str,
        at: DateTime<Utc>,
    ) -> PortResult<u64> {
        let result = sqlx::query(
            "UPDATE tasks SET hod_status = $2, hod_remarks = $3, hod_review_date = $4 \
             WHERE assignment_id = $1 AND status = 'COMPLETED' \
               AND cc_status = 'YES' AND hod_status = 'PENDING'",
        )
        .bind(assignment_id)
        .bind(decision.as_str())
        .bind(remarks)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(result.rows_affected())
    }

    async fn overdue_tasks(
        &self,
        scope: &AlertScope,
        now: DateTime<Utc>,
        limit: u32,
    ) -> PortResult<Vec<OverdueTask>> {
        let (departments, class_id, faculty_id) = match scope {
            AlertScope::Global => (None, None, None),
            AlertScope::Departments(ids) => (Some(ids.clone()), None, None),
            AlertScope::Class(id) => (None, Some(*id), None),
            AlertScope::Faculty(id) => (None, None, Some(*id)),
        };

        let sql = format!(
            "SELECT {TASK_COLUMNS}, tt.title AS template_title, a.faculty_id, \
                    c.name AS class_name, s.name AS subject_name \
             FROM tasks t \
             JOIN assignments a ON a.id = t.assignment_id \
             JOIN classes c ON c.id = a.class_id \
             JOIN semesters sem ON sem.id = c.semester_id \
             JOIN subjects s ON s.id = a.subject_id \
             JOIN task_templates tt ON tt.id = t.template_id \
             WHERE t.status = 'PENDING' AND t.deadline < $1 \
               AND ($2::uuid[] IS NULL OR sem.department_id = ANY($2)) \
               AND ($3::uuid IS NULL OR a.class_id = $3) \
               AND ($4::uuid IS NULL OR a.faculty_id = $4) \
             ORDER BY t.deadline ASC \
             LIMIT $5"
        );
        let records = sqlx::query_as::<_, OverdueRecord>(&sql)
            .bind(now)
            .bind(departments)
            .bind(class_id)
            .bind(faculty_id)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        records.into_iter().map(|r| r.to_domain(now)).collect()
    }
}

//=========================================================================================
// `AuditLogService` Trait Implementation
//=========================================================================================

#[async_trait]
impl AuditLogService for DbAdapter {
    async fn append(&self, entry: AuditLogEntry) -> PortResult<()> {
        sqlx::query(&format!(
            "INSERT INTO audit_logs ({AUDIT_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"
        ))
        .bind(entry.id)
        .bind(entry.action.as_str())
        .bind(&entry.message)
        .bind(entry.actor_id)
        .bind(&entry.actor_name)
        .bind(entry.assignment_id)
        .bind(&entry.class_name)
        .bind(&entry.subject_name)
        .bind(&entry.task_title)
        .bind(&entry.metadata)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn list(&self, filter: &AuditFilter) -> PortResult<Vec<AuditLogEntry>> {
        let sql = format!(
            "SELECT {AUDIT_COLUMNS} FROM audit_logs \
             WHERE ($1::uuid IS NULL OR assignment_id = $1) \
               AND ($2::uuid IS NULL OR actor_id = $2) \
               AND ($3::text IS NULL OR action = $3) \
             ORDER BY created_at DESC, id \
             LIMIT $4"
        );
        let records = sqlx::query_as::<_, AuditRecord>(&sql)
            .bind(filter.assignment_id)
            .bind(filter.actor_id)
            .bind(filter.action.map(|a| a.as_str()))
            .bind(filter.limit.map(i64::from))
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        records.into_iter().map(|r| r.to_domain()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task_record(status: &str, cc_status: &str) -> TaskRecord {
        TaskRecord {
            id: Uuid::new_v4(),
            assignment_id: Uuid::new_v4(),
            template_id: Uuid::new_v4(),
            deadline: Utc::now(),
            status: status.to_string(),
            completed_at: None,
            cc_status: cc_status.to_string(),
            cc_remarks: None,
            cc_review_date: None,
            hod_status: "PENDING".to_string(),
            hod_remarks: None,
            hod_review_date: None,
        }
    }

    #[test]
    fn task_rows_convert_to_domain() {
        let task = task_record("COMPLETED", "YES").to_domain().unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.cc_status, ReviewStatus::Yes);
        assert_eq!(task.hod_status, ReviewStatus::Pending);
    }

    #[test]
    fn corrupt_enum_columns_surface_as_unexpected() {
        let err = task_record("DONE", "PENDING").to_domain().unwrap_err();
        assert!(matches!(err, PortError::Unexpected(msg) if msg.contains("status")));
    }

    #[test]
    fn row_not_found_maps_to_not_found() {
        let err = db_error(sqlx::Error::RowNotFound, || "Task x not found".to_string());
        assert_eq!(err, PortError::NotFound("Task x not found".to_string()));
    }

    #[test]
    fn overdue_rows_compute_whole_days() {
        let mut record = task_record("PENDING", "PENDING");
        let now = Utc::now();
        record.deadline = now - chrono::Duration::hours(50);
        let overdue = OverdueRecord {
            task: record,
            template_title: "Lesson Plan".to_string(),
            faculty_id: Uuid::new_v4(),
            class_name: "CSE-3A".to_string(),
            subject_name: "Data Structures".to_string(),
        }
        .to_domain(now)
        .unwrap();
        assert_eq!(overdue.days_overdue, 2);
        assert_eq!(overdue.assignment_id, overdue.task.assignment_id);
    }
}
