use slawatch_core::{
    models::{Department, UpdateDepartmentRequest},
    AppError,
};
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

const DEPARTMENT_COLUMNS: &str = "id, name, sla_threshold_hours, created_at";

/// Repository for departments
#[derive(Clone)]
pub struct DepartmentRepository {
    pool: PgPool,
}

impl DepartmentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a department. A duplicate name surfaces as `AppError::Conflict`.
    #[tracing::instrument(skip(self), fields(db.table = "departments", db.operation = "insert"))]
    pub async fn create(&self, name: &str, sla_threshold_hours: f64) -> Result<Department, AppError> {
        let department = sqlx::query_as::<Postgres, Department>(&format!(
            "INSERT INTO departments (name, sla_threshold_hours) VALUES ($1, $2) RETURNING {}",
            DEPARTMENT_COLUMNS
        ))
        .bind(name)
        .bind(sla_threshold_hours)
        .fetch_one(&self.pool)
        .await?;

        Ok(department)
    }

    #[tracing::instrument(skip(self), fields(db.table = "departments", db.operation = "select", db.record_id = %id))]
    pub async fn get(&self, id: Uuid) -> Result<Option<Department>, AppError> {
        let department = sqlx::query_as::<Postgres, Department>(&format!(
            "SELECT {} FROM departments WHERE id = $1",
            DEPARTMENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(department)
    }

    #[tracing::instrument(skip(self), fields(db.table = "departments", db.operation = "select"))]
    pub async fn find_by_name(&self, name: &str) -> Result<Option<Department>, AppError> {
        let department = sqlx::query_as::<Postgres, Department>(&format!(
            "SELECT {} FROM departments WHERE name = $1",
            DEPARTMENT_COLUMNS
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(department)
    }

    #[tracing::instrument(skip(self), fields(db.table = "departments", db.operation = "select"))]
    pub async fn list(&self) -> Result<Vec<Department>, AppError> {
        let departments = sqlx::query_as::<Postgres, Department>(&format!(
            "SELECT {} FROM departments ORDER BY name ASC",
            DEPARTMENT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(departments)
    }

    /// Apply the fields present in `changes`. Returns `None` for an unknown id.
    #[tracing::instrument(skip(self, changes), fields(db.table = "departments", db.operation = "update", db.record_id = %id))]
    pub async fn update(
        &self,
        id: Uuid,
        changes: &UpdateDepartmentRequest,
    ) -> Result<Option<Department>, AppError> {
        let department = sqlx::query_as::<Postgres, Department>(&format!(
            r#"
            UPDATE departments
            SET name = COALESCE($2, name),
                sla_threshold_hours = COALESCE($3, sla_threshold_hours)
            WHERE id = $1
            RETURNING {}
            "#,
            DEPARTMENT_COLUMNS
        ))
        .bind(id)
        .bind(changes.name.as_deref())
        .bind(changes.sla_threshold_hours)
        .fetch_optional(&self.pool)
        .await?;

        Ok(department)
    }

    /// Delete a department. Members still referencing it make this fail with
    /// `AppError::Conflict` (foreign key).
    #[tracing::instrument(skip(self), fields(db.table = "departments", db.operation = "delete", db.record_id = %id))]
    pub async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM departments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(skip(self), fields(db.table = "team_members", db.operation = "count"))]
    pub async fn count_members(&self, id: Uuid) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<Postgres, i64>(
            "SELECT COUNT(*) FROM team_members WHERE department_id = $1",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}
