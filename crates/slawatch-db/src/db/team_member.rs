use slawatch_core::{
    models::{CreateTeamMemberRequest, TeamMember, TeamMemberFilter, UpdateTeamMemberRequest},
    AppError,
};
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

const TEAM_MEMBER_COLUMNS: &str =
    "id, name, email, app_password, department_id, is_active, created_at";

/// Repository for team members
#[derive(Clone)]
pub struct TeamMemberRepository {
    pool: PgPool,
}

impl TeamMemberRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a member. The address is expected to be normalized already.
    #[tracing::instrument(skip(self, request), fields(db.table = "team_members", db.operation = "insert"))]
    pub async fn create(&self, request: &CreateTeamMemberRequest) -> Result<TeamMember, AppError> {
        let member = sqlx::query_as::<Postgres, TeamMember>(&format!(
            r#"
            INSERT INTO team_members (name, email, app_password, department_id)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            TEAM_MEMBER_COLUMNS
        ))
        .bind(&request.name)
        .bind(&request.email)
        .bind(request.app_password.as_deref())
        .bind(request.department_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(member)
    }

    #[tracing::instrument(skip(self), fields(db.table = "team_members", db.operation = "select", db.record_id = %id))]
    pub async fn get(&self, id: Uuid) -> Result<Option<TeamMember>, AppError> {
        let member = sqlx::query_as::<Postgres, TeamMember>(&format!(
            "SELECT {} FROM team_members WHERE id = $1",
            TEAM_MEMBER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(member)
    }

    #[tracing::instrument(skip(self), fields(db.table = "team_members", db.operation = "select"))]
    pub async fn find_by_email(&self, email: &str) -> Result<Option<TeamMember>, AppError> {
        let member = sqlx::query_as::<Postgres, TeamMember>(&format!(
            "SELECT {} FROM team_members WHERE LOWER(email) = LOWER($1)",
            TEAM_MEMBER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(member)
    }

    #[tracing::instrument(skip(self), fields(db.table = "team_members", db.operation = "select"))]
    pub async fn list(&self, filter: &TeamMemberFilter) -> Result<Vec<TeamMember>, AppError> {
        let members = sqlx::query_as::<Postgres, TeamMember>(&format!(
            r#"
            SELECT {}
            FROM team_members
            WHERE ($1::uuid IS NULL OR department_id = $1)
              AND ($2::boolean IS NULL OR is_active = $2)
            ORDER BY name ASC
            "#,
            TEAM_MEMBER_COLUMNS
        ))
        .bind(filter.department_id)
        .bind(filter.is_active)
        .fetch_all(&self.pool)
        .await?;

        Ok(members)
    }

    #[tracing::instrument(skip(self, changes), fields(db.table = "team_members", db.operation = "update", db.record_id = %id))]
    pub async fn update(
        &self,
        id: Uuid,
        changes: &UpdateTeamMemberRequest,
    ) -> Result<Option<TeamMember>, AppError> {
        let member = sqlx::query_as::<Postgres, TeamMember>(&format!(
            r#"
            UPDATE team_members
            SET name = COALESCE($2, name),
                email = COALESCE($3, email),
                app_password = COALESCE($4, app_password),
                department_id = COALESCE($5, department_id),
                is_active = COALESCE($6, is_active)
            WHERE id = $1
            RETURNING {}
            "#,
            TEAM_MEMBER_COLUMNS
        ))
        .bind(id)
        .bind(changes.name.as_deref())
        .bind(changes.email.as_deref())
        .bind(changes.app_password.as_deref())
        .bind(changes.department_id)
        .bind(changes.is_active)
        .fetch_optional(&self.pool)
        .await?;

        Ok(member)
    }

    #[tracing::instrument(skip(self), fields(db.table = "team_members", db.operation = "delete", db.record_id = %id))]
    pub async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM team_members WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(skip(self), fields(db.table = "emails", db.operation = "count"))]
    pub async fn count_emails(&self, id: Uuid) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<Postgres, i64>(
            "SELECT COUNT(*) FROM emails WHERE team_member_id = $1",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}
