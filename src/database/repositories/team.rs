use chrono::Utc;
use sqlx::{Sqlite, SqlitePool, Transaction};
use uuid::Uuid;

use crate::database::models::{Team, TeamInput, TeamMember, TeamMemberDetail, TeamRole};

#[derive(Clone)]
pub struct TeamRepository {
    pool: SqlitePool,
}

impl TeamRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, input: &TeamInput, created_by: Uuid) -> Result<Team, sqlx::Error> {
        let now = Utc::now();
        sqlx::query_as::<_, Team>(
            r#"
            INSERT INTO teams (id, name, description, created_by, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING id, name, description, created_by, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&input.name)
        .bind(&input.description)
        .bind(created_by)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Team>, sqlx::Error> {
        sqlx::query_as::<_, Team>(
            "SELECT id, name, description, created_by, created_at, updated_at FROM teams WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn list_all(&self) -> Result<Vec<Team>, sqlx::Error> {
        sqlx::query_as::<_, Team>(
            "SELECT id, name, description, created_by, created_at, updated_at FROM teams ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
    }

    pub async fn list_for_profile(&self, profile_id: Uuid) -> Result<Vec<Team>, sqlx::Error> {
        sqlx::query_as::<_, Team>(
            r#"
            SELECT t.id, t.name, t.description, t.created_by, t.created_at, t.updated_at
            FROM teams t
            JOIN team_members tm ON tm.team_id = t.id
            WHERE tm.profile_id = ?
            ORDER BY t.name
            "#,
        )
        .bind(profile_id)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn list_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Team>, sqlx::Error> {
        let mut teams = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(team) = self.find_by_id(*id).await? {
                teams.push(team);
            }
        }
        teams.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(teams)
    }

    pub async fn update(&self, id: Uuid, input: &TeamInput) -> Result<Option<Team>, sqlx::Error> {
        sqlx::query_as::<_, Team>(
            r#"
            UPDATE teams SET name = ?, description = ?, updated_at = ?
            WHERE id = ?
            RETURNING id, name, description, created_by, created_at, updated_at
            "#,
        )
        .bind(&input.name)
        .bind(&input.description)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM teams WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Teams in which the profile holds the manager role
    pub async fn managed_team_ids(&self, profile_id: Uuid) -> Result<Vec<Uuid>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT team_id FROM team_members WHERE profile_id = ? AND role = ? ORDER BY team_id",
        )
        .bind(profile_id)
        .bind(TeamRole::Manager)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn is_member(&self, team_id: Uuid, profile_id: Uuid) -> Result<bool, sqlx::Error> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM team_members WHERE team_id = ? AND profile_id = ?",
        )
        .bind(team_id)
        .bind(profile_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    pub async fn is_member_tx(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        team_id: Uuid,
        profile_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM team_members WHERE team_id = ? AND profile_id = ?",
        )
        .bind(team_id)
        .bind(profile_id)
        .fetch_one(&mut **tx)
        .await?;
        Ok(count > 0)
    }

    /// Whether `manager_id` manages any team that `employee_id` belongs to
    pub async fn manages_employee(
        &self,
        manager_id: Uuid,
        employee_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM team_members m
            JOIN team_members e ON e.team_id = m.team_id
            WHERE m.profile_id = ? AND m.role = ? AND e.profile_id = ?
            "#,
        )
        .bind(manager_id)
        .bind(TeamRole::Manager)
        .bind(employee_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    pub async fn members(&self, team_id: Uuid) -> Result<Vec<TeamMemberDetail>, sqlx::Error> {
        sqlx::query_as::<_, TeamMemberDetail>(
            r#"
            SELECT tm.id, tm.team_id, tm.profile_id, tm.role, p.full_name, p.email, p.avatar_url
            FROM team_members tm
            JOIN profiles p ON p.id = tm.profile_id
            WHERE tm.team_id = ?
            ORDER BY p.full_name
            "#,
        )
        .bind(team_id)
        .fetch_all(&self.pool)
        .await
    }

    /// Team roster minus one profile, read fresh on every call
    pub async fn members_excluding(
        &self,
        team_id: Uuid,
        excluded: Uuid,
    ) -> Result<Vec<TeamMemberDetail>, sqlx::Error> {
        sqlx::query_as::<_, TeamMemberDetail>(
            r#"
            SELECT tm.id, tm.team_id, tm.profile_id, tm.role, p.full_name, p.email, p.avatar_url
            FROM team_members tm
            JOIN profiles p ON p.id = tm.profile_id
            WHERE tm.team_id = ? AND tm.profile_id != ?
            ORDER BY p.full_name
            "#,
        )
        .bind(team_id)
        .bind(excluded)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn find_member(&self, member_id: Uuid) -> Result<Option<TeamMember>, sqlx::Error> {
        sqlx::query_as::<_, TeamMember>(
            "SELECT id, team_id, profile_id, role, created_at FROM team_members WHERE id = ?",
        )
        .bind(member_id)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn add_member(
        &self,
        team_id: Uuid,
        profile_id: Uuid,
        role: TeamRole,
    ) -> Result<TeamMember, sqlx::Error> {
        sqlx::query_as::<_, TeamMember>(
            r#"
            INSERT INTO team_members (id, team_id, profile_id, role, created_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING id, team_id, profile_id, role, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(team_id)
        .bind(profile_id)
        .bind(role)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
    }

    pub async fn remove_member(&self, member_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM team_members WHERE id = ?")
            .bind(member_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
