use chrono::Utc;
use sqlx::{Sqlite, SqlitePool, Transaction};
use uuid::Uuid;

use crate::database::models::{GlobalRole, Profile, ProfileSummary};

#[derive(Clone)]
pub struct ProfileRepository {
    pool: SqlitePool,
}

impl ProfileRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, profile: &Profile) -> Result<Profile, sqlx::Error> {
        sqlx::query_as::<_, Profile>(
            r#"
            INSERT INTO profiles (id, email, password_hash, full_name, role, avatar_url,
                                  email_confirmed_at, session_epoch, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id, email, password_hash, full_name, role, avatar_url,
                      email_confirmed_at, session_epoch, created_at, updated_at
            "#,
        )
        .bind(profile.id)
        .bind(&profile.email)
        .bind(&profile.password_hash)
        .bind(&profile.full_name)
        .bind(profile.role)
        .bind(&profile.avatar_url)
        .bind(profile.email_confirmed_at)
        .bind(profile.session_epoch)
        .bind(profile.created_at)
        .bind(profile.updated_at)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Profile>, sqlx::Error> {
        sqlx::query_as::<_, Profile>(
            r#"
            SELECT id, email, password_hash, full_name, role, avatar_url,
                   email_confirmed_at, session_epoch, created_at, updated_at
            FROM profiles
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<Profile>, sqlx::Error> {
        sqlx::query_as::<_, Profile>(
            r#"
            SELECT id, email, password_hash, full_name, role, avatar_url,
                   email_confirmed_at, session_epoch, created_at, updated_at
            FROM profiles
            WHERE email = ?
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn email_exists(&self, email: &str) -> Result<bool, sqlx::Error> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM profiles WHERE email = ?")
            .bind(email)
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    pub async fn list_all(&self) -> Result<Vec<Profile>, sqlx::Error> {
        sqlx::query_as::<_, Profile>(
            r#"
            SELECT id, email, password_hash, full_name, role, avatar_url,
                   email_confirmed_at, session_epoch, created_at, updated_at
            FROM profiles
            ORDER BY full_name
            "#,
        )
        .fetch_all(&self.pool)
        .await
    }

    /// The viewer plus everyone sharing at least one team with them
    pub async fn list_visible_to(&self, viewer_id: Uuid) -> Result<Vec<Profile>, sqlx::Error> {
        sqlx::query_as::<_, Profile>(
            r#"
            SELECT p.id, p.email, p.password_hash, p.full_name, p.role, p.avatar_url,
                   p.email_confirmed_at, p.session_epoch, p.created_at, p.updated_at
            FROM profiles p
            WHERE p.id = ?
               OR p.id IN (
                    SELECT other.profile_id
                    FROM team_members mine
                    JOIN team_members other ON other.team_id = mine.team_id
                    WHERE mine.profile_id = ?
               )
            ORDER BY p.full_name
            "#,
        )
        .bind(viewer_id)
        .bind(viewer_id)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn shares_team(&self, a: Uuid, b: Uuid) -> Result<bool, sqlx::Error> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM team_members x
            JOIN team_members y ON y.team_id = x.team_id
            WHERE x.profile_id = ? AND y.profile_id = ?
            "#,
        )
        .bind(a)
        .bind(b)
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    /// Profiles that are not yet members of the team
    pub async fn available_for_team(
        &self,
        team_id: Uuid,
    ) -> Result<Vec<ProfileSummary>, sqlx::Error> {
        sqlx::query_as::<_, ProfileSummary>(
            r#"
            SELECT id, email, full_name, avatar_url
            FROM profiles
            WHERE id NOT IN (SELECT profile_id FROM team_members WHERE team_id = ?)
            ORDER BY full_name
            "#,
        )
        .bind(team_id)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn update_full_name(&self, id: Uuid, full_name: &str) -> Result<Profile, sqlx::Error> {
        sqlx::query_as::<_, Profile>(
            r#"
            UPDATE profiles SET full_name = ?, updated_at = ?
            WHERE id = ?
            RETURNING id, email, password_hash, full_name, role, avatar_url,
                      email_confirmed_at, session_epoch, created_at, updated_at
            "#,
        )
        .bind(full_name)
        .bind(Utc::now())
        .bind(id)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn update_role(&self, id: Uuid, role: GlobalRole) -> Result<Profile, sqlx::Error> {
        sqlx::query_as::<_, Profile>(
            r#"
            UPDATE profiles SET role = ?, updated_at = ?
            WHERE id = ?
            RETURNING id, email, password_hash, full_name, role, avatar_url,
                      email_confirmed_at, session_epoch, created_at, updated_at
            "#,
        )
        .bind(role)
        .bind(Utc::now())
        .bind(id)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn update_avatar_url(&self, id: Uuid, url: &str) -> Result<Profile, sqlx::Error> {
        sqlx::query_as::<_, Profile>(
            r#"
            UPDATE profiles SET avatar_url = ?, updated_at = ?
            WHERE id = ?
            RETURNING id, email, password_hash, full_name, role, avatar_url,
                      email_confirmed_at, session_epoch, created_at, updated_at
            "#,
        )
        .bind(url)
        .bind(Utc::now())
        .bind(id)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn update_password_hash(&self, id: Uuid, hash: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE profiles SET password_hash = ?, updated_at = ? WHERE id = ?")
            .bind(hash)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Revokes every token issued so far and returns the new epoch
    pub async fn bump_session_epoch(&self, id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            UPDATE profiles SET session_epoch = session_epoch + 1, updated_at = ?
            WHERE id = ?
            RETURNING session_epoch
            "#,
        )
        .bind(Utc::now())
        .bind(id)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn confirm_email(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        id: Uuid,
    ) -> Result<(), sqlx::Error> {
        let now = Utc::now();
        sqlx::query(
            r#"
            UPDATE profiles SET email_confirmed_at = COALESCE(email_confirmed_at, ?), updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(now)
        .bind(now)
        .bind(id)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    pub async fn change_email(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        id: Uuid,
        email: &str,
    ) -> Result<(), sqlx::Error> {
        let now = Utc::now();
        sqlx::query(
            r#"
            UPDATE profiles SET email = ?, email_confirmed_at = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(email)
        .bind(now)
        .bind(now)
        .bind(id)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}
