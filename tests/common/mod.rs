#![allow(dead_code)]

use actix_web::body::MessageBody;
use actix_web::dev::ServiceResponse;
use actix_web::{test, web};
use anyhow::Result;
use chrono::{Duration, NaiveDate, NaiveTime, Utc};
use fake::Fake;
use fake::faker::internet::en::SafeEmail;
use fake::faker::name::en::Name;
use serde_json::Value;
use sqlx::SqlitePool;
use std::env;
use tempfile::TempDir;
use uuid::Uuid;

use shiftscheduler::database::init_database;
use shiftscheduler::database::models::*;
use shiftscheduler::database::repositories::{
    LeaveRepository, ProfileRepository, ShiftRepository, TransferRepository,
};
use shiftscheduler::handlers::shared::ApiResponse;
use shiftscheduler::services::UserContext;
use shiftscheduler::{AppState, Config};

pub const PASSWORD: &str = "password123";

/// Builds the full API over a [`TestContext`], the way `main` mounts it
#[allow(unused_macros)]
macro_rules! test_app {
    ($ctx:expr) => {{
        let state = $ctx.state.clone();
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data(state.clone())
                .app_data($ctx.config_data.clone())
                .configure(|cfg| shiftscheduler::routes::configure(cfg, &state)),
        )
        .await
    }};
}

pub struct TestUser {
    pub profile: Profile,
    pub token: String,
}

impl TestUser {
    pub fn id(&self) -> Uuid {
        self.profile.id
    }

    pub fn bearer(&self) -> (&'static str, String) {
        AuthHelper::auth_header(&self.token)
    }
}

pub struct TestContext {
    pub pool: SqlitePool,
    pub config: Config,
    pub state: web::Data<AppState>,
    pub config_data: web::Data<Config>,
    _temp_dir: TempDir,
}

impl TestContext {
    pub async fn new() -> Result<Self> {
        Self::with_config(|_| {}).await
    }

    /// Same as [`TestContext::new`] with a hook to adjust settings first
    pub async fn with_config(adjust: impl FnOnce(&mut Config)) -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let database_url = format!("sqlite:{}/test.db", temp_dir.path().display());
        let storage_dir = temp_dir.path().join("storage");

        let mut config = Config::test_config(&database_url, &storage_dir.display().to_string());
        adjust(&mut config);

        let pool = init_database(&database_url).await?;
        let state = web::Data::new(AppState::build(pool.clone(), config.clone()));
        let config_data = web::Data::new(config.clone());

        Ok(TestContext {
            pool,
            config,
            state,
            config_data,
            _temp_dir: temp_dir,
        })
    }

    /// A confirmed profile with a live token
    pub async fn create_user(&self, role: GlobalRole) -> TestUser {
        let name: String = Name().fake();
        let email: String = SafeEmail().fake();
        let hash = bcrypt::hash(PASSWORD, self.config.bcrypt_cost).expect("hash password");

        let mut profile = Profile::new(
            format!("{}.{}", Uuid::new_v4().simple(), email.to_lowercase()),
            hash,
            name,
        );
        profile.role = role;
        profile.email_confirmed_at = Some(Utc::now());

        let profile = ProfileRepository::new(self.pool.clone())
            .create(&profile)
            .await
            .expect("insert profile");
        let token = self
            .state
            .auth_service
            .generate_token(&profile)
            .expect("issue token");

        TestUser { profile, token }
    }

    pub async fn employee(&self) -> TestUser {
        self.create_user(GlobalRole::Employee).await
    }

    pub async fn admin(&self) -> TestUser {
        self.create_user(GlobalRole::Admin).await
    }

    pub async fn create_team(&self, name: &str, created_by: Uuid) -> Team {
        let input = TeamInput {
            name: name.to_string(),
            description: None,
        };
        self.state
            .team_repository
            .create(&input, created_by)
            .await
            .expect("insert team")
    }

    pub async fn add_member(&self, team_id: Uuid, profile_id: Uuid, role: TeamRole) {
        self.state
            .team_repository
            .add_member(team_id, profile_id, role)
            .await
            .expect("insert membership");
        self.state.user_context_service.invalidate(profile_id).await;
    }

    /// Team with one manager and two members
    pub async fn team_with_members(&self) -> TeamFixture {
        let manager = self.employee().await;
        let alice = self.employee().await;
        let bob = self.employee().await;
        let team = self.create_team("Front Desk", manager.id()).await;

        self.add_member(team.id, manager.id(), TeamRole::Manager).await;
        self.add_member(team.id, alice.id(), TeamRole::Member).await;
        self.add_member(team.id, bob.id(), TeamRole::Member).await;

        TeamFixture {
            team,
            manager,
            alice,
            bob,
        }
    }

    /// Inserts a shift directly, bypassing the date and leave checks
    pub async fn create_shift(
        &self,
        employee_id: Uuid,
        team_id: Option<Uuid>,
        date: NaiveDate,
        status: ShiftStatus,
    ) -> Shift {
        let now = Utc::now();
        let shift = Shift {
            id: Uuid::new_v4(),
            employee_id,
            team_id,
            title: "Morning".to_string(),
            shift_date: date,
            start_time: time(9, 0),
            end_time: time(17, 0),
            status,
            notes: None,
            created_by: None,
            created_at: now,
            updated_at: now,
        };

        let repository = ShiftRepository::new(self.pool.clone());
        let mut tx = self.pool.begin().await.expect("begin");
        let shift = repository.insert(&mut tx, &shift).await.expect("insert shift");
        tx.commit().await.expect("commit");
        shift
    }

    /// Inserts a transfer request directly in the given status
    pub async fn create_transfer(
        &self,
        shift: &Shift,
        target_id: Uuid,
        status: TransferStatus,
    ) -> TransferRequest {
        let now = Utc::now();
        let request = TransferRequest {
            id: Uuid::new_v4(),
            shift_id: shift.id,
            team_id: shift.team_id,
            requester_id: shift.employee_id,
            target_id,
            status,
            requester_note: None,
            target_note: None,
            manager_note: None,
            manager_id: None,
            target_responded_at: None,
            manager_responded_at: None,
            expires_at: shift.starts_at(),
            created_at: now,
            updated_at: now,
        };
        TransferRepository::new(self.pool.clone())
            .create(&request)
            .await
            .expect("insert transfer")
    }

    pub async fn create_leave(
        &self,
        employee_id: Uuid,
        start_date: NaiveDate,
        end_date: NaiveDate,
        status: LeaveStatus,
    ) -> LeaveRequest {
        let now = Utc::now();
        let request = LeaveRequest {
            id: Uuid::new_v4(),
            employee_id,
            start_date,
            end_date,
            leave_type: LeaveType::Vacation,
            status,
            employee_note: None,
            manager_note: None,
            reviewed_by: None,
            reviewed_at: None,
            created_at: now,
            updated_at: now,
        };
        LeaveRepository::new(self.pool.clone())
            .create(&request)
            .await
            .expect("insert leave request")
    }

    pub async fn context(&self, user: &TestUser) -> UserContext {
        self.state
            .user_context_service
            .load(user.id())
            .await
            .expect("load context")
    }

    pub async fn shift(&self, id: Uuid) -> Shift {
        ShiftRepository::new(self.pool.clone())
            .find_by_id(id)
            .await
            .expect("query shift")
            .expect("shift exists")
    }

    pub async fn transfer(&self, id: Uuid) -> TransferRequest {
        TransferRepository::new(self.pool.clone())
            .find_by_id(id)
            .await
            .expect("query transfer")
            .expect("transfer exists")
    }

    pub async fn leave(&self, id: Uuid) -> LeaveRequest {
        LeaveRepository::new(self.pool.clone())
            .find_by_id(id)
            .await
            .expect("query leave request")
            .expect("leave request exists")
    }
}

pub struct TeamFixture {
    pub team: Team,
    pub manager: TestUser,
    pub alice: TestUser,
    pub bob: TestUser,
}

pub fn time(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).expect("valid time")
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub fn days_from_today(days: i64) -> NaiveDate {
    Utc::now().date_naive() + Duration::days(days)
}

// Authentication helpers
pub struct AuthHelper;

impl AuthHelper {
    pub fn auth_header(token: &str) -> (&'static str, String) {
        ("Authorization", format!("Bearer {}", token))
    }
}

// Test assertion helpers
pub struct TestAssertions;

impl TestAssertions {
    pub fn assert_success_response<T>(body: &[u8]) -> T
    where
        T: serde::de::DeserializeOwned,
    {
        let response: ApiResponse<T> =
            serde_json::from_slice(body).expect("Failed to parse JSON response");

        assert!(
            response.success,
            "Expected successful response but got error: {:?}",
            response.message
        );
        response.data.expect("Expected data in successful response")
    }

    /// Checks `error.code` and, for conflicts, `error.reason`
    pub fn assert_error(body: &Value, code: &str, reason: Option<&str>) {
        assert_eq!(body["success"], Value::Bool(false), "body: {}", body);
        assert_eq!(body["error"]["code"], code, "body: {}", body);
        if let Some(reason) = reason {
            assert_eq!(body["error"]["reason"], reason, "body: {}", body);
        }
    }

    pub async fn assert_record_count(pool: &SqlitePool, table: &str, expected_count: i64) {
        let query = format!("SELECT COUNT(*) as count FROM {}", table);
        let result = sqlx::query_scalar::<_, i64>(&query)
            .fetch_one(pool)
            .await
            .expect("Failed to count records");

        assert_eq!(
            result, expected_count,
            "Expected {} records in {} table, but found {}",
            expected_count, table, result
        );
    }
}

pub async fn read_json<B: MessageBody>(resp: ServiceResponse<B>) -> Value {
    let body = test::read_body(resp).await;
    serde_json::from_slice(&body).expect("response body is JSON")
}

/// The `data` member of a successful envelope, decoded
pub async fn read_data<T, B>(resp: ServiceResponse<B>) -> T
where
    T: serde::de::DeserializeOwned,
    B: MessageBody,
{
    let body = test::read_body(resp).await;
    TestAssertions::assert_success_response(&body)
}

pub fn setup_test_env() {
    unsafe {
        env::set_var("RUST_LOG", "debug");
    }
    let _ = env_logger::builder().is_test(true).try_init();
}
