/// Common test utilities for integration tests
///
/// Provides shared infrastructure:
/// - Test database setup with migrations
/// - Test users in every role, plus a team with a member
/// - JWT token generation
/// - Request helpers against the in-process router

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use sqlx::PgPool;
use teamtrack_api::app::{build_router, AppState};
use teamtrack_api::config::Config;
use teamtrack_shared::auth::jwt::{create_token, Claims, TokenType};
use teamtrack_shared::models::team::{CreateTeam, Team};
use teamtrack_shared::models::user::{CreateUser, User, UserRole};
use tower::Service as _;
use uuid::Uuid;

/// Test context containing all necessary resources
pub struct TestContext {
    pub db: PgPool,
    pub app: axum::Router,
    pub config: Config,
    pub admin: User,
    pub lead: User,
    pub member: User,
    pub outsider: User,
    pub team: Team,
}

impl TestContext {
    /// Creates a fresh context: four users, one team with `member` on it
    pub async fn new() -> anyhow::Result<Self> {
        let config = Config::from_env()?;

        let db = PgPool::connect(&config.database.url).await?;

        // Path relative to Cargo.toml, not this file
        sqlx::migrate!("../migrations").run(&db).await?;

        let admin = create_user(&db, UserRole::Admin).await?;
        let lead = create_user(&db, UserRole::TeamLead).await?;
        let member = create_user(&db, UserRole::User).await?;
        let outsider = create_user(&db, UserRole::User).await?;

        let team = Team::create(
            &db,
            CreateTeam {
                name: format!("Test Team {}", Uuid::new_v4()),
                description: String::new(),
                lead_id: lead.id,
            },
        )
        .await?;

        Team::add_member(&db, team.id, member.id).await?;

        let state = AppState::new(db.clone(), config.clone());
        let app = build_router(state);

        Ok(TestContext {
            db,
            app,
            config,
            admin,
            lead,
            member,
            outsider,
            team,
        })
    }

    /// Bearer header value for a user
    pub fn auth_header(&self, user: &User) -> String {
        let claims = Claims::new(user.id, user.role, TokenType::Access);
        let token = create_token(&claims, &self.config.jwt.secret).unwrap();
        format!("Bearer {}", token)
    }

    /// Sends a JSON request and returns (status, parsed body)
    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        user: Option<&User>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(user) = user {
            builder = builder.header("authorization", self.auth_header(user));
        }

        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().call(request).await.unwrap();
        let status = response.status();

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        (status, json)
    }

    /// Creates a project in the test team, returning its id
    pub async fn create_project(&self, name: &str) -> Uuid {
        let (status, body) = self
            .request(
                "POST",
                &format!("/v1/teams/{}/projects", self.team.id),
                Some(&self.lead),
                Some(serde_json::json!({ "name": name })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "project create failed: {}", body);

        body["id"].as_str().unwrap().parse().unwrap()
    }

    /// Creates a task via the API, returning its id
    pub async fn create_task(&self, project_id: Uuid, body: Value) -> Uuid {
        let (status, body) = self
            .request(
                "POST",
                &format!("/v1/teams/{}/projects/{}/tasks", self.team.id, project_id),
                Some(&self.lead),
                Some(body),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "task create failed: {}", body);

        body["id"].as_str().unwrap().parse().unwrap()
    }

    /// Cleans up test data
    ///
    /// Deleting the team cascades projects, tasks, and memberships; the
    /// users go individually afterwards.
    pub async fn cleanup(&self) -> anyhow::Result<()> {
        Team::delete(&self.db, self.team.id).await?;
        for user in [&self.admin, &self.lead, &self.member, &self.outsider] {
            User::delete(&self.db, user.id).await?;
        }
        Ok(())
    }
}

async fn create_user(db: &PgPool, role: UserRole) -> anyhow::Result<User> {
    let user = User::create(
        db,
        CreateUser {
            email: format!("test-{}@example.com", Uuid::new_v4()),
            password_hash: "test_hash".to_string(), // Not verified in these tests
            name: format!("Test {}", role.as_str()),
            role,
        },
    )
    .await?;

    Ok(user)
}
