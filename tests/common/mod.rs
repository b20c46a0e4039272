#![allow(dead_code)]

use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use cobra::config::{Config, RegistrationMode};
use cobra::state::SharedState;

pub const PASSWORD: &str = "password123";

/// A running test server instance with a dedicated test database.
pub struct TestApp {
    pub addr: std::net::SocketAddr,
    pub pool: PgPool,
    pub state: SharedState,
    pub client: Client,
    pub db_name: String,
}

/// A registered user and their access token.
pub struct TestUser {
    pub id: Uuid,
    pub username: String,
    pub token: String,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn register(&self, username: &str, password: &str) -> (Value, StatusCode) {
        self.register_with_email(username, &format!("{username}@test.com"), password)
            .await
    }

    pub async fn register_with_email(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> (Value, StatusCode) {
        self.post(
            "/api/v1/auth/register",
            None,
            &json!({
                "username": username,
                "email": email,
                "password": password,
                "first_name": username,
                "last_name": "Tester",
            }),
        )
        .await
    }

    pub async fn login(&self, username: &str, password: &str) -> (Value, StatusCode) {
        self.post(
            "/api/v1/auth/login",
            None,
            &json!({ "username": username, "password": password }),
        )
        .await
    }

    /// Register a user and resolve its id. The first user of a database is staff.
    pub async fn user(&self, username: &str) -> TestUser {
        let (body, status) = self.register(username, PASSWORD).await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
        let token = body["access_token"].as_str().unwrap().to_string();

        let (me, status) = self.get_auth("/api/v1/users/me", &token).await;
        assert_eq!(status, StatusCode::OK, "users/me failed: {me}");

        TestUser {
            id: me["id"].as_str().unwrap().parse().unwrap(),
            username: username.to_string(),
            token,
        }
    }

    /// Create a project, return the project JSON.
    pub async fn create_project(&self, owner: &TestUser, title: &str) -> Value {
        let (body, status) = self
            .post_auth("/api/v1/projects", &owner.token, &json!({ "title": title }))
            .await;
        assert_eq!(status, StatusCode::CREATED, "create project failed: {body}");
        body
    }

    pub async fn invite(
        &self,
        inviter: &TestUser,
        project_id: &str,
        invitee: &TestUser,
    ) -> (Value, StatusCode) {
        self.post_auth(
            &format!("/api/v1/projects/{project_id}/invitations"),
            &inviter.token,
            &json!({ "email": format!("{}@test.com", invitee.username) }),
        )
        .await
    }

    /// Invite and accept in one go, asserting both succeed.
    pub async fn add_member(&self, inviter: &TestUser, project_id: &str, user: &TestUser) -> Value {
        let (inv, status) = self.invite(inviter, project_id, user).await;
        assert_eq!(status, StatusCode::CREATED, "invite failed: {inv}");
        let inv_id = inv["id"].as_str().unwrap();

        let (body, status) = self
            .post_auth(&format!("/api/v1/invitations/{inv_id}/accept"), &user.token, &json!({}))
            .await;
        assert_eq!(status, StatusCode::NO_CONTENT, "accept failed: {body}");

        let (memberships, _) = self
            .get_auth(&format!("/api/v1/projects/{project_id}/memberships"), &user.token)
            .await;
        memberships
            .as_array()
            .unwrap()
            .iter()
            .find(|m| m["user_id"].as_str() == Some(user.id.to_string().as_str()))
            .cloned()
            .expect("membership not created")
    }

    pub async fn membership_count(&self, project_id: &str, user_id: Uuid) -> i64 {
        let project_id: Uuid = project_id.parse().unwrap();
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM project_memberships WHERE project_id = $1 AND user_id = $2",
        )
        .bind(project_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .unwrap()
    }

    pub async fn post(&self, path: &str, token: Option<&str>, body: &Value) -> (Value, StatusCode) {
        let mut req = self.client.post(self.url(path)).json(body);
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        let resp = req.send().await.expect("post request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Make an authenticated GET request.
    pub async fn get_auth(&self, path: &str, token: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("get request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Make an authenticated POST request with JSON body.
    pub async fn post_auth(&self, path: &str, token: &str, body: &Value) -> (Value, StatusCode) {
        self.post(path, Some(token), body).await
    }

    /// Make an authenticated PATCH request with JSON body.
    pub async fn patch_auth(&self, path: &str, token: &str, body: &Value) -> (Value, StatusCode) {
        let resp = self
            .client
            .patch(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .expect("patch request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Make an authenticated DELETE request.
    pub async fn delete_auth(&self, path: &str, token: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .delete(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("delete request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }
}

fn admin_url(base_url: &str) -> String {
    base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/postgres"))
        .unwrap_or_else(|| base_url.to_string())
}

pub fn test_config(database_url: String) -> Config {
    Config {
        database_url,
        jwt_secret: "test-jwt-secret-that-is-long-enough".to_string(),
        host: "127.0.0.1".parse().unwrap(),
        port: 0, // unused, we bind to random port
        base_url: "http://localhost:0".to_string(),
        registration: RegistrationMode::Open,
        max_body_size: 1_048_576,
        invitation_lifetime: chrono::Duration::hours(24),
        invitation_url: "http://localhost:0/invitations/{id}".to_string(),
        require_activation: false,
        activation_url: "http://localhost:0/activate/{token}".to_string(),
        worker_count: 1,
        log_level: "warn".to_string(),
        smtp: None,
    }
}

/// Spawn a test app with a fresh temporary database.
pub async fn spawn_app() -> TestApp {
    spawn_app_with(|_| {}).await
}

/// Spawn a test app, letting the caller adjust the configuration first.
pub async fn spawn_app_with(adjust: impl FnOnce(&mut Config)) -> TestApp {
    let _ = dotenvy::dotenv();

    let base_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for tests");

    let db_name = format!("cobra_test_{}", Uuid::now_v7().simple());

    let admin_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&admin_url(&base_url))
        .await
        .expect("Failed to connect to postgres for test DB creation");

    sqlx::query(&format!("CREATE DATABASE \"{db_name}\""))
        .execute(&admin_pool)
        .await
        .expect("Failed to create test database");

    admin_pool.close().await;

    let test_url = base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/{db_name}"))
        .unwrap_or_else(|| base_url.clone());

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&test_url)
        .await
        .expect("Failed to connect to test database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations on test database");

    let mut config = test_config(test_url);
    adjust(&mut config);

    let (app, state) = cobra::build_app(pool.clone(), config);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to random port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Server failed");
    });

    let client = Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    TestApp {
        addr,
        pool,
        state,
        client,
        db_name,
    }
}

/// Drop the test database after tests complete.
pub async fn cleanup(app: TestApp) {
    let db_name = app.db_name.clone();
    app.pool.close().await;

    let base_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for tests");

    let admin_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&admin_url(&base_url))
        .await
        .expect("Failed to connect for cleanup");

    let _ = sqlx::query(&format!("DROP DATABASE IF EXISTS \"{db_name}\" WITH (FORCE)"))
        .execute(&admin_pool)
        .await;

    admin_pool.close().await;
}
