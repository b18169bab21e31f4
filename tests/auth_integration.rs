use std::net::TcpListener;

use serde_json::{json, Value};
use sqlx::{Connection, Executor, PgConnection, PgPool, Row};

use inkstream::auth::validate_access_token;
use inkstream::configuration::{get_configuration, DatabaseSettings, JwtSettings};
use inkstream::startup::run;

pub struct TestApp {
    pub address: String,
    pub db_pool: PgPool,
    pub jwt: JwtSettings,
}

async fn spawn_app() -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    let mut configuration = get_configuration().expect("Failed to read configuration.");
    configuration.database.database_name = uuid::Uuid::new_v4().to_string();
    let connection_pool = configure_database(&configuration.database).await;

    let jwt = configuration.jwt.clone();
    let server =
        run(listener, connection_pool.clone(), configuration).expect("Failed to bind address");
    let _ = tokio::spawn(server);

    TestApp {
        address,
        db_pool: connection_pool,
        jwt,
    }
}

pub async fn configure_database(config: &DatabaseSettings) -> PgPool {
    let mut connection = PgConnection::connect(&config.connection_string_without_db())
        .await
        .expect("Failed to connect to Postgres");
    connection
        .execute(&*format!(r#"CREATE DATABASE "{}";"#, config.database_name))
        .await
        .expect("Failed to create database.");

    let connection_pool = PgPool::connect(&config.connection_string())
        .await
        .expect("Failed to connect to Postgres.");
    sqlx::migrate!("./migrations")
        .run(&connection_pool)
        .await
        .expect("Failed to migrate the database.");
    connection_pool
}

async fn signup(
    client: &reqwest::Client,
    app: &TestApp,
    email: &str,
    username: &str,
    password: &str,
) -> Value {
    let response = client
        .post(format!("{}/api/auth/signup", app.address))
        .json(&json!({
            "email": email,
            "username": username,
            "password": password,
            "name": "Test User"
        }))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(201, response.status().as_u16());
    response.json().await.expect("Failed to parse response")
}

// --- Signup ---

#[tokio::test]
async fn signup_returns_201_with_a_full_session() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let body = signup(&client, &app, "a@x.com", "alice", "secret1").await;

    let access_token = body["tokens"]["access_token"].as_str().unwrap();
    let refresh_token = body["tokens"]["refresh_token"].as_str().unwrap();
    assert!(!access_token.is_empty());
    assert_eq!(refresh_token.len(), 64);
    assert_eq!(body["user"]["email"], "a@x.com");
    assert_eq!(body["user"]["username"], "alice");
    assert!(body["user"].get("hashed_password").is_none());

    // The refresh token was persisted alongside the access token.
    let row = sqlx::query("SELECT user_id, revoked_at FROM refresh_tokens WHERE token = $1")
        .bind(refresh_token)
        .fetch_one(&app.db_pool)
        .await
        .expect("Refresh token was not persisted");
    assert!(row.get::<Option<chrono::DateTime<chrono::Utc>>, _>("revoked_at").is_none());

    // And the stored password is a bcrypt digest, not the plaintext.
    let stored = sqlx::query("SELECT hashed_password FROM users WHERE email = 'a@x.com'")
        .fetch_one(&app.db_pool)
        .await
        .expect("Failed to fetch created user");
    let digest: String = stored.get("hashed_password");
    assert_ne!(digest, "secret1");
    assert!(digest.starts_with("$2"));
}

#[tokio::test]
async fn signup_with_taken_email_or_username_returns_409() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    signup(&client, &app, "a@x.com", "alice", "secret1").await;

    let same_email = client
        .post(format!("{}/api/auth/signup", app.address))
        .json(&json!({
            "email": "a@x.com",
            "username": "alice2",
            "password": "secret1",
            "name": "Other"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(409, same_email.status().as_u16());

    let same_username = client
        .post(format!("{}/api/auth/signup", app.address))
        .json(&json!({
            "email": "b@x.com",
            "username": "alice",
            "password": "secret1",
            "name": "Other"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(409, same_username.status().as_u16());
}

#[tokio::test]
async fn signup_rejects_invalid_input_with_400() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let cases = vec![
        json!({"email": "notanemail", "username": "alice", "password": "secret1", "name": "A"}),
        json!({"email": "a@x.com", "username": "Has Space", "password": "secret1", "name": "A"}),
        json!({"email": "a@x.com", "username": "alice", "password": "short", "name": "A"}),
        json!({"email": "a@x.com", "username": "alice", "password": "secret1", "name": ""}),
    ];

    for case in cases {
        let response = client
            .post(format!("{}/api/auth/signup", app.address))
            .json(&case)
            .send()
            .await
            .unwrap();
        assert_eq!(400, response.status().as_u16(), "payload: {}", case);
    }
}

// --- Signin ---

#[tokio::test]
async fn signin_after_signup_yields_a_token_for_the_same_identity() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let created = signup(&client, &app, "a@x.com", "alice", "secret1").await;
    let user_id = created["user"]["id"].as_str().unwrap().to_string();

    let response = client
        .post(format!("{}/api/auth/signin", app.address))
        .json(&json!({"email": "a@x.com", "password": "secret1"}))
        .send()
        .await
        .unwrap();
    assert_eq!(200, response.status().as_u16());

    let body: Value = response.json().await.unwrap();
    let access_token = body["tokens"]["access_token"].as_str().unwrap();

    let resolved = validate_access_token(access_token, &app.jwt)
        .expect("Access token from signin did not validate");
    assert_eq!(resolved.to_string(), user_id);
}

#[tokio::test]
async fn signin_failures_are_indistinguishable() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    signup(&client, &app, "a@x.com", "alice", "secret1").await;

    let wrong_password = client
        .post(format!("{}/api/auth/signin", app.address))
        .json(&json!({"email": "a@x.com", "password": "wrongpass"}))
        .send()
        .await
        .unwrap();
    let unknown_email = client
        .post(format!("{}/api/auth/signin", app.address))
        .json(&json!({"email": "nobody@x.com", "password": "secret1"}))
        .send()
        .await
        .unwrap();

    assert_eq!(401, wrong_password.status().as_u16());
    assert_eq!(401, unknown_email.status().as_u16());

    let first: Value = wrong_password.json().await.unwrap();
    let second: Value = unknown_email.json().await.unwrap();
    assert_eq!(first["message"], second["message"]);
    assert_eq!(first["code"], second["code"]);
}

// --- Refresh ---

#[tokio::test]
async fn refresh_returns_a_new_access_token_and_leaves_the_row_untouched() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let created = signup(&client, &app, "a@x.com", "alice", "secret1").await;
    let refresh_token = created["tokens"]["refresh_token"].as_str().unwrap();

    for _ in 0..2 {
        // Not rotated: the same token keeps working.
        let response = client
            .post(format!("{}/api/auth/refresh", app.address))
            .json(&json!({"refresh_token": refresh_token}))
            .send()
            .await
            .unwrap();
        assert_eq!(200, response.status().as_u16());

        let body: Value = response.json().await.unwrap();
        let access_token = body["access_token"].as_str().unwrap();
        assert!(validate_access_token(access_token, &app.jwt).is_ok());
        // Only a new access token comes back; the refresh token is not rotated.
        assert!(body.get("refresh_token").is_none());
    }

    let row = sqlx::query("SELECT revoked_at FROM refresh_tokens WHERE token = $1")
        .bind(refresh_token)
        .fetch_one(&app.db_pool)
        .await
        .unwrap();
    assert!(row.get::<Option<chrono::DateTime<chrono::Utc>>, _>("revoked_at").is_none());
}

#[tokio::test]
async fn refresh_with_a_never_issued_token_returns_401() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/auth/refresh", app.address))
        .json(&json!({"refresh_token": "f".repeat(64)}))
        .send()
        .await
        .unwrap();

    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn refresh_with_an_expired_token_returns_401() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let created = signup(&client, &app, "a@x.com", "alice", "secret1").await;
    let refresh_token = created["tokens"]["refresh_token"].as_str().unwrap();

    sqlx::query("UPDATE refresh_tokens SET expires_at = now() - interval '1 day' WHERE token = $1")
        .bind(refresh_token)
        .execute(&app.db_pool)
        .await
        .unwrap();

    let response = client
        .post(format!("{}/api/auth/refresh", app.address))
        .json(&json!({"refresh_token": refresh_token}))
        .send()
        .await
        .unwrap();

    assert_eq!(401, response.status().as_u16());
}

// --- Logout ---

#[tokio::test]
async fn refresh_after_logout_returns_401() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let created = signup(&client, &app, "a@x.com", "alice", "secret1").await;
    let access_token = created["tokens"]["access_token"].as_str().unwrap();
    let refresh_token = created["tokens"]["refresh_token"].as_str().unwrap();

    let logout = client
        .post(format!("{}/api/auth/logout", app.address))
        .bearer_auth(access_token)
        .json(&json!({"refresh_token": refresh_token}))
        .send()
        .await
        .unwrap();
    assert_eq!(200, logout.status().as_u16());

    let refresh = client
        .post(format!("{}/api/auth/refresh", app.address))
        .json(&json!({"refresh_token": refresh_token}))
        .send()
        .await
        .unwrap();
    assert_eq!(401, refresh.status().as_u16());
}

#[tokio::test]
async fn logout_requires_a_valid_access_token() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let created = signup(&client, &app, "a@x.com", "alice", "secret1").await;
    let refresh_token = created["tokens"]["refresh_token"].as_str().unwrap();

    // No Authorization header at all
    let missing = client
        .post(format!("{}/api/auth/logout", app.address))
        .json(&json!({"refresh_token": refresh_token}))
        .send()
        .await
        .unwrap();
    assert_eq!(401, missing.status().as_u16());

    // Wrong scheme
    let malformed = client
        .post(format!("{}/api/auth/logout", app.address))
        .header("Authorization", "Token abc123")
        .json(&json!({"refresh_token": refresh_token}))
        .send()
        .await
        .unwrap();
    assert_eq!(401, malformed.status().as_u16());

    // Garbage bearer token
    let invalid = client
        .post(format!("{}/api/auth/logout", app.address))
        .bearer_auth("not.a.token")
        .json(&json!({"refresh_token": refresh_token}))
        .send()
        .await
        .unwrap();
    assert_eq!(401, invalid.status().as_u16());
}

#[tokio::test]
async fn logout_is_idempotent() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let created = signup(&client, &app, "a@x.com", "alice", "secret1").await;
    let access_token = created["tokens"]["access_token"].as_str().unwrap();
    let refresh_token = created["tokens"]["refresh_token"].as_str().unwrap();

    for _ in 0..2 {
        let response = client
            .post(format!("{}/api/auth/logout", app.address))
            .bearer_auth(access_token)
            .json(&json!({"refresh_token": refresh_token}))
            .send()
            .await
            .unwrap();
        assert_eq!(200, response.status().as_u16());
    }
}

#[tokio::test]
async fn logout_cannot_revoke_another_users_token() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let alice = signup(&client, &app, "a@x.com", "alice", "secret1").await;
    let bob = signup(&client, &app, "b@x.com", "bob", "secret2").await;

    let response = client
        .post(format!("{}/api/auth/logout", app.address))
        .bearer_auth(bob["tokens"]["access_token"].as_str().unwrap())
        .json(&json!({"refresh_token": alice["tokens"]["refresh_token"].as_str().unwrap()}))
        .send()
        .await
        .unwrap();
    assert_eq!(403, response.status().as_u16());

    // Alice's session is untouched.
    let refresh = client
        .post(format!("{}/api/auth/refresh", app.address))
        .json(&json!({"refresh_token": alice["tokens"]["refresh_token"].as_str().unwrap()}))
        .send()
        .await
        .unwrap();
    assert_eq!(200, refresh.status().as_u16());
}

#[tokio::test]
async fn access_token_outlives_logout_until_its_own_expiry() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let created = signup(&client, &app, "a@x.com", "alice", "secret1").await;
    let access_token = created["tokens"]["access_token"].as_str().unwrap();
    let refresh_token = created["tokens"]["refresh_token"].as_str().unwrap();

    let logout = client
        .post(format!("{}/api/auth/logout", app.address))
        .bearer_auth(access_token)
        .json(&json!({"refresh_token": refresh_token}))
        .send()
        .await
        .unwrap();
    assert_eq!(200, logout.status().as_u16());

    // Stateless access tokens are not revocable: the old one still works.
    let me = client
        .get(format!("{}/api/users/me", app.address))
        .bearer_auth(access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(200, me.status().as_u16());
}

#[tokio::test]
async fn concurrent_sessions_are_independent() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    signup(&client, &app, "a@x.com", "alice", "secret1").await;

    let signin = |_: ()| {
        client
            .post(format!("{}/api/auth/signin", app.address))
            .json(&json!({"email": "a@x.com", "password": "secret1"}))
            .send()
    };
    let (first, second) = tokio::join!(signin(()), signin(()));
    let first: Value = first.unwrap().json().await.unwrap();
    let second: Value = second.unwrap().json().await.unwrap();

    let first_refresh = first["tokens"]["refresh_token"].as_str().unwrap();
    let second_refresh = second["tokens"]["refresh_token"].as_str().unwrap();
    assert_ne!(first_refresh, second_refresh);

    // Revoking one session leaves the other valid.
    let logout = client
        .post(format!("{}/api/auth/logout", app.address))
        .bearer_auth(first["tokens"]["access_token"].as_str().unwrap())
        .json(&json!({"refresh_token": first_refresh}))
        .send()
        .await
        .unwrap();
    assert_eq!(200, logout.status().as_u16());

    let still_valid = client
        .post(format!("{}/api/auth/refresh", app.address))
        .json(&json!({"refresh_token": second_refresh}))
        .send()
        .await
        .unwrap();
    assert_eq!(200, still_valid.status().as_u16());

    let revoked = client
        .post(format!("{}/api/auth/refresh", app.address))
        .json(&json!({"refresh_token": first_refresh}))
        .send()
        .await
        .unwrap();
    assert_eq!(401, revoked.status().as_u16());
}

// --- Gates on user routes ---

#[tokio::test]
async fn users_me_requires_authentication() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/api/users/me", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn user_profile_treats_missing_or_bad_token_as_anonymous() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let created = signup(&client, &app, "a@x.com", "alice", "secret1").await;
    let user_id = created["user"]["id"].as_str().unwrap();
    let access_token = created["tokens"]["access_token"].as_str().unwrap();

    // Anonymous view
    let anonymous = client
        .get(format!("{}/api/users/{}", app.address, user_id))
        .send()
        .await
        .unwrap();
    assert_eq!(200, anonymous.status().as_u16());
    let body: Value = anonymous.json().await.unwrap();
    assert_eq!(body["is_me"], false);

    // Garbage token is swallowed, not rejected
    let garbage = client
        .get(format!("{}/api/users/{}", app.address, user_id))
        .bearer_auth("not.a.token")
        .send()
        .await
        .unwrap();
    assert_eq!(200, garbage.status().as_u16());
    let body: Value = garbage.json().await.unwrap();
    assert_eq!(body["is_me"], false);

    // The owner sees their own profile flagged
    let own = client
        .get(format!("{}/api/users/{}", app.address, user_id))
        .bearer_auth(access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(200, own.status().as_u16());
    let body: Value = own.json().await.unwrap();
    assert_eq!(body["is_me"], true);
    assert_eq!(body["username"], "alice");
}

// --- Health and admin ---

#[tokio::test]
async fn health_check_works() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/health", app.address))
        .send()
        .await
        .unwrap();

    assert_eq!(200, response.status().as_u16());
    assert_eq!("ok", response.text().await.unwrap());
}

#[tokio::test]
async fn admin_reset_clears_users_on_dev_platform() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    signup(&client, &app, "a@x.com", "alice", "secret1").await;

    let response = client
        .post(format!("{}/api/admin/reset", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(200, response.status().as_u16());

    let remaining = sqlx::query("SELECT count(*) AS n FROM users")
        .fetch_one(&app.db_pool)
        .await
        .unwrap();
    assert_eq!(remaining.get::<i64, _>("n"), 0);
}
