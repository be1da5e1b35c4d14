use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use printshop_api::config::{ApiConfig, PasswordHashingConfig};
use printshop_auth::{JwtClaims, Role};
use printshop_core::UserId;
use printshop_inventory::LotSelection;
use reqwest::StatusCode;
use serde_json::json;

const JWT_SECRET: &str = "test-secret";

struct TestServer {
    base_url: String,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        Self::spawn_with(ApiConfig::default()).await
    }

    async fn spawn_with(base: ApiConfig) -> Self {
        let config = ApiConfig {
            jwt_secret: JWT_SECRET.to_string(),
            password_hashing: PasswordHashingConfig {
                memory_kib: 64,
                iterations: 1,
                parallelism: 1,
            },
            ..base
        };

        // Same router as prod, bound to an ephemeral port.
        let app = printshop_api::app::build_app(&config).expect("failed to build app");
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            client: reqwest::Client::new(),
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn login(&self, username: &str, password: &str) -> String {
        let res = self
            .client
            .post(self.url("/auth/login"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK, "login as {username} failed");
        let body: serde_json::Value = res.json().await.unwrap();
        body["token"].as_str().unwrap().to_string()
    }

    async fn post(&self, token: &str, path: &str, body: serde_json::Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    async fn patch(&self, token: &str, path: &str, body: serde_json::Value) -> reqwest::Response {
        self.client
            .patch(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    async fn get_json(&self, token: &str, path: &str) -> serde_json::Value {
        let res = self
            .client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK, "GET {path}");
        res.json().await.unwrap()
    }

    /// Register a print and move its lot to in-process.
    async fn stock(&self, token: &str, code: &str, quantity: u64) -> String {
        let res = self
            .post(
                token,
                "/prints",
                json!({ "code": code, "name": format!("Print {code}"), "quantity": quantity }),
            )
            .await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let record: serde_json::Value = res.json().await.unwrap();
        let id = record["id"].as_str().unwrap().to_string();

        let res = self
            .patch(token, &format!("/prints/{id}/status"), json!({ "status": "in_process" }))
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        id
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(jwt_secret: &str, role: Role) -> String {
    let now = Utc::now();
    let claims = JwtClaims {
        sub: UserId::new(),
        username: format!("minted-{role}"),
        role,
        iat: now,
        exp: now + ChronoDuration::minutes(10),
    };

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(jwt_secret.as_bytes()),
    )
    .expect("failed to encode jwt")
}

#[tokio::test]
async fn auth_required_for_protected_endpoints() {
    let srv = TestServer::spawn().await;

    let res = srv.client.get(srv.url("/whoami")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = srv.client.get(srv.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let forged = mint_jwt("wrong-secret", Role::Admin);
    let res = srv
        .client
        .get(srv.url("/prints"))
        .bearer_auth(forged)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    // Correctly signed, but for an account the directory has never seen.
    let stranger = mint_jwt(JWT_SECRET, Role::Admin);
    let res = srv
        .client
        .get(srv.url("/whoami"))
        .bearer_auth(stranger)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn demo_login_and_whoami() {
    let srv = TestServer::spawn().await;

    let res = srv
        .client
        .post(srv.url("/auth/login"))
        .json(&json!({ "username": "operator", "password": "wrong" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let token = srv.login("operator", "operator").await;
    let me = srv.get_json(&token, "/whoami").await;
    assert_eq!(me["username"], "operator");
    assert_eq!(me["role"], "operator");
}

#[tokio::test]
async fn register_then_withdraw_splits_the_lot() {
    let srv = TestServer::spawn().await;
    let admin = srv.login("admin", "admin").await;
    let operator = srv.login("operator", "operator").await;

    let source_id = srv.stock(&admin, "EST001", 50).await;

    // Barcode form posts the quantity as text.
    let res = srv
        .post(&operator, "/withdrawals", json!({ "code": "EST001", "quantity": "20" }))
        .await;
    assert_eq!(res.status(), StatusCode::OK);

    let listing = srv.get_json(&admin, "/prints?code=EST001").await;
    let records = listing["records"].as_array().unwrap();
    assert_eq!(records.len(), 2);

    let source = records.iter().find(|r| r["id"] == source_id.as_str()).unwrap();
    assert_eq!(source["quantity"], 30);
    assert_eq!(source["status"], "in_process");

    let completed = records.iter().find(|r| r["status"] == "completed").unwrap();
    assert_eq!(completed["quantity"], 20);
    assert!(completed["exit_timestamp"].is_string());

    let summary = srv.get_json(&admin, "/prints/catalog/EST001").await;
    assert_eq!(summary["in_process_quantity"], 30);
    assert_eq!(summary["total_quantity"], 50);

    let stats = srv.get_json(&admin, "/stats").await;
    assert_eq!(stats["total_items"], 50);
    assert_eq!(stats["completed_items"], 20);
    assert_eq!(stats["in_process_items"], 30);
    assert_eq!(stats["completion_percentage"], 40);
}

#[tokio::test]
async fn over_withdrawal_is_rejected_without_changes() {
    let srv = TestServer::spawn().await;
    let admin = srv.login("admin", "admin").await;
    srv.stock(&admin, "EST002", 5).await;

    let before = srv.get_json(&admin, "/prints").await;

    let res = srv
        .post(&admin, "/withdrawals", json!({ "code": "EST002", "quantity": 6 }))
        .await;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "insufficient_quantity");
    assert_eq!(body["available"], 5);

    let res = srv
        .post(&admin, "/withdrawals", json!({ "code": "EST002", "quantity": "0" }))
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = srv
        .post(&admin, "/withdrawals", json!({ "code": "NOPE", "quantity": 1 }))
        .await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    assert_eq!(srv.get_json(&admin, "/prints").await, before);
}

#[tokio::test]
async fn duplicate_registration_conflicts() {
    let srv = TestServer::spawn().await;
    let admin = srv.login("admin", "admin").await;

    let body = json!({ "code": "EST003", "name": "Star", "quantity": 3 });
    assert_eq!(srv.post(&admin, "/prints", body.clone()).await.status(), StatusCode::CREATED);

    let res = srv.post(&admin, "/prints", body).await;
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let err: serde_json::Value = res.json().await.unwrap();
    assert_eq!(err["error"], "duplicate_code");
}

#[tokio::test]
async fn batch_withdrawal_is_all_or_nothing() {
    let srv = TestServer::spawn().await;
    let admin = srv.login("admin", "admin").await;
    srv.stock(&admin, "A1", 10).await;
    srv.stock(&admin, "B1", 2).await;
    srv.stock(&admin, "C1", 10).await;

    let res = srv
        .post(
            &admin,
            "/batches",
            json!({
                "code": "MORNING",
                "entries": [
                    { "code": "A1", "quantity": 4 },
                    { "code": "B1", "quantity": 5 },
                    { "code": "C1", "quantity": 1 },
                ],
            }),
        )
        .await;
    assert_eq!(res.status(), StatusCode::CREATED);

    let before = srv.get_json(&admin, "/prints").await;
    let events_before = srv.get_json(&admin, "/events").await;

    let res = srv.post(&admin, "/batches/MORNING/withdraw", json!({})).await;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["batch_entry"]["index"], 1);
    assert_eq!(body["batch_entry"]["code"], "B1");

    assert_eq!(srv.get_json(&admin, "/prints").await, before);
    assert_eq!(
        srv.get_json(&admin, "/events").await["count"],
        events_before["count"]
    );
}

#[tokio::test]
async fn role_gating_matches_dashboard_rules() {
    let srv = TestServer::spawn().await;
    let admin = srv.login("admin", "admin").await;
    let operator = srv.login("operator", "operator").await;
    let viewer = srv.login("viewer", "viewer").await;

    let id = srv.stock(&admin, "EST010", 8).await;

    // Only admin registers prints.
    let body = json!({ "code": "EST011", "name": "x", "quantity": 1 });
    assert_eq!(srv.post(&operator, "/prints", body.clone()).await.status(), StatusCode::FORBIDDEN);
    assert_eq!(srv.post(&viewer, "/prints", body).await.status(), StatusCode::FORBIDDEN);

    // Viewers cannot withdraw or change status.
    let res = srv
        .post(&viewer, "/withdrawals", json!({ "code": "EST010", "quantity": 1 }))
        .await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let res = srv
        .patch(&viewer, &format!("/prints/{id}/status"), json!({ "status": "completed" }))
        .await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    // Operators cannot correct quantities or manage users.
    let res = srv
        .patch(&operator, &format!("/prints/{id}/quantity"), json!({ "quantity": 3 }))
        .await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let res = srv
        .client
        .get(srv.url("/users"))
        .bearer_auth(&operator)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    // Everyone reads.
    srv.get_json(&viewer, "/prints").await;
    srv.get_json(&viewer, "/stats").await;
}

#[tokio::test]
async fn admin_manages_users() {
    let srv = TestServer::spawn().await;
    let admin = srv.login("admin", "admin").await;

    let res = srv
        .post(
            &admin,
            "/users",
            json!({ "username": "maria", "role": "Operator", "password": "s3cret" }),
        )
        .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let created: serde_json::Value = res.json().await.unwrap();
    assert_eq!(created["role"], "operator");
    assert!(created.get("password_hash").is_none());

    let res = srv
        .post(&admin, "/users", json!({ "username": "MARIA", "role": "viewer" }))
        .await;
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let maria = srv.login("maria", "s3cret").await;
    assert_eq!(srv.get_json(&maria, "/whoami").await["role"], "operator");

    let users = srv.get_json(&admin, "/users").await;
    assert_eq!(users["count"], 4);

    let me = srv.get_json(&admin, "/whoami").await;
    let res = srv
        .client
        .delete(srv.url(&format!("/users/{}", me["user_id"].as_str().unwrap())))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let id = created["id"].as_str().unwrap();
    let res = srv
        .client
        .delete(srv.url(&format!("/users/{id}")))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn removed_user_token_stops_working() {
    let srv = TestServer::spawn().await;
    let admin = srv.login("admin", "admin").await;
    srv.stock(&admin, "EST040", 5).await;

    let res = srv
        .post(
            &admin,
            "/users",
            json!({ "username": "temp", "role": "operator", "password": "pw" }),
        )
        .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let created: serde_json::Value = res.json().await.unwrap();

    let temp = srv.login("temp", "pw").await;
    let res = srv
        .post(&temp, "/withdrawals", json!({ "code": "EST040", "quantity": 1 }))
        .await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = srv
        .client
        .delete(srv.url(&format!("/users/{}", created["id"].as_str().unwrap())))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = srv
        .client
        .get(srv.url("/whoami"))
        .bearer_auth(&temp)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let res = srv
        .post(&temp, "/withdrawals", json!({ "code": "EST040", "quantity": 1 }))
        .await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let summary = srv.get_json(&admin, "/prints/catalog/EST040").await;
    assert_eq!(summary["in_process_quantity"], 4);
}

#[tokio::test]
async fn reject_ambiguous_policy_refuses_multiple_lots() {
    let srv = TestServer::spawn_with(ApiConfig {
        lot_selection: LotSelection::RejectAmbiguous,
        ..ApiConfig::default()
    })
    .await;
    let admin = srv.login("admin", "admin").await;
    srv.stock(&admin, "EST050", 10).await;

    // Split off 4 units, then put the split lot back in process.
    let res = srv
        .post(&admin, "/withdrawals", json!({ "code": "EST050", "quantity": 4 }))
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    let done = srv
        .get_json(&admin, "/prints?status=completed&code=EST050")
        .await;
    let split_id = done["records"][0]["id"].as_str().unwrap().to_string();
    let res = srv
        .patch(
            &admin,
            &format!("/prints/{split_id}/status"),
            json!({ "status": "in_process" }),
        )
        .await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = srv
        .post(&admin, "/withdrawals", json!({ "code": "EST050", "quantity": 1 }))
        .await;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "ambiguous_match");

    let lots = srv
        .get_json(&admin, "/prints?status=in_process&code=EST050")
        .await;
    assert_eq!(lots["count"], 2);
}

#[tokio::test]
async fn journal_lists_committed_events_in_order() {
    let srv = TestServer::spawn().await;
    let token = srv.login("admin", "admin").await;

    srv.stock(&token, "EST020", 4).await;
    let res = srv
        .post(&token, "/withdrawals", json!({ "code": "EST020", "quantity": 4 }))
        .await;
    assert_eq!(res.status(), StatusCode::OK);

    let events = srv.get_json(&token, "/events").await;
    let types: Vec<&str> = events["events"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["event_type"].as_str().unwrap())
        .collect();
    assert_eq!(
        types,
        vec![
            "inventory.print.registered",
            "inventory.record.status_changed",
            "inventory.record.completed",
        ]
    );

    let tail = srv.get_json(&token, "/events?after=2").await;
    assert_eq!(tail["count"], 1);
    assert_eq!(tail["last_sequence"], 3);
}
