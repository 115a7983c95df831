//! # Integration Tests for caboard-api
//!
//! Drives the assembled router with `oneshot`: health probes, feature
//! checks, feature gating, limit-gated creation, day values with cached
//! aggregates, payroll authority, authentication and tenant isolation.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use caboard_api::auth::USER_ID_HEADER;
use caboard_api::{AppConfig, AppState};
use caboard_core::{LimitDimension, OrganizationId, PlanTier, Timestamp, UserId};
use caboard_entitlements::PlanCatalog;
use caboard_store::Store;

/// An organization with its owner, served by an app without auth.
struct Tenant {
    app: Router,
    store: Store,
    owner: UserId,
    org: OrganizationId,
}

impl Tenant {
    async fn new() -> Self {
        Self::with_config(AppConfig::default()).await
    }

    async fn with_config(config: AppConfig) -> Self {
        let store = Store::in_memory(PlanCatalog::defaults());
        let owner = UserId::new();
        let member = store
            .create_organization_with_owner("Brasserie du Port", owner)
            .await
            .unwrap();
        let app = caboard_api::app(AppState::new(store.clone(), config));
        Self {
            app,
            store,
            owner,
            org: member.organization_id,
        }
    }

    async fn upgrade(&self, tier: PlanTier) {
        self.store
            .change_plan(self.org, tier, Timestamp::now(), None, Some("billing".into()))
            .await
            .unwrap();
    }

    async fn call(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        call_as(&self.app, Some(self.owner), method, uri, body).await
    }

    async fn create_mandate(&self, name: &str) -> String {
        let (status, body) = self
            .call(
                "POST",
                &format!("/v1/organizations/{}/mandates", self.org.0),
                Some(json!({ "name": name })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_str().unwrap().to_string()
    }
}

async fn call_as(
    app: &Router,
    user: Option<UserId>,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header(USER_ID_HEADER, user.0.to_string());
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, value)
}

// -- Health Probes ------------------------------------------------------------

#[tokio::test]
async fn health_probes_answer_without_a_database() {
    let tenant = Tenant::new().await;
    let (status, body) = call_as(&tenant.app, None, "GET", "/health/liveness", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!("ok"));

    let (status, body) = call_as(&tenant.app, None, "GET", "/health/readiness", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!("ready"));
}

#[tokio::test]
async fn metrics_endpoint_is_empty_without_a_recorder() {
    let tenant = Tenant::new().await;
    let (status, body) = call_as(&tenant.app, None, "GET", "/metrics", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::Null);
}

// -- Feature Access -----------------------------------------------------------

#[tokio::test]
async fn feature_check_follows_the_plan() {
    let tenant = Tenant::new().await;
    let uri = format!("/v1/users/{}/features/payroll", tenant.owner.0);

    let (status, body) = tenant.call("GET", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "feature": "payroll", "allowed": false }));

    tenant.upgrade(PlanTier::Premium).await;
    let (_, body) = tenant.call("GET", &uri, None).await;
    assert_eq!(body["allowed"], json!(true));
}

#[tokio::test]
async fn unknown_feature_is_denied_not_an_error() {
    let tenant = Tenant::new().await;
    let uri = format!("/v1/users/{}/features/teleportation", tenant.owner.0);
    let (status, body) = tenant.call("GET", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["allowed"], json!(false));
}

#[tokio::test]
async fn user_without_organization_is_denied_everything() {
    let tenant = Tenant::new().await;
    let stranger = UserId::new();
    let (status, body) = tenant
        .call("GET", &format!("/v1/users/{}/features", stranger.0), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.get("tier").is_none());
    let features = body["features"].as_array().unwrap();
    assert!(!features.is_empty());
    assert!(features.iter().all(|f| f["allowed"] == json!(false)));
}

#[tokio::test]
async fn malformed_user_id_is_a_validation_error() {
    let tenant = Tenant::new().await;
    let (status, body) = tenant
        .call("GET", "/v1/users/not-a-uuid/features/payroll", None)
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], json!("VALIDATION_ERROR"));
}

// -- Effective Plan and Limits ------------------------------------------------

#[tokio::test]
async fn organization_without_subscription_falls_back_to_free() {
    let tenant = Tenant::new().await;
    let (status, body) = tenant
        .call("GET", &format!("/v1/organizations/{}/plan", tenant.org.0), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tier"], json!("FREE"));
    assert_eq!(body["is_active"], json!(false));
    assert_eq!(body["fallback"], json!("no_subscription"));
}

#[tokio::test]
async fn limit_status_reports_owner_against_free_seat() {
    let tenant = Tenant::new().await;
    let (status, body) = tenant
        .call("GET", &format!("/v1/organizations/{}/limits/users", tenant.org.0), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["current"], json!(1));
    assert_eq!(body["limit"], json!(1));
    assert_eq!(body["allowed"], json!(true));
    assert_eq!(body["percentage"], json!(100));
    assert_eq!(body["remaining"], json!(0));
}

#[tokio::test]
async fn unknown_dimension_is_a_validation_error() {
    let tenant = Tenant::new().await;
    let (status, _) = tenant
        .call("GET", &format!("/v1/organizations/{}/limits/seats", tenant.org.0), None)
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn usage_covers_every_dimension() {
    let tenant = Tenant::new().await;
    let (status, body) = tenant
        .call("GET", &format!("/v1/organizations/{}/usage", tenant.org.0), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), LimitDimension::all().len());
}

// -- Limit-Gated Creation -----------------------------------------------------

#[tokio::test]
async fn second_mandate_on_free_is_refused() {
    let tenant = Tenant::new().await;
    tenant.create_mandate("Le Comptoir").await;

    let (status, body) = tenant
        .call(
            "POST",
            &format!("/v1/organizations/{}/mandates", tenant.org.0),
            Some(json!({ "name": "La Terrasse" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], json!("LIMIT_EXCEEDED"));
    assert_eq!(
        body["error"]["details"],
        json!({ "dimension": "mandates", "current": 1, "limit": 1 })
    );
    assert_eq!(tenant.store.ledger().mandates(tenant.org).len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn simultaneous_mandate_creations_respect_the_limit() {
    let tenant = Tenant::new().await;
    let uri = format!("/v1/organizations/{}/mandates", tenant.org.0);

    let requests: Vec<_> = (0..8)
        .map(|n| {
            let app = tenant.app.clone();
            let owner = tenant.owner;
            let uri = uri.clone();
            tokio::spawn(async move {
                call_as(&app, Some(owner), "POST", &uri, Some(json!({ "name": format!("Mandat {n}") })))
                    .await
            })
        })
        .collect();
    let mut statuses = Vec::new();
    for request in requests {
        statuses.push(request.await.unwrap().0);
    }

    assert_eq!(statuses.iter().filter(|s| **s == StatusCode::CREATED).count(), 1);
    assert_eq!(statuses.iter().filter(|s| **s == StatusCode::FORBIDDEN).count(), 7);
    assert_eq!(tenant.store.ledger().mandates(tenant.org).len(), 1);
}

#[tokio::test]
async fn member_seat_opens_after_upgrade() {
    let tenant = Tenant::new().await;
    let uri = format!("/v1/organizations/{}/members", tenant.org.0);
    let newcomer = UserId::new();
    let body = json!({ "user_id": newcomer.0.to_string(), "role": "ADMIN" });

    let (status, refused) = tenant.call("POST", &uri, Some(body.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(refused["error"]["details"]["dimension"], json!("users"));

    tenant.upgrade(PlanTier::Premium).await;
    let (status, added) = tenant.call("POST", &uri, Some(body)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(added["role"], json!("ADMIN"));

    let (_, members) = tenant.call("GET", &uri, None).await;
    assert_eq!(members.as_array().unwrap().len(), 2);

    let (status, _) = tenant
        .call("DELETE", &format!("{uri}/{}", newcomer.0), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tenant.store.ledger().members(tenant.org).len(), 1);
}

#[tokio::test]
async fn oversized_file_is_refused_and_empty_file_is_accepted() {
    let tenant = Tenant::new().await;
    let uri = format!("/v1/organizations/{}/files", tenant.org.0);

    let (status, body) = tenant
        .call("POST", &uri, Some(json!({ "name": "scan.pdf", "size_bytes": 200u64 * 1024 * 1024 })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["details"]["dimension"], json!("storage"));

    let (status, file) = tenant
        .call("POST", &uri, Some(json!({ "name": "empty.txt", "size_bytes": 0 })))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let file_id = file["id"].as_str().unwrap();
    let (status, _) = tenant.call("DELETE", &format!("{uri}/{file_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn blank_mandate_name_is_rejected() {
    let tenant = Tenant::new().await;
    let (status, _) = tenant
        .call(
            "POST",
            &format!("/v1/organizations/{}/mandates", tenant.org.0),
            Some(json!({ "name": "   " })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn creating_an_organization_makes_the_caller_owner() {
    let tenant = Tenant::new().await;
    let founder = UserId::new();
    let (status, body) = call_as(
        &tenant.app,
        Some(founder),
        "POST",
        "/v1/organizations",
        Some(json!({ "name": "Café Central" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["owner"]["role"], json!("OWNER"));

    // A second organization for the same user conflicts.
    let (status, _) = call_as(
        &tenant.app,
        Some(founder),
        "POST",
        "/v1/organizations",
        Some(json!({ "name": "Café Central Bis" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

// -- Day Values and Aggregates ------------------------------------------------

#[tokio::test]
async fn day_value_writes_keep_mandate_aggregates_current() {
    let tenant = Tenant::new().await;
    let mandate = tenant.create_mandate("Le Comptoir").await;
    let uri = format!("/v1/mandates/{mandate}/day-values");

    let (status, first) = tenant
        .call("POST", &uri, Some(json!({ "date": "2026-03-01", "value_cents": 120000 })))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = tenant
        .call("POST", &uri, Some(json!({ "date": "2026-03-02", "value_cents": 80000 })))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, listing) = tenant.call("GET", &uri, None).await;
    assert_eq!(listing["mandate"]["total_revenue"], json!(200000));
    assert_eq!(listing["mandate"]["last_entry"], json!("2026-03-02"));
    assert_eq!(listing["day_values"].as_array().unwrap().len(), 2);

    let first_id = first["id"].as_str().unwrap();
    let (status, _) = tenant
        .call("PUT", &format!("{uri}/{first_id}"), Some(json!({ "value_cents": 100000 })))
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, listing) = tenant.call("GET", &uri, None).await;
    assert_eq!(listing["mandate"]["total_revenue"], json!(180000));

    let second_id = listing["day_values"][1]["id"].as_str().unwrap().to_string();
    let (status, _) = tenant.call("DELETE", &format!("{uri}/{second_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    let (_, listing) = tenant.call("GET", &uri, None).await;
    assert_eq!(listing["mandate"]["total_revenue"], json!(100000));
    assert_eq!(listing["mandate"]["last_entry"], json!("2026-03-01"));

    assert!(tenant.store.ledger().verify_aggregates().is_empty());
}

#[tokio::test]
async fn duplicate_date_and_negative_value_are_rejected() {
    let tenant = Tenant::new().await;
    let mandate = tenant.create_mandate("Le Comptoir").await;
    let uri = format!("/v1/mandates/{mandate}/day-values");

    let (status, _) = tenant
        .call("POST", &uri, Some(json!({ "date": "2026-03-01", "value_cents": 1000 })))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = tenant
        .call("POST", &uri, Some(json!({ "date": "2026-03-01", "value_cents": 2000 })))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, _) = tenant
        .call("POST", &uri, Some(json!({ "date": "2026-03-03", "value_cents": -5 })))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn monthly_revenue_lists_twelve_months() {
    let tenant = Tenant::new().await;
    let mandate = tenant.create_mandate("Le Comptoir").await;
    tenant
        .call(
            "POST",
            &format!("/v1/mandates/{mandate}/day-values"),
            Some(json!({ "date": "2026-02-14", "value_cents": 50000 })),
        )
        .await;

    let (status, months) = tenant
        .call("GET", &format!("/v1/mandates/{mandate}/revenue/2026"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let months = months.as_array().unwrap();
    assert_eq!(months.len(), 12);
    assert_eq!(months[1]["total"], json!(50000));
    assert_eq!(months[1]["entries"], json!(1));
    assert_eq!(months[0]["total"], json!(0));
}

// -- Payroll ------------------------------------------------------------------

#[tokio::test]
async fn payroll_is_gated_on_free() {
    let tenant = Tenant::new().await;
    let mandate = tenant.create_mandate("Le Comptoir").await;
    let (status, body) = tenant
        .call("GET", &format!("/v1/mandates/{mandate}/payroll/authority"), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], json!("FEATURE_NOT_AVAILABLE"));
    let details = &body["error"]["details"];
    assert_eq!(details["feature"], json!("payroll"));
    assert_eq!(details["current_tier"], json!("FREE"));
    assert!(details["required_tiers"]
        .as_array()
        .unwrap()
        .contains(&json!("PREMIUM")));
}

#[tokio::test]
async fn payroll_authority_depends_on_rule() {
    let tenant = Tenant::new().await;
    tenant.upgrade(PlanTier::Premium).await;
    let mandate = tenant.create_mandate("Le Comptoir").await;

    let (status, _) = tenant
        .call(
            "PUT",
            &format!("/v1/mandates/{mandate}/payroll/manual"),
            Some(json!({ "year": 2026, "month": 2, "employee_count": 4, "gross_payroll_cents": 900000 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    // Uploaded before February began, but covering March.
    let (status, _) = tenant
        .call(
            "POST",
            &format!("/v1/mandates/{mandate}/payroll/imports"),
            Some(json!({
                "total_employees": 6,
                "gross_payroll_cents": 1300000,
                "import_date": "2026-01-20T09:00:00Z",
                "period_year": 2026,
                "period_month": 3,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let uri = format!("/v1/mandates/{mandate}/payroll/authority");
    let (_, recency) = tenant.call("GET", &uri, None).await;
    assert_eq!(recency["employee_count"], json!(4));
    assert_eq!(recency["source"], json!("manual"));
    assert_eq!(recency["rule"], json!("recorded_recency"));

    let (_, latest) = tenant
        .call("GET", &format!("{uri}?rule=latest_period"), None)
        .await;
    assert_eq!(latest["employee_count"], json!(6));
    assert_eq!(latest["source"], json!("import"));
}

#[tokio::test]
async fn payroll_summary_relates_payroll_to_revenue() {
    let tenant = Tenant::new().await;
    tenant.upgrade(PlanTier::Premium).await;
    let mandate = tenant.create_mandate("Le Comptoir").await;

    for (date, value) in [("2026-03-01", 100000), ("2026-03-02", 50000)] {
        tenant
            .call(
                "POST",
                &format!("/v1/mandates/{mandate}/day-values"),
                Some(json!({ "date": date, "value_cents": value })),
            )
            .await;
    }
    tenant
        .call(
            "PUT",
            &format!("/v1/mandates/{mandate}/payroll/manual"),
            Some(json!({ "year": 2026, "month": 3, "employee_count": 3, "gross_payroll_cents": 30000 })),
        )
        .await;

    let (status, summary) = tenant
        .call("GET", &format!("/v1/mandates/{mandate}/payroll/summary/2026/3"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["revenue"], json!(150000));
    assert_eq!(summary["employee_count"], json!(3));
    assert_eq!(summary["payroll_ratio_percent"].as_f64(), Some(20.0));

    let (status, _) = tenant
        .call("GET", &format!("/v1/mandates/{mandate}/payroll/summary/2026/13"), None)
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn authority_without_data_reports_no_count() {
    let tenant = Tenant::new().await;
    tenant.upgrade(PlanTier::Illimite).await;
    let mandate = tenant.create_mandate("Le Comptoir").await;
    let (status, body) = tenant
        .call("GET", &format!("/v1/mandates/{mandate}/payroll/authority"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["employee_count"], Value::Null);
}

// -- Tenant Isolation ---------------------------------------------------------

#[tokio::test]
async fn other_tenants_data_answers_not_found() {
    let tenant = Tenant::new().await;
    let mandate = tenant.create_mandate("Le Comptoir").await;

    let outsider = UserId::new();
    tenant
        .store
        .create_organization_with_owner("Chez Rival", outsider)
        .await
        .unwrap();

    for uri in [
        format!("/v1/organizations/{}/usage", tenant.org.0),
        format!("/v1/organizations/{}/mandates", tenant.org.0),
        format!("/v1/mandates/{mandate}/day-values"),
    ] {
        let (status, body) = call_as(&tenant.app, Some(outsider), "GET", &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
        assert_eq!(body["error"]["code"], json!("NOT_FOUND"));
    }
}

#[tokio::test]
async fn missing_caller_header_is_unauthorized() {
    let tenant = Tenant::new().await;
    let (status, _) = call_as(
        &tenant.app,
        None,
        "GET",
        &format!("/v1/organizations/{}/usage", tenant.org.0),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// -- Authentication -----------------------------------------------------------

#[tokio::test]
async fn bearer_token_guards_api_but_not_health() {
    let tenant = Tenant::with_config(AppConfig {
        auth_token: Some("s3cret".into()),
        ..AppConfig::default()
    })
    .await;
    let uri = format!("/v1/users/{}/features/payroll", tenant.owner.0);

    let (status, body) = tenant.call("GET", &uri, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], json!("UNAUTHORIZED"));

    let request = Request::builder()
        .uri(&uri)
        .header(header::AUTHORIZATION, "Bearer s3cret")
        .body(Body::empty())
        .unwrap();
    let response = tenant.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let (status, _) = call_as(&tenant.app, None, "GET", "/health/liveness", None).await;
    assert_eq!(status, StatusCode::OK);
}

// -- OpenAPI ------------------------------------------------------------------

#[tokio::test]
async fn openapi_document_is_served() {
    let tenant = Tenant::new().await;
    let (status, body) = call_as(&tenant.app, None, "GET", "/openapi.json", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["openapi"].as_str().unwrap().starts_with("3."));
    assert!(body["paths"]
        .as_object()
        .unwrap()
        .contains_key("/v1/mandates/{id}/payroll/authority"));
}
