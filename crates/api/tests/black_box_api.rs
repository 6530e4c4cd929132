use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use reqwest::StatusCode;
use serde_json::json;

use cadence_api::app::{AppServices, build_app};
use cadence_billing::{BillingAttempt, BillingCycle};
use cadence_core::{ContractId, OrderId, TenantId};
use cadence_infra::config::SchedulerKind;
use cadence_infra::jobs::{JobKind, RemoteError};
use cadence_infra::platform::{ContractSummary, FAILED_STATUS, PlatformCall};

const SHOP: &str = "shop.myshopify.com";
const SHOP_HEADER: &str = "X-Shopify-Shop-Domain";

struct TestServer {
    base_url: String,
    services: Arc<AppServices>,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn(scheduler: SchedulerKind) -> Self {
        // Same router as prod, bound to an ephemeral port.
        let services = Arc::new(AppServices::in_memory(scheduler).expect("job registry"));
        let app = build_app(services.clone());
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
            services,
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn recorded_names(&self) -> Vec<&'static str> {
        self.services
            .test_scheduler
            .as_ref()
            .expect("test scheduler active")
            .recorded()
            .iter()
            .map(|r| r.job.name())
            .collect()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[tokio::test]
async fn health_is_public() {
    let srv = TestServer::spawn(SchedulerKind::Test).await;
    let res = reqwest::get(srv.url("/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn webhooks_require_a_shop_domain() {
    let srv = TestServer::spawn(SchedulerKind::Test).await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/webhooks/subscription_contracts/pause"))
        .json(&json!({"id": 1}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client
        .post(srv.url("/webhooks/subscription_contracts/pause"))
        .header(SHOP_HEADER, "not a domain")
        .json(&json!({"id": 1}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_tenant");

    assert!(srv.recorded_names().is_empty());
}

#[tokio::test]
async fn contract_created_enqueues_email_tags_and_forward() {
    let srv = TestServer::spawn(SchedulerKind::Test).await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/webhooks/subscription_contracts/create"))
        .header(SHOP_HEADER, SHOP)
        .json(&json!({
            "id": 42,
            "admin_graphql_api_id": "gid://shopify/SubscriptionContract/42",
            "admin_graphql_api_customer_id": "gid://shopify/Customer/7",
            "admin_graphql_api_origin_order_id": "gid://shopify/Order/9",
            "status": "active"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    assert_eq!(
        srv.recorded_names(),
        vec!["CustomerSendEmailJob", "TagSubscriptionOrderJob", "ExternalWebhookJob"]
    );

    let recorded = srv.services.test_scheduler.as_ref().unwrap().recorded();
    match &recorded[1].job {
        JobKind::TagSubscriptionOrder(job) => {
            use cadence_infra::jobs::Job;
            let payload = &job.parameters().payload;
            assert_eq!(payload.order_id, Some(OrderId::from_numeric(9)));
            assert_eq!(payload.tags, vec!["Subscription", "Subscription First Order"]);
            assert_eq!(job.tenant(), &TenantId::new(SHOP).unwrap());
        }
        other => panic!("unexpected job {other:?}"),
    }
}

#[tokio::test]
async fn contract_created_without_origin_order_skips_the_email() {
    let srv = TestServer::spawn(SchedulerKind::Test).await;

    let res = reqwest::Client::new()
        .post(srv.url("/webhooks/subscription_contracts/create"))
        .header(SHOP_HEADER, SHOP)
        .json(&json!({"admin_graphql_api_id": "gid://shopify/SubscriptionContract/42"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        srv.recorded_names(),
        vec!["TagSubscriptionOrderJob", "ExternalWebhookJob"]
    );
}

#[tokio::test]
async fn cancel_notifies_customer_and_merchant_inline() {
    let srv = TestServer::spawn(SchedulerKind::Inline).await;

    let res = reqwest::Client::new()
        .post(srv.url("/webhooks/subscription_contracts/cancel"))
        .header(SHOP_HEADER, SHOP)
        .json(&json!({
            "admin_graphql_api_id": "gid://shopify/SubscriptionContract/5",
            "admin_graphql_api_customer_id": "gid://shopify/Customer/6"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    assert_eq!(srv.services.fakes.notifier.sent().len(), 2);
    let forwarded = srv.services.fakes.forwarder.forwarded();
    assert_eq!(forwarded.len(), 1);
    assert_eq!(forwarded[0].1.event, "subscription-canceled");
}

#[tokio::test]
async fn inline_transient_failure_is_a_server_error() {
    let srv = TestServer::spawn(SchedulerKind::Inline).await;
    srv.services
        .fakes
        .forwarder
        .fail_next(RemoteError::http(429, "throttled"));

    let res = reqwest::Client::new()
        .post(srv.url("/webhooks/subscription_contracts/pause"))
        .header(SHOP_HEADER, SHOP)
        .json(&json!({"id": 1}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "enqueue_failed");
}

#[tokio::test]
async fn skip_composes_the_contract_gid() {
    let srv = TestServer::spawn(SchedulerKind::Test).await;

    let res = reqwest::Client::new()
        .post(srv.url("/webhooks/subscription_billing_cycles/skip"))
        .header(SHOP_HEADER, SHOP)
        .json(&json!({"subscription_contract_id": 77, "cycle_index": 4}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let recorded = srv.services.test_scheduler.as_ref().unwrap().recorded();
    match &recorded[0].job {
        JobKind::CustomerSendEmail(job) => {
            use cadence_infra::jobs::Job;
            let payload = &job.parameters().payload;
            assert_eq!(payload.contract_id, ContractId::from_numeric(77));
            assert_eq!(payload.cycle_index, Some(4));
        }
        other => panic!("unexpected job {other:?}"),
    }
    match &recorded[1].job {
        JobKind::ExternalWebhook(job) => {
            use cadence_infra::jobs::Job;
            let data = &job.parameters().payload.subscription_data;
            assert_eq!(data["admin_graphql_api_id"], "gid://shopify/SubscriptionContract/77");
        }
        other => panic!("unexpected job {other:?}"),
    }
}

#[tokio::test]
async fn dispatch_status_codes() {
    let srv = TestServer::spawn(SchedulerKind::DurableQueue).await;
    let client = reqwest::Client::new();
    let dispatch = |body: serde_json::Value| {
        client
            .post(srv.url("/jobs/dispatch"))
            .json(&body)
            .send()
    };

    let ok = dispatch(json!({
        "jobClassName": "TagSubscriptionOrderJob",
        "tenant": SHOP,
        "payload": {"orderId": "gid://shopify/Order/1", "tags": ["Subscription"]},
        "queueName": "webhooks"
    }))
    .await
    .unwrap();
    assert_eq!(ok.status(), StatusCode::OK);
    assert_eq!(srv.services.fakes.platform.tagged_orders().len(), 1);

    let unknown = dispatch(json!({
        "jobClassName": "NoSuchJob",
        "tenant": SHOP,
        "payload": {}
    }))
    .await
    .unwrap();
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);

    let invalid = dispatch(json!({
        "jobClassName": "SendInventoryFailureEmailJob",
        "tenant": SHOP,
        "payload": {"frequency": "hourly"}
    }))
    .await
    .unwrap();
    assert_eq!(invalid.status(), StatusCode::UNPROCESSABLE_ENTITY);

    srv.services
        .fakes
        .platform
        .fail_next(PlatformCall::AddOrderTags, RemoteError::http(429, "throttled"));
    let rejected = dispatch(json!({
        "jobClassName": "TagSubscriptionOrderJob",
        "tenant": SHOP,
        "payload": {"orderId": "gid://shopify/Order/2", "tags": []}
    }))
    .await
    .unwrap();
    assert_eq!(rejected.status(), StatusCode::INTERNAL_SERVER_ERROR);

    srv.services
        .fakes
        .platform
        .fail_next(PlatformCall::AddOrderTags, RemoteError::http(404, "gone"));
    let swallowed = dispatch(json!({
        "jobClassName": "TagSubscriptionOrderJob",
        "tenant": SHOP,
        "payload": {"orderId": "gid://shopify/Order/3", "tags": []}
    }))
    .await
    .unwrap();
    assert_eq!(swallowed.status(), StatusCode::OK);
}

#[tokio::test]
async fn webhook_under_durable_queue_submits_tasks() {
    let srv = TestServer::spawn(SchedulerKind::DurableQueue).await;

    let res = reqwest::Client::new()
        .post(srv.url("/webhooks/subscription_billing_attempts/success"))
        .header(SHOP_HEADER, SHOP)
        .json(&json!({"admin_graphql_api_order_id": "gid://shopify/Order/12"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let tasks = srv.services.task_submitter.as_ref().unwrap().submitted();
    let names: Vec<_> = tasks.iter().map(|t| t.job_class_name.as_str()).collect();
    assert_eq!(names, vec!["TagSubscriptionOrderJob", "ExternalWebhookJob"]);
    assert!(srv.services.fakes.platform.tagged_orders().is_empty());
}

#[tokio::test]
async fn monitoring_trigger_records_a_monitor_job() {
    let srv = TestServer::spawn(SchedulerKind::Test).await;

    let res = reqwest::Client::new()
        .post(srv.url("/admin/monitoring/trigger"))
        .header(SHOP_HEADER, SHOP)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::ACCEPTED);
    assert_eq!(srv.recorded_names(), vec!["SubscriptionMonitorJob"]);

    let res = reqwest::Client::new()
        .get(srv.url("/admin/scheduler"))
        .header(SHOP_HEADER, SHOP)
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["scheduler"], "test");
    assert_eq!(body["capabilities"]["executes_jobs"], false);
}

#[tokio::test]
async fn failed_contract_sweep_resumes_every_shop_inline() {
    let srv = TestServer::spawn(SchedulerKind::Inline).await;
    let fakes = &srv.services.fakes;
    let other = TenantId::new("other.myshopify.com").unwrap();
    for (n, tenant) in [TenantId::new(SHOP).unwrap(), other.clone()].into_iter().enumerate() {
        fakes.shops.install(tenant.clone(), "token");
        fakes.platform.set_contracts(
            tenant,
            vec![ContractSummary {
                id: ContractId::from_numeric(n as u64 + 1),
                status: FAILED_STATUS.to_string(),
                created_at: Utc::now(),
                customer_id: None,
                origin_order_id: None,
            }],
        );
    }

    let res = reqwest::Client::new()
        .post(srv.url("/admin/migrations/failed-contracts/trigger"))
        .header(SHOP_HEADER, SHOP)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::ACCEPTED);

    let resumed: Vec<_> = fakes
        .platform
        .resumed()
        .into_iter()
        .map(|(tenant, ids)| (tenant.as_str().to_string(), ids.len()))
        .collect();
    assert_eq!(
        resumed,
        vec![("other.myshopify.com".to_string(), 1), (SHOP.to_string(), 1)]
    );
}

#[tokio::test]
async fn billing_cycle_views() {
    let srv = TestServer::spawn(SchedulerKind::Test).await;
    let client = reqwest::Client::new();
    let contract = ContractId::from_numeric(10);

    let start = Utc::now() - Duration::days(60);
    let day = |n: i64| start + Duration::days(n);
    srv.services.billing_feed.insert_cycles(
        TenantId::new(SHOP).unwrap(),
        contract.clone(),
        vec![
            BillingCycle::new(day(0)).with_attempt(BillingAttempt::fulfilled(OrderId::from_numeric(1))),
            BillingCycle::new(day(30)).with_attempt(BillingAttempt::failed("CARD_DECLINED")),
            BillingCycle::new(day(90)),
            BillingCycle::new(day(120)).skipped(),
        ],
    );

    let res = client
        .get(srv.url("/contracts/10/billing-cycles/upcoming?count=2&interval=month"))
        .header(SHOP_HEADER, SHOP)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let upcoming: Vec<serde_json::Value> = res.json().await.unwrap();
    assert_eq!(upcoming.len(), 2);
    assert_eq!(upcoming[1]["skipped"], true);

    let since = Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap();
    let res = client
        .get(srv.url(&format!(
            "/contracts/10/billing-cycles/past?since={}",
            since.format("%Y-%m-%dT%H:%M:%SZ")
        )))
        .header(SHOP_HEADER, SHOP)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let past: serde_json::Value = res.json().await.unwrap();
    assert!(past["pastBillingCycles"].as_array().unwrap().len() >= 2);
    assert_eq!(
        past["failedBillingCycle"]["processingErrorCode"],
        "CARD_DECLINED"
    );

    let res = client
        .get(srv.url("/contracts/999/billing-cycles/upcoming"))
        .header(SHOP_HEADER, SHOP)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn billing_cycles_are_scoped_to_the_owning_shop() {
    let srv = TestServer::spawn(SchedulerKind::Test).await;
    let client = reqwest::Client::new();
    srv.services.billing_feed.insert_cycles(
        TenantId::new(SHOP).unwrap(),
        ContractId::from_numeric(11),
        vec![BillingCycle::new(Utc::now() + Duration::days(3))],
    );

    let res = client
        .get(srv.url("/contracts/11/billing-cycles/upcoming"))
        .header(SHOP_HEADER, SHOP)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let upcoming: Vec<serde_json::Value> = res.json().await.unwrap();
    assert_eq!(upcoming.len(), 1);

    for path in [
        "/contracts/11/billing-cycles/upcoming",
        "/contracts/11/billing-cycles/past?since=2000-01-01T00:00:00Z",
    ] {
        let res = client
            .get(srv.url(path))
            .header(SHOP_HEADER, "other.myshopify.com")
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_GATEWAY, "{path}");
        let body: serde_json::Value = res.json().await.unwrap();
        assert_eq!(body["error"], "billing_data_unavailable");
        assert!(body.get("pastBillingCycles").is_none());
    }
}

#[tokio::test]
async fn contract_without_cycles_has_empty_past() {
    let srv = TestServer::spawn(SchedulerKind::Test).await;
    srv.services.billing_feed.insert_cycles(
        TenantId::new(SHOP).unwrap(),
        ContractId::from_numeric(12),
        Vec::new(),
    );

    let res = reqwest::Client::new()
        .get(srv.url("/contracts/12/billing-cycles/past?since=2000-01-01T00:00:00Z"))
        .header(SHOP_HEADER, SHOP)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let past: serde_json::Value = res.json().await.unwrap();
    assert_eq!(past, json!({"pastBillingCycles": []}));
}
