use std::time::Duration;

use serde_json::json;
use telq_core::filter::Severity;
use telq_core::query::{LogQuery, SpanQuery};
use telq_query::{ApiClient, QueryEngine};
use testkit::MockUpstream;

fn engine_for(upstream: &MockUpstream) -> QueryEngine<ApiClient> {
    let client = ApiClient::new(upstream.base_url(), "test-token", Duration::from_secs(5)).unwrap();
    QueryEngine::new(client)
}

#[tokio::test]
async fn log_query_sends_expected_request() -> anyhow::Result<()> {
    let upstream = MockUpstream::start(200, testkit::sample_logs_response()).await?;
    let engine = engine_for(&upstream);

    let env = engine
        .query_logs(&LogQuery {
            service_name: Some("api".into()),
            time_range_minutes: Some(15.0),
            limit: Some(50),
            ..LogQuery::default()
        })
        .await?;
    assert_eq!(env.count, 2);
    assert_eq!(env.records[0].service_name, "api");
    assert_eq!(env.records[0].timestamp, "2024-01-01T00:00:00Z");

    let requests = upstream.requests();
    assert_eq!(requests.len(), 1);
    let req = &requests[0];
    assert_eq!(req.method, "POST");
    assert_eq!(req.path, "/api/logs");
    assert_eq!(req.query, None);
    assert_eq!(req.authorization.as_deref(), Some("Bearer test-token"));
    assert_eq!(req.body["pagination"]["limit"], 100);
    assert_eq!(
        req.body["filter"],
        json!([{"key": "service.name", "operator": "equals", "value": {"stringValue": "api"}}])
    );
    assert_eq!(req.body["timeRange"], serde_json::to_value(env.query.time_range)?);
    Ok(())
}

#[tokio::test]
async fn envelope_serializes_with_echoed_query() -> anyhow::Result<()> {
    let upstream = MockUpstream::start(200, testkit::sample_logs_response()).await?;
    let env = engine_for(&upstream)
        .query_logs(&LogQuery {
            min_severity: Some(Severity::Error),
            body_contains: Some("DEADLINE".into()),
            ..LogQuery::default()
        })
        .await?;

    let value = serde_json::to_value(&env)?;
    assert_eq!(value["count"], 1);
    assert_eq!(value["records"][0]["severity_text"], "ERROR");
    assert_eq!(value["records"][0]["body"], "context deadline exceeded");
    assert_eq!(value["query"]["filters"], json!([]));
    assert_eq!(value["query"]["limit"], 100);
    assert!(value["query"]["timeRange"]["from"].is_string());
    Ok(())
}

#[tokio::test]
async fn span_query_pushes_filters_in_order() -> anyhow::Result<()> {
    let upstream = MockUpstream::start(200, testkit::sample_spans_response()).await?;
    let env = engine_for(&upstream)
        .query_spans(&SpanQuery {
            service_name: Some("api".into()),
            http_method: Some("GET".into()),
            http_status_code: Some(500),
            span_name: Some("GET /v1/orders".into()),
            error_only: true,
            min_duration_ms: Some(100.0),
            limit: Some(10_000),
            ..SpanQuery::default()
        })
        .await?;

    // The mock ignores filters, so only the client-side duration filter shows.
    assert_eq!(env.count, 1);
    assert_eq!(env.records[0].duration_ms, 200.0);
    assert_eq!(env.query.filters.len(), 5);
    assert_eq!(env.query.limit, 200);

    let req = &upstream.requests()[0];
    assert_eq!(req.path, "/api/spans");
    assert_eq!(req.body["pagination"]["limit"], 200);
    assert_eq!(req.body["filter"][2]["value"], json!({"intValue": "500"}));
    assert_eq!(
        req.body["filter"][4],
        json!({"key": "status.code", "operator": "equals", "value": {"intValue": "2"}})
    );
    Ok(())
}

#[tokio::test]
async fn dataset_is_sent_as_query_parameter() -> anyhow::Result<()> {
    let upstream = MockUpstream::start(200, json!({})).await?;
    let client = ApiClient::new(upstream.base_url(), "t", Duration::from_secs(5))?
        .with_dataset(Some("staging".into()));
    let env = QueryEngine::new(client).query_spans(&SpanQuery::default()).await?;
    assert_eq!(env.count, 0);
    assert_eq!(upstream.requests()[0].query.as_deref(), Some("dataset=staging"));
    Ok(())
}

#[tokio::test]
async fn error_body_detail_is_extracted() -> anyhow::Result<()> {
    let upstream =
        MockUpstream::start(422, json!({"errors": [{"detail": "field is required"}]})).await?;
    let err = engine_for(&upstream)
        .query_logs(&LogQuery::default())
        .await
        .unwrap_err();
    assert_eq!(err.status_code, 422);
    assert_eq!(err.detail, "field is required");
    assert_eq!(err.title.as_deref(), Some("422 Unprocessable Entity"));
    assert_eq!(
        err.payload,
        Some(json!({"errors": [{"detail": "field is required"}]}))
    );
    Ok(())
}

#[tokio::test]
async fn non_json_error_body_is_kept_as_text() -> anyhow::Result<()> {
    let upstream = MockUpstream::start_raw(502, "upstream unavailable").await?;
    let err = engine_for(&upstream)
        .query_spans(&SpanQuery::default())
        .await
        .unwrap_err();
    assert_eq!(err.status_code, 502);
    assert_eq!(err.detail, "");
    assert_eq!(err.payload, Some(json!("upstream unavailable")));
    Ok(())
}

#[tokio::test]
async fn non_json_success_body_yields_no_records() -> anyhow::Result<()> {
    let upstream = MockUpstream::start_raw(200, "ok").await?;
    let env = engine_for(&upstream).query_logs(&LogQuery::default()).await?;
    assert_eq!(env.count, 0);
    assert!(env.records.is_empty());
    Ok(())
}

#[tokio::test]
async fn unreachable_upstream_maps_to_500() -> anyhow::Result<()> {
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
        listener.local_addr()?
    };
    let client = ApiClient::new(format!("http://{addr}"), "t", Duration::from_secs(2))?;
    let err = QueryEngine::new(client)
        .query_logs(&LogQuery::default())
        .await
        .unwrap_err();
    assert_eq!(err.status_code, 500);
    assert!(err.detail.starts_with("request failed"), "{}", err.detail);
    Ok(())
}

#[tokio::test]
async fn concurrent_queries_share_one_engine() -> anyhow::Result<()> {
    let upstream = MockUpstream::start(200, testkit::sample_spans_response()).await?;
    let engine = engine_for(&upstream);
    let q = SpanQuery::default();

    let (a, b, c) = tokio::join!(
        engine.query_spans(&q),
        engine.query_spans(&q),
        engine.query_spans(&q)
    );
    for env in [a?, b?, c?] {
        assert_eq!(env.count, 2);
    }
    assert_eq!(upstream.requests().len(), 3);
    Ok(())
}
