use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

use serde_json::{Value, json};
use testkit::MockUpstream;

fn bin() -> &'static str {
    env!("CARGO_BIN_EXE_telq")
}

fn telq(base_url: &str, config_dir: &Path) -> Command {
    let mut cmd = Command::new(bin());
    cmd.env("TELQ_BASE_URL", base_url)
        .env("TELQ_AUTH_TOKEN", "e2e-token")
        .env("TELQ_CONFIG", config_dir.join("absent.toml"))
        .env_remove("TELQ_DATASET")
        .env_remove("TELQ_DEBUG")
        .env_remove("TELQ_TIMEOUT")
        .env_remove("OTEL_EXPORTER_OTLP_ENDPOINT");
    cmd
}

async fn run_blocking(mut cmd: Command, stdin: Option<String>) -> Output {
    tokio::task::spawn_blocking(move || {
        let mut child = cmd
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .unwrap();
        let mut pipe = child.stdin.take().unwrap();
        if let Some(input) = stdin {
            pipe.write_all(input.as_bytes()).unwrap();
        }
        drop(pipe);
        child.wait_with_output().unwrap()
    })
    .await
    .unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn mcp_session_queries_spans() {
    let upstream = MockUpstream::start(200, testkit::sample_spans_response())
        .await
        .unwrap();
    let temp = tempfile::tempdir().unwrap();

    let input = [
        json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}),
        json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
        json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"}),
        json!({"jsonrpc": "2.0", "id": 3, "method": "tools/call", "params": {
            "name": "query_spans",
            "arguments": {"service_name": "api", "min_duration_ms": 100, "limit": 10000}
        }}),
    ]
    .iter()
    .map(|v| format!("{v}\n"))
    .collect::<String>();

    let mut cmd = telq(upstream.base_url(), temp.path());
    cmd.arg("mcp");
    let output = run_blocking(cmd, Some(input)).await;
    assert!(output.status.success());

    let replies: Vec<Value> = String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(replies.len(), 3);
    assert_eq!(replies[0]["result"]["serverInfo"]["name"], "telq");
    assert_eq!(replies[1]["result"]["tools"].as_array().unwrap().len(), 2);

    let text = replies[2]["result"]["content"][0]["text"].as_str().unwrap();
    let env: Value = serde_json::from_str(text).unwrap();
    assert_eq!(env["count"], 1);
    assert_eq!(env["records"][0]["duration_ms"], 200.0);
    assert_eq!(env["query"]["limit"], 200);

    let requests = upstream.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].path, "/api/spans");
    assert_eq!(requests[0].authorization.as_deref(), Some("Bearer e2e-token"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn mcp_without_token_still_initializes() {
    let temp = tempfile::tempdir().unwrap();
    let mut cmd = telq("http://127.0.0.1:9", temp.path());
    cmd.env_remove("TELQ_AUTH_TOKEN").arg("mcp");

    let input = format!(
        "{}\n{}\n",
        json!({"jsonrpc": "2.0", "id": 1, "method": "initialize"}),
        json!({"jsonrpc": "2.0", "id": 2, "method": "tools/call",
               "params": {"name": "query_logs", "arguments": {}}})
    );
    let output = run_blocking(cmd, Some(input)).await;
    let replies: Vec<Value> = String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(replies.len(), 2);
    assert!(replies[0]["result"]["protocolVersion"].is_string());
    assert_eq!(replies[1]["result"]["isError"], true);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn logs_json_output_applies_severity_filter() {
    let upstream = MockUpstream::start(200, testkit::sample_logs_response())
        .await
        .unwrap();
    let temp = tempfile::tempdir().unwrap();

    let mut cmd = telq(upstream.base_url(), temp.path());
    cmd.args(["--json", "logs", "--service", "api", "--severity", "error", "--since", "15m"]);
    let output = run_blocking(cmd, None).await;
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let env: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(env["count"], 1);
    assert_eq!(env["records"][0]["body"], "context deadline exceeded");
    assert_eq!(env["query"]["filters"][0]["key"], "service.name");

    let body = &upstream.requests()[0].body;
    assert_eq!(body["pagination"]["limit"], 200);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn human_output_prints_replayable_handle() {
    let upstream = MockUpstream::start(200, testkit::sample_spans_response())
        .await
        .unwrap();
    let temp = tempfile::tempdir().unwrap();

    let mut cmd = telq(upstream.base_url(), temp.path());
    cmd.args(["spans", "--min-duration-ms", "100"]);
    let output = run_blocking(cmd, None).await;
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    assert!(stdout.contains("cache.get redis"));
    assert!(!stdout.contains("GET /v1/orders"));
    assert!(stdout.contains("-- 1 spans"));

    let handle = stdout
        .lines()
        .find_map(|l| l.strip_prefix("handle="))
        .unwrap()
        .to_string();

    let mut cmd = telq(upstream.base_url(), temp.path());
    cmd.args(["--json", "handle", handle.as_str()]);
    let output = run_blocking(cmd, None).await;
    let env: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(env["count"], 1);
    assert_eq!(upstream.requests().len(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn upstream_error_exits_non_zero() {
    let upstream = MockUpstream::start(422, json!({"errors": [{"detail": "field is required"}]}))
        .await
        .unwrap();
    let temp = tempfile::tempdir().unwrap();

    let mut cmd = telq(upstream.base_url(), temp.path());
    cmd.args(["--json", "logs"]);
    let output = run_blocking(cmd, None).await;
    assert!(!output.status.success());
    let err: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(err["status_code"], 422);
    assert_eq!(err["detail"], "field is required");
}
