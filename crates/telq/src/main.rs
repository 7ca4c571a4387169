mod mcp;
mod output;
mod protocol;
mod telemetry;

use anyhow::Context;
use base64::Engine;
use clap::{Parser, Subcommand};
use telq_core::config::Config;
use telq_core::filter::Severity;
use telq_core::query::{LogQuery, SpanQuery};
use telq_core::time::parse_lookback_minutes;
use telq_query::{ApiClient, QueryEngine};

use crate::mcp::McpServer;
use crate::output::{print_error_human, print_logs_human, print_spans_human};
use crate::protocol::{ApiRequest, ApiResponse, execute};
use crate::telemetry::{init_tracing, shutdown_tracing};

#[derive(Parser, Debug)]
#[command(name = "telq")]
#[command(about = "Query logs and spans from a hosted telemetry backend")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "Query log records")]
    Logs {
        #[arg(long)]
        service: Option<String>,
        #[arg(long, help = "Lookback window, e.g. 15m or 2h (default 1h, max 24h)")]
        since: Option<String>,
        #[arg(long)]
        severity: Option<String>,
        #[arg(long, help = "Case-insensitive body substring")]
        grep: Option<String>,
        #[arg(long)]
        limit: Option<usize>,
    },
    #[command(about = "Query spans")]
    Spans {
        #[arg(long)]
        service: Option<String>,
        #[arg(long, help = "Lookback window, e.g. 15m or 2h (default 1h, max 24h)")]
        since: Option<String>,
        #[arg(long)]
        method: Option<String>,
        #[arg(long)]
        status_code: Option<i64>,
        #[arg(long)]
        name: Option<String>,
        #[arg(long, help = "Only spans with error status")]
        errors: bool,
        #[arg(long)]
        min_duration_ms: Option<f64>,
        #[arg(long)]
        limit: Option<usize>,
    },
    #[command(about = "Execute a previously emitted handle")]
    Handle { handle: String },
    #[command(about = "Serve query_logs and query_spans as MCP tools over stdio")]
    Mcp,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = Config::load().context("load config")?;
    init_tracing(cfg.debug);

    let result = run(cli, cfg).await;
    shutdown_tracing();
    result
}

async fn run(cli: Cli, cfg: Config) -> anyhow::Result<()> {
    let request = match cli.command {
        Commands::Mcp => {
            let engine = ApiClient::from_config(&cfg)
                .map(QueryEngine::new)
                .map_err(|e| e.to_string());
            if let Err(reason) = &engine {
                tracing::warn!(%reason, "upstream not configured; tool calls will fail");
            }
            return McpServer::new(engine).serve_stdio().await;
        }
        Commands::Handle { handle } => decode_handle(&handle)?,
        Commands::Logs {
            service,
            since,
            severity,
            grep,
            limit,
        } => ApiRequest::QueryLogs(LogQuery {
            service_name: service,
            time_range_minutes: parse_since(since)?,
            min_severity: severity
                .map(|s| s.parse::<Severity>())
                .transpose()?,
            body_contains: grep,
            limit,
        }),
        Commands::Spans {
            service,
            since,
            method,
            status_code,
            name,
            errors,
            min_duration_ms,
            limit,
        } => ApiRequest::QuerySpans(SpanQuery {
            service_name: service,
            time_range_minutes: parse_since(since)?,
            http_method: method,
            http_status_code: status_code,
            span_name: name,
            error_only: errors,
            min_duration_ms,
            limit,
        }),
    };

    let engine = QueryEngine::new(ApiClient::from_config(&cfg).context("configure upstream")?);
    let handle = encode_handle(&request)?;
    let response = execute(&engine, &request).await;
    print_response(response, cli.json)?;
    if !cli.json {
        println!("handle={handle}");
    }
    Ok(())
}

fn parse_since(since: Option<String>) -> anyhow::Result<Option<f64>> {
    Ok(since.map(|s| parse_lookback_minutes(&s)).transpose()?)
}

fn encode_handle(req: &ApiRequest) -> anyhow::Result<String> {
    let payload = serde_json::to_vec(req)?;
    Ok(base64::engine::general_purpose::STANDARD.encode(payload))
}

fn decode_handle(handle: &str) -> anyhow::Result<ApiRequest> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(handle.trim())
        .context("handle is not valid base64")?;
    serde_json::from_slice(&bytes).context("handle does not encode a query")
}

fn print_response(response: ApiResponse, json: bool) -> anyhow::Result<()> {
    match response {
        ApiResponse::Logs(v) if json => println!("{}", serde_json::to_string_pretty(&v)?),
        ApiResponse::Spans(v) if json => println!("{}", serde_json::to_string_pretty(&v)?),
        ApiResponse::Logs(v) => print_logs_human(&v),
        ApiResponse::Spans(v) => print_spans_human(&v),
        ApiResponse::Error(e) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&e)?);
            } else {
                print_error_human(&e);
            }
            return Err(e.into());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_round_trips_request() {
        let req = ApiRequest::QueryLogs(LogQuery {
            service_name: Some("api".into()),
            time_range_minutes: Some(15.0),
            ..LogQuery::default()
        });
        let handle = encode_handle(&req).unwrap();
        assert_eq!(decode_handle(&handle).unwrap(), req);
    }

    #[test]
    fn bad_handles_are_rejected() {
        assert!(decode_handle("not base64!").is_err());
        let not_a_query = base64::engine::general_purpose::STANDARD.encode(b"{\"Status\":null}");
        assert!(decode_handle(&not_a_query).is_err());
    }

    #[test]
    fn since_parses_humantime() {
        assert_eq!(parse_since(Some("90m".into())).unwrap(), Some(90.0));
        assert_eq!(parse_since(None).unwrap(), None);
        assert!(parse_since(Some("later".into())).is_err());
    }

    #[test]
    fn cli_parses_span_flags() {
        let cli = Cli::try_parse_from([
            "telq",
            "--json",
            "spans",
            "--service",
            "api",
            "--status-code",
            "500",
            "--errors",
        ])
        .unwrap();
        assert!(cli.json);
        assert!(matches!(
            cli.command,
            Commands::Spans { status_code: Some(500), errors: true, .. }
        ));
    }
}
