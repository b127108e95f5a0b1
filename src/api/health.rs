//! Operational endpoints: health, good-to-go, ping and build info.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::json;

use crate::context::Context;
use crate::graph::GraphClient;

const SYSTEM_CODE: &str = "brands-rw-neo4j";
const SERVICE_NAME: &str = "ft-brands_rw_neo4j ServiceModule";
const SERVICE_DESCRIPTION: &str =
    "Writes 'brands' to Neo4j, usually as part of a bulk upload done on a schedule";
const PANIC_GUIDE: &str =
    "https://sites.google.com/a/ft.com/ft-technology-service-transition/home/run-book-library/brand-rw-neo4j";

/// Result of one health check.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResult {
    pub id: &'static str,
    pub name: &'static str,
    pub ok: bool,
    pub severity: u8,
    pub business_impact: &'static str,
    pub technical_summary: String,
    pub panic_guide: &'static str,
    pub check_output: String,
    pub last_updated: String,
}

/// Health report in the FT health check format.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub schema_version: u8,
    pub system_code: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub checks: Vec<CheckResult>,
    pub ok: bool,
}

async fn neo4j_check<C: GraphClient>(ctx: &Context<C>) -> CheckResult {
    let result = ctx.brands.check().await;
    if let Err(e) = &result {
        tracing::warn!(error = %e, "Neo4j connectivity check failed");
    }

    CheckResult {
        id: "check-connectivity-to-neo4j",
        name: "Check connectivity to Neo4j - neoUrl is a parameter in hieradata for this service",
        ok: result.is_ok(),
        severity: 1,
        business_impact: "Cannot read/write brands via this writer",
        technical_summary: format!(
            "Cannot connect to Neo4j instance {} with at least one brand loaded in it",
            ctx.config.neo4j.url
        ),
        panic_guide: PANIC_GUIDE,
        check_output: match result {
            Ok(()) => "OK".to_string(),
            Err(e) => e.to_string(),
        },
        last_updated: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    }
}

async fn run_checks<C: GraphClient>(ctx: &Context<C>) -> HealthReport {
    let checks = vec![neo4j_check(ctx).await];
    HealthReport {
        schema_version: 1,
        system_code: SYSTEM_CODE,
        name: SERVICE_NAME,
        description: SERVICE_DESCRIPTION,
        ok: checks.iter().all(|c| c.ok),
        checks,
    }
}

pub async fn health<C: GraphClient + 'static>(
    State(ctx): State<Context<C>>,
) -> Json<HealthReport> {
    Json(run_checks(&ctx).await)
}

pub async fn good_to_go<C: GraphClient + 'static>(State(ctx): State<Context<C>>) -> Response {
    let report = run_checks(&ctx).await;
    if report.ok {
        (StatusCode::OK, "OK").into_response()
    } else {
        let failing: Vec<&str> = report
            .checks
            .iter()
            .filter(|c| !c.ok)
            .map(|c| c.check_output.as_str())
            .collect();
        (StatusCode::SERVICE_UNAVAILABLE, failing.join("; ")).into_response()
    }
}

pub async fn ping() -> &'static str {
    "pong"
}

pub async fn build_info<C: GraphClient + 'static>(
    State(ctx): State<Context<C>>,
) -> Json<serde_json::Value> {
    Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "description": env!("CARGO_PKG_DESCRIPTION"),
        "env": ctx.config.server.env,
        "schemaRevision": u32::from(ctx.brands.schema().revision()),
    }))
}
