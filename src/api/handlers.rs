//! Brand request handlers.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::context::Context;
use crate::error::AppError;
use crate::graph::GraphClient;
use crate::metrics::Operation;
use crate::models::Brand;
use crate::repositories::WriteOutcome;

fn not_found(uuid: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "message": format!("Brand {} not found", uuid) })),
    )
        .into_response()
}

pub async fn read<C: GraphClient + 'static>(
    State(ctx): State<Context<C>>,
    Path(uuid): Path<String>,
) -> Result<Response, AppError> {
    let brand = ctx.metrics.time(Operation::Read, ctx.brands.read(&uuid)).await?;
    Ok(match brand {
        Some(brand) => Json(brand).into_response(),
        None => not_found(&uuid),
    })
}

pub async fn write<C: GraphClient + 'static>(
    State(ctx): State<Context<C>>,
    Path(uuid): Path<String>,
    body: Bytes,
) -> Result<StatusCode, AppError> {
    let brand = Brand::from_json(&body, ctx.brands.schema())?;
    if brand.uuid != uuid {
        return Err(AppError::UuidMismatch {
            path: uuid,
            body: brand.uuid,
        });
    }

    let outcome = ctx
        .metrics
        .time(Operation::Write, ctx.brands.write(&brand))
        .await?;
    tracing::info!(%uuid, ?outcome, "brand written");

    Ok(match outcome {
        WriteOutcome::Created => StatusCode::CREATED,
        WriteOutcome::Updated => StatusCode::OK,
    })
}

pub async fn delete<C: GraphClient + 'static>(
    State(ctx): State<Context<C>>,
    Path(uuid): Path<String>,
) -> Result<Response, AppError> {
    let deleted = ctx
        .metrics
        .time(Operation::Delete, ctx.brands.delete(&uuid))
        .await?;
    if deleted {
        tracing::info!(%uuid, "brand deleted");
        Ok(StatusCode::NO_CONTENT.into_response())
    } else {
        Ok(not_found(&uuid))
    }
}

pub async fn count<C: GraphClient + 'static>(
    State(ctx): State<Context<C>>,
) -> Result<Json<i64>, AppError> {
    let count = ctx
        .metrics
        .time(Operation::Count, ctx.brands.count())
        .await?;
    Ok(Json(count))
}
