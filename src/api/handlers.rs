use axum::{
    Form, Json,
    extract::{State, rejection::FormRejection},
    http::StatusCode,
};
use nanoid::nanoid;
use std::sync::Arc;
use std::time::Instant;
use tracing::{Instrument, info, info_span};

use crate::data_models::Query;
use crate::retriever::Retriever;

use super::models::{SearchRequest, SearchResponse};

type ApiError = (StatusCode, Json<SearchResponse>);

fn bad_request(message: impl Into<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(SearchResponse::failed(message)),
    )
}

pub async fn search_handler(
    State(retriever): State<Arc<Retriever>>,
    form: Result<Form<SearchRequest>, FormRejection>,
) -> Result<Json<SearchResponse>, ApiError> {
    let span = info_span!("query", id = %nanoid!(8));

    async move {
        let start = Instant::now();

        let Form(request) = form.map_err(|rejection| bad_request(rejection.body_text()))?;

        if request.q.trim().is_empty() {
            return Err(bad_request("Query cannot be empty"));
        }
        let count: i64 = request
            .n
            .trim()
            .parse()
            .map_err(|_| bad_request(format!("`n` must be an integer, got `{}`", request.n)))?;

        let query = Query::new(request.q, count);
        info!(q = %query.text, n = query.count, "received query");

        let records = retriever.retrieve(&query).await.map_err(|e| {
            (
                StatusCode::BAD_GATEWAY,
                Json(SearchResponse::failed(e.to_string())),
            )
        })?;

        info!(
            returned = records.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "query done"
        );
        Ok(Json(SearchResponse::ok(records)))
    }
    .instrument(span)
    .await
}

pub async fn health_handler() -> &'static str {
    "ok"
}
