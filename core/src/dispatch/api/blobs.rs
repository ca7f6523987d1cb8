// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! `/blobs` handlers. HTTP front door onto the Blob Store's `put`/`get`
//! interface (§4.5), so a worker on a different host than the
//! dispatcher can fetch bundles and upload result archives without
//! sharing a filesystem.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::dispatch::api::server::AppState;
use crate::dispatch::error::DispatchError;

#[derive(Debug, Serialize)]
pub struct PutBlobResponse {
    #[serde(rename = "ref")]
    pub blob_ref: String,
}

pub async fn put(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<PutBlobResponse>, DispatchError> {
    let blob_ref = state.blob_store.put(&body).await?;
    Ok(Json(PutBlobResponse { blob_ref }))
}

pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(blob_ref): Path<String>,
) -> Result<(StatusCode, Bytes), DispatchError> {
    let bytes = state.blob_store.get(&blob_ref).await?;
    Ok((StatusCode::OK, Bytes::from(bytes)))
}

pub async fn delete(
    State(state): State<Arc<AppState>>,
    Path(blob_ref): Path<String>,
) -> Result<StatusCode, DispatchError> {
    state.blob_store.delete(&blob_ref).await?;
    Ok(StatusCode::NO_CONTENT)
}
