// Product listings, review and attached documents.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use metavertex_core::model::document::Document;
use metavertex_core::model::product::{NewProduct, Product, ProductFilter, ProductReview};
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiPath, ApiQuery, AuthUser};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    pub name: Option<String>,
}

pub fn routes(max_upload_bytes: usize) -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/products", get(list_products).post(submit_product))
        .route("/api/products/my-products", get(my_products))
        .route("/api/products/categories", get(categories))
        .route("/api/products/{id}", get(get_product))
        .route("/api/products/{id}/review", post(review_product))
        .route(
            "/api/products/{id}/documents",
            get(list_documents)
                .post(upload_document)
                .layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route(
            "/api/documents/{id}",
            get(download_document).delete(delete_document),
        )
}

async fn list_products(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiQuery(filter): ApiQuery<ProductFilter>,
) -> ApiResult<Json<Vec<Product>>> {
    Ok(Json(state.market.list_products(&auth.actor, &filter)?))
}

async fn submit_product(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiJson(input): ApiJson<NewProduct>,
) -> ApiResult<(StatusCode, Json<Product>)> {
    let product = state.market.submit_product(&auth.actor, input)?;
    Ok((StatusCode::CREATED, Json(product)))
}

async fn my_products(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> ApiResult<Json<Vec<Product>>> {
    Ok(Json(state.market.my_products(&auth.actor)?))
}

async fn categories(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> ApiResult<Json<Vec<String>>> {
    Ok(Json(state.market.categories(&auth.actor)?))
}

async fn get_product(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<Product>> {
    Ok(Json(state.market.get_product(&auth.actor, &id)?))
}

async fn review_product(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(review): ApiJson<ProductReview>,
) -> ApiResult<Json<Product>> {
    Ok(Json(state.market.review_product(&auth.actor, &id, review)?))
}

async fn list_documents(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<Vec<Document>>> {
    Ok(Json(state.market.list_documents(&auth.actor, &id)?))
}

/// The request body is the file; its name comes from `?name=`.
async fn upload_document(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiPath(id): ApiPath<String>,
    ApiQuery(query): ApiQuery<UploadQuery>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Document>)> {
    let name = query
        .name
        .ok_or_else(|| ApiError::BadRequest("Query parameter `name` is required".into()))?;
    let doc = state
        .market
        .upload_document(&auth.actor, &id, &name, &body)
        .await?;
    Ok((StatusCode::CREATED, Json(doc)))
}

async fn download_document(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<impl IntoResponse> {
    let (doc, bytes) = state.market.read_document(&auth.actor, &id).await?;
    Ok((
        [
            (header::CONTENT_TYPE, doc.content_type),
            (header::CONTENT_DISPOSITION, attachment_disposition(&doc.name)),
        ],
        bytes,
    ))
}

/// Header-safe `attachment` value. Anything outside printable ASCII, plus
/// quotes and backslashes, becomes `_`.
pub fn attachment_disposition(name: &str) -> String {
    let safe: String = name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c == ' ' || c.is_ascii_graphic() => c,
            _ => '_',
        })
        .collect();
    format!("attachment; filename=\"{safe}\"")
}

async fn delete_document(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<StatusCode> {
    state.market.delete_document(&auth.actor, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
