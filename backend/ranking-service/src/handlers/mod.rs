/// HTTP handlers for tier ranking
///
/// - Categories: read, replace tiers (re-derives every item)
/// - Items: start a placement, re-place an existing item
/// - Sessions: answer a comparison, abandon a placement
use actix_web::{web, HttpResponse};
use chrono::Utc;

use crate::error::{AppError, Result};
use crate::models::{
    ComparisonRequest, HealthResponse, RankItemRequest, RerankItemRequest, UpdateTiersRequest,
};
use crate::services::RankingService;

/// Name reported by `/health`.
pub struct ServiceName(pub String);

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health)).service(
        web::scope("/api/v1")
            .route("/categories/{category_id}", web::get().to(get_category))
            .route("/categories/{category_id}/tiers", web::put().to(update_tiers))
            .route("/categories/{category_id}/items", web::post().to(rank_item))
            .route(
                "/categories/{category_id}/items/{item_id}/rank",
                web::post().to(rerank_item),
            )
            .route(
                "/sessions/{token}/comparisons",
                web::post().to(submit_comparison),
            )
            .route("/sessions/{token}", web::delete().to(abandon_session)),
    );
}

pub async fn health(name: Option<web::Data<ServiceName>>) -> HttpResponse {
    let service = name
        .map(|n| n.0.clone())
        .unwrap_or_else(|| "tier-ranking-service".to_string());

    HttpResponse::Ok().json(HealthResponse {
        status: "ok".to_string(),
        service,
        timestamp: Utc::now(),
    })
}

pub async fn get_category(
    service: web::Data<RankingService>,
    category_id: web::Path<String>,
) -> Result<HttpResponse> {
    let view = service.get_category(&category_id).await?;
    Ok(HttpResponse::Ok().json(view))
}

/// Replace the tiers of a category and re-rank everything in it
pub async fn update_tiers(
    service: web::Data<RankingService>,
    category_id: web::Path<String>,
    payload: web::Json<UpdateTiersRequest>,
) -> Result<HttpResponse> {
    let response = service
        .update_tiers(&category_id, payload.into_inner().tiers)
        .await?;
    Ok(HttpResponse::Ok().json(response))
}

/// Start placing a new item
pub async fn rank_item(
    service: web::Data<RankingService>,
    category_id: web::Path<String>,
    payload: web::Json<RankItemRequest>,
) -> Result<HttpResponse> {
    let request = payload.into_inner();
    if request.tier_id.trim().is_empty() {
        return Err(AppError::Validation("tier_id is required".to_string()));
    }

    let response = service.rank_new_item(&category_id, request).await?;
    Ok(HttpResponse::Ok().json(response))
}

pub async fn rerank_item(
    service: web::Data<RankingService>,
    path: web::Path<(String, String)>,
    payload: web::Json<RerankItemRequest>,
) -> Result<HttpResponse> {
    let (category_id, item_id) = path.into_inner();
    let response = service
        .rerank_item(&category_id, &item_id, &payload.tier_id)
        .await?;
    Ok(HttpResponse::Ok().json(response))
}

pub async fn submit_comparison(
    service: web::Data<RankingService>,
    token: web::Path<String>,
    payload: web::Json<ComparisonRequest>,
) -> Result<HttpResponse> {
    let response = service
        .submit_comparison(&token, payload.new_item_is_better)
        .await?;
    Ok(HttpResponse::Ok().json(response))
}

pub async fn abandon_session(
    service: web::Data<RankingService>,
    token: web::Path<String>,
) -> Result<HttpResponse> {
    service.abandon_session(&token).await?;
    Ok(HttpResponse::NoContent().finish())
}
