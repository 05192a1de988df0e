/// Liveness and readiness probes
use actix_web::{web, HttpResponse, Responder};
use redis::AsyncCommands;
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

#[derive(Serialize)]
struct ComponentCheck {
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    latency_ms: Option<u64>,
}

#[derive(Serialize)]
struct ReadinessResponse {
    ready: bool,
    postgres: ComponentCheck,
    redis: ComponentCheck,
}

/// GET /health
pub async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /health/ready
///
/// 200 when PostgreSQL and Redis both answer, 503 otherwise.
pub async fn readiness_check(state: web::Data<AppState>) -> impl Responder {
    let start = std::time::Instant::now();
    let postgres_ok = sqlx::query("SELECT 1").fetch_one(&state.db).await.is_ok();
    let postgres = ComponentCheck {
        status: component_status(postgres_ok),
        latency_ms: Some(start.elapsed().as_millis() as u64),
    };

    let start = std::time::Instant::now();
    let mut conn = state.redis.clone();
    let redis_ok = conn.set_ex::<_, _, ()>("devsearch:health:ping", 1u8, 5).await.is_ok();
    let redis = ComponentCheck {
        status: component_status(redis_ok),
        latency_ms: Some(start.elapsed().as_millis() as u64),
    };

    let ready = postgres_ok && redis_ok;
    let body = ReadinessResponse {
        ready,
        postgres,
        redis,
    };

    if ready {
        HttpResponse::Ok().json(body)
    } else {
        HttpResponse::ServiceUnavailable().json(body)
    }
}

fn component_status(ok: bool) -> String {
    if ok { "healthy" } else { "unhealthy" }.to_string()
}
