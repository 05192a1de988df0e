use actix_web::{HttpResponse, Responder};
use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounter, TextEncoder};

/// Handler that serialises Prometheus metrics in text format.
pub async fn metrics_handler() -> impl Responder {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(_) => HttpResponse::Ok()
            .content_type(encoder.format_type())
            .body(buffer),
        Err(err) => HttpResponse::InternalServerError().body(err.to_string()),
    }
}

/// Force lazy counter registration at startup so the first scrape sees
/// every series at zero.
pub fn init_metrics() {
    let _ = &*REGISTRATIONS_TOTAL;
    let _ = &*VERIFICATIONS_TOTAL;
    let _ = &*LOGINS_TOTAL;
    let _ = &*TOKEN_REFRESHES_TOTAL;
}

static REGISTRATIONS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "auth_registrations_total",
        "Total number of accounts registered",
    )
    .and_then(|c| {
        prometheus::default_registry().register(Box::new(c.clone()))?;
        Ok(c)
    })
    .unwrap_or_else(|e| {
        tracing::error!("failed to create registrations counter: {}", e);
        IntCounter::new("dummy_registrations", "dummy").expect("dummy counter")
    })
});

static VERIFICATIONS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "auth_email_verifications_total",
        "Total number of email addresses verified",
    )
    .and_then(|c| {
        prometheus::default_registry().register(Box::new(c.clone()))?;
        Ok(c)
    })
    .unwrap_or_else(|e| {
        tracing::error!("failed to create verifications counter: {}", e);
        IntCounter::new("dummy_verifications", "dummy").expect("dummy counter")
    })
});

static LOGINS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("auth_logins_total", "Total number of successful logins")
        .and_then(|c| {
            prometheus::default_registry().register(Box::new(c.clone()))?;
            Ok(c)
        })
        .unwrap_or_else(|e| {
            tracing::error!("failed to create logins counter: {}", e);
            IntCounter::new("dummy_logins", "dummy").expect("dummy counter")
        })
});

static TOKEN_REFRESHES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "auth_token_refreshes_total",
        "Total number of refresh token rotations",
    )
    .and_then(|c| {
        prometheus::default_registry().register(Box::new(c.clone()))?;
        Ok(c)
    })
    .unwrap_or_else(|e| {
        tracing::error!("failed to create token refreshes counter: {}", e);
        IntCounter::new("dummy_refreshes", "dummy").expect("dummy counter")
    })
});

/// Increment the registrations counter
#[inline]
pub fn inc_registrations() {
    REGISTRATIONS_TOTAL.inc();
}

/// Increment the email verifications counter
#[inline]
pub fn inc_verifications() {
    VERIFICATIONS_TOTAL.inc();
}

/// Increment the successful logins counter
#[inline]
pub fn inc_logins() {
    LOGINS_TOTAL.inc();
}

/// Increment the token rotations counter
#[inline]
pub fn inc_token_refreshes() {
    TOKEN_REFRESHES_TOTAL.inc();
}
