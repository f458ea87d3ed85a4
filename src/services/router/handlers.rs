use std::collections::BTreeMap;

use http::StatusCode;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use super::response::{HttpResponse, error_status, json_response, text_response};
use crate::services::registry::{Discovery, InstanceRecord};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseMessage {
    pub response: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchResponse {
    pub address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchAllResponse {
    pub instances: BTreeMap<String, Vec<InstanceView>>,
}

// 对外展示的实例信息，时间以毫秒表示
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceView {
    pub name: String,
    pub address: String,
    pub idle_ms: u64,
    pub expires_in_ms: u64,
}

impl InstanceView {
    fn from_record(record: &InstanceRecord, lease: std::time::Duration, now: Instant) -> Self {
        Self {
            name: record.name.clone(),
            address: record.address.clone(),
            idle_ms: now.saturating_duration_since(record.last_renewal).as_millis() as u64,
            expires_in_ms: record
                .expires_at(lease)
                .map_or(u64::MAX, |expires_at| {
                    expires_at.saturating_duration_since(now).as_millis() as u64
                }),
        }
    }
}

fn message(text: String) -> HttpResponse {
    json_response(StatusCode::OK, &ResponseMessage { response: text })
}

pub fn register(discovery: &dyn Discovery, body: &[u8]) -> HttpResponse {
    let request: RegisterRequest = match serde_json::from_slice(body) {
        Ok(request) => request,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to parse register request body");
            return text_response(StatusCode::BAD_REQUEST, format!("Failed to parse body: {e}"));
        }
    };

    match discovery.register(&request.name, &request.address) {
        Ok(()) => message(format!(
            "Service {} ({}) registered",
            request.name, request.address
        )),
        Err(e) => {
            let status = if e.is_validation() {
                StatusCode::BAD_REQUEST
            } else {
                StatusCode::NOT_FOUND
            };
            text_response(status, format!("Error registering service: {e}"))
        }
    }
}

pub fn fetch(discovery: &dyn Discovery, name: &str) -> HttpResponse {
    match discovery.fetch(name) {
        Ok(instance) => json_response(
            StatusCode::OK,
            &FetchResponse {
                address: instance.address,
            },
        ),
        Err(e) => {
            tracing::debug!(service_name = %name, error = %e, "Fetch failed");
            text_response(
                error_status(&e),
                format!("Error fetching service {name}: {e}"),
            )
        }
    }
}

pub fn fetch_all(discovery: &dyn Discovery) -> HttpResponse {
    let lease = discovery.lease_duration();
    let now = Instant::now();
    let instances = discovery
        .fetch_all()
        .into_iter()
        .map(|(name, records)| {
            let views = records
                .iter()
                .map(|record| InstanceView::from_record(record, lease, now))
                .collect();
            (name, views)
        })
        .collect();

    json_response(StatusCode::OK, &FetchAllResponse { instances })
}

pub fn unregister(discovery: &dyn Discovery, name: &str, address: &str) -> HttpResponse {
    match discovery.unregister(name, address) {
        Ok(()) => message(format!("Service {name} ({address}) unregistered")),
        Err(e) => text_response(
            error_status(&e),
            format!("Error unregistering service: {e}"),
        ),
    }
}

pub fn renew(discovery: &dyn Discovery, name: &str, address: &str) -> HttpResponse {
    match discovery.renew(name, address) {
        Ok(()) => message(format!("Service {name} ({address}) renewed")),
        Err(e) => text_response(error_status(&e), format!("Error renewing service: {e}")),
    }
}
