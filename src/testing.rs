//! Canned vRA payloads shared by the HTTP-level tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use mockito::{Mock, ServerGuard};
use serde_json::json;

use crate::config::Config;
use crate::config::Credentials;
use crate::vra::BearerToken;

pub const VM_ID: &str = "2a415ba9-81f5-4bff-b35f-bccfd5587165";
pub const ACTION_ID: &str = "fcf490d5-a7e9-4640-be83-ac74d4484c91";

pub fn credentials(base_url: &str) -> Credentials {
    Config {
        base_url: Some(base_url.to_string()),
        tenant: Some("acme".to_string()),
        domain: Some("corp.local".to_string()),
        user_name: Some("svc-snap".to_string()),
        password: Some("hunter2".to_string()),
    }
    .into_credentials()
    .unwrap()
}

pub fn token() -> BearerToken {
    BearerToken::new("abc123".to_string(), None)
}

pub fn token_body(id: &str) -> String {
    json!({
        "expires": "2026-10-17T20:00:00.000Z",
        "id": id,
        "tenant": "acme"
    })
    .to_string()
}

fn vm_resource(name: &str, id: &str) -> serde_json::Value {
    json!({
        "@type": "CatalogResource",
        "id": id,
        "iconId": "Infrastructure.CatalogItem.Machine.Virtual.vSphere",
        "resourceTypeRef": {"id": "Infrastructure.Virtual", "label": "Virtual Machine"},
        "name": name,
        "description": null,
        "status": "ACTIVE"
    })
}

/// A page holding the given machines plus one deployment that shares the first name.
pub fn resources_body(machines: &[(&str, &str)]) -> String {
    let mut content: Vec<serde_json::Value> = machines
        .iter()
        .map(|(name, id)| vm_resource(name, id))
        .collect();

    if let Some((name, _)) = machines.first() {
        content.push(json!({
            "@type": "CatalogResource",
            "id": "9b0e0a9a-5d0e-4a4c-a0d5-54f5bd3e0c11",
            "iconId": "composition.blueprint.png",
            "resourceTypeRef": {"id": "composition.resource.type.deployment", "label": "Deployment"},
            "name": name,
            "description": null
        }));
    }

    json!({
        "links": [],
        "content": content,
        "metadata": {"size": 5000, "totalElements": content.len(), "totalPages": 1, "number": 1}
    })
    .to_string()
}

pub fn actions_body(with_snapshot: bool) -> String {
    let mut content = vec![json!({
        "@type": "ConsumerResourceOperation",
        "name": "Power Off",
        "type": "ACTION",
        "id": "0c5c3a8e-1b47-4a38-9b8e-7b8f4b1ef001"
    })];

    if with_snapshot {
        content.push(json!({
            "@type": "ConsumerResourceOperation",
            "name": "Create VM Snapshot",
            "description": "Create a snapshot of the virtual machine.",
            "type": "ACTION",
            "id": ACTION_ID,
            "hasForm": true
        }));
    }

    json!({"links": [], "content": content}).to_string()
}

pub fn state_body(state: &str) -> String {
    json!({
        "@type": "CatalogResourceRequest",
        "id": "7aaf9baf-aa4e-47c4-997b-edd7c7983a5b",
        "stateName": state,
        "phase": "PENDING_POST_APPROVAL"
    })
    .to_string()
}

pub fn actions_path() -> String {
    format!("/catalog-service/api/consumer/resources/{}/actions/", VM_ID)
}

pub fn requests_path() -> String {
    format!(
        "/catalog-service/api/consumer/resources/{}/actions/{}/requests/",
        VM_ID, ACTION_ID
    )
}

/// Serves `states` in order from `path`, one per poll, and expects exactly that many polls.
pub async fn mock_states(server: &mut ServerGuard, path: &str, states: &[&str]) -> Mock {
    let bodies: Vec<String> = states.iter().map(|state| state_body(state)).collect();
    let served = Arc::new(AtomicUsize::new(0));
    let last = bodies.len() - 1;

    server
        .mock("GET", path)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body_from_request(move |_| {
            let index = served.fetch_add(1, Ordering::SeqCst).min(last);
            bodies[index].clone().into_bytes()
        })
        .expect(states.len())
        .create_async()
        .await
}
