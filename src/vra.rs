use serde::{Deserialize, Serialize};

pub const VIRTUAL_MACHINE_TYPE_ID: &str = "Infrastructure.Virtual";
pub const CATALOG_RESOURCE_TYPE: &str = "CatalogResource";
pub const CREATE_SNAPSHOT_ACTION: &str = "Create VM Snapshot";
pub const ACTION_KIND: &str = "ACTION";
pub const RESOURCE_ID_LEN: usize = 36;

/// Characters in front of every machine name that belong to the tenant, not the VM.
pub const TENANT_PREFIX_LEN: usize = 3;

const CATALOG_RESOURCE_REQUEST_TYPE: &str =
    "com.vmware.vcac.catalog.domain.request.CatalogResourceRequest";

#[derive(Debug, Serialize)]
pub struct TokenRequest<'a> {
    pub(crate) username: String,
    pub(crate) password: &'a str,
    pub(crate) tenant: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub(crate) id: String,
    pub(crate) expires: Option<String>,
}

/// Bearer credential issued by the identity service. Lives for one run only.
#[derive(Clone)]
pub struct BearerToken {
    id: String,
    expires: Option<String>,
}

impl BearerToken {
    pub fn new(id: String, expires: Option<String>) -> Self {
        BearerToken { id, expires }
    }

    pub fn authorization(&self) -> String {
        format!("Bearer {}", self.id)
    }

    pub fn expires(&self) -> Option<&str> {
        self.expires.as_deref()
    }
}

impl std::fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BearerToken")
            .field("id", &"<redacted>")
            .field("expires", &self.expires)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceId(pub(crate) String);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionId(pub(crate) String);

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Display for ActionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// Generic page wrapper used by the catalog-service listings
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Page<T> {
    #[serde(default)]
    pub(crate) content: Vec<T>,
}

#[derive(Debug, Deserialize)]
pub struct TypeRef {
    pub(crate) id: String,
}

#[derive(Debug, Deserialize)]
pub struct CatalogResource {
    #[serde(rename = "@type")]
    pub(crate) kind: Option<String>,
    #[serde(default)]
    pub(crate) id: String,
    #[serde(rename = "resourceTypeRef")]
    pub(crate) resource_type_ref: Option<TypeRef>,
    #[serde(default)]
    pub(crate) name: String,
}

impl CatalogResource {
    pub fn is_virtual_machine(&self) -> bool {
        self.kind.as_deref() == Some(CATALOG_RESOURCE_TYPE)
            && self
                .resource_type_ref
                .as_ref()
                .is_some_and(|type_ref| type_ref.id == VIRTUAL_MACHINE_TYPE_ID)
            && self.id.chars().count() == RESOURCE_ID_LEN
    }
}

#[derive(Debug, Deserialize)]
pub struct ResourceAction {
    #[serde(default)]
    pub(crate) name: String,
    #[serde(rename = "type", default)]
    pub(crate) kind: String,
    #[serde(default)]
    pub(crate) id: String,
}

impl ResourceAction {
    pub fn is_create_snapshot(&self) -> bool {
        self.name == CREATE_SNAPSHOT_ACTION && self.kind == ACTION_KIND
    }
}

#[derive(Debug, Serialize)]
pub struct SnapshotRequest {
    #[serde(rename = "type")]
    pub(crate) kind: &'static str,
    pub(crate) data: SnapshotRequestData,
    pub(crate) description: &'static str,
}

#[derive(Debug, Serialize)]
pub struct SnapshotRequestData {
    #[serde(rename = "provider-existingSnapshotName")]
    pub(crate) existing_snapshot_name: Option<String>,
    #[serde(rename = "provider-deleteExisting")]
    pub(crate) delete_existing: bool,
    #[serde(rename = "provider-description")]
    pub(crate) snapshot_description: &'static str,
    #[serde(rename = "provider-name")]
    pub(crate) snapshot_name: &'static str,
    #[serde(rename = "provider-__ASD_PRESENTATION_INSTANCE")]
    pub(crate) presentation_instance: Option<String>,
    #[serde(rename = "provider-__asd_tenantRef")]
    pub(crate) tenant_ref: String,
}

impl SnapshotRequest {
    pub fn new(tenant: &str, keep_existing: bool) -> Self {
        SnapshotRequest {
            kind: CATALOG_RESOURCE_REQUEST_TYPE,
            data: SnapshotRequestData {
                existing_snapshot_name: None,
                delete_existing: !keep_existing,
                snapshot_description: "Snapshotdescription",
                snapshot_name: "Snapshot name",
                presentation_instance: None,
                tenant_ref: tenant.to_string(),
            },
            description: "makeSnapshot call",
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RequestStatus {
    #[serde(rename = "stateName")]
    pub(crate) state_name: String,
}

#[derive(Debug, Deserialize)]
pub struct ErrorEnvelope {
    #[serde(default)]
    errors: Vec<PlatformError>,
}

#[derive(Debug, Deserialize)]
struct PlatformError {
    message: Option<String>,
    #[serde(rename = "systemMessage")]
    system_message: Option<String>,
}

impl ErrorEnvelope {
    pub fn first_message(&self) -> Option<String> {
        self.errors.iter().find_map(|error| {
            error
                .system_message
                .as_deref()
                .or(error.message.as_deref())
                .map(str::trim)
                .filter(|message| !message.is_empty())
                .map(str::to_string)
        })
    }
}
