//! Domain models for the inventory database.
//!
//! These models are storage-agnostic and represent the core entities
//! used throughout the application.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_valid::Validate;
use utoipa::ToSchema;

// =============================================================================
// Query Types for Pagination and Sorting
// =============================================================================

/// Sort order for list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl std::str::FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            _ => Err(format!("Invalid sort order: {}", s)),
        }
    }
}

/// Base pagination and sorting options - composed into entity-specific queries.
#[derive(Debug, Clone, Default)]
pub struct PageSort {
    /// Maximum number of items to return.
    pub limit: Option<usize>,
    /// Number of items to skip.
    pub offset: Option<usize>,
    /// Field to sort by (validated per entity type).
    pub sort_by: Option<String>,
    /// Sort order (ascending or descending).
    pub sort_order: Option<SortOrder>,
}

/// Query for Servers - pagination + text search + hoster filter.
#[derive(Debug, Clone, Default)]
pub struct ServerQuery {
    pub page: PageSort,
    /// Case-insensitive substring match on name, ip and location.
    pub q: Option<String>,
    /// Exact hoster name.
    pub hoster: Option<String>,
    /// Only direct children of this server.
    pub parent_id: Option<Id>,
}

/// Query for Services - pagination + server filter + text search.
#[derive(Debug, Clone, Default)]
pub struct ServiceQuery {
    pub page: PageSort,
    pub server_id: Option<Id>,
    /// Case-insensitive substring match on name, path and note.
    pub q: Option<String>,
}

/// Query for Dependencies - pagination + service filter (either end).
#[derive(Debug, Clone, Default)]
pub struct DependencyQuery {
    pub page: PageSort,
    pub service_id: Option<Id>,
}

/// Result of a paginated list query.
#[derive(Debug, Clone)]
pub struct ListResult<T> {
    /// The items in this page.
    pub items: Vec<T>,
    /// Total count of all matching items (before pagination).
    pub total: usize,
    /// Limit that was applied.
    pub limit: Option<usize>,
    /// Offset that was applied.
    pub offset: usize,
}

/// Integer row id used for all entities.
pub type Id = i64;

// =============================================================================
// Servers
// =============================================================================

/// A physical or virtual host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Server {
    pub id: Id,
    pub name: String,
    pub ip: Option<String>,
    pub hoster: Option<String>,
    pub location: Option<String>,
    pub parent_id: Option<Id>,
    pub color: Option<String>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Writable fields of a server, used for both create and update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct ServerInput {
    #[validate(min_length = 1)]
    #[validate(max_length = 255)]
    pub name: String,
    #[validate(
        pattern = r"^((25[0-5]|2[0-4]\d|1\d\d|[1-9]?\d)\.){3}(25[0-5]|2[0-4]\d|1\d\d|[1-9]?\d)$"
    )]
    pub ip: Option<String>,
    #[validate(max_length = 255)]
    pub hoster: Option<String>,
    #[validate(max_length = 255)]
    pub location: Option<String>,
    pub parent_id: Option<Id>,
    #[validate(pattern = r"^#[0-9a-fA-F]{6}$")]
    pub color: Option<String>,
    pub note: Option<String>,
}

impl From<&Server> for ServerInput {
    fn from(s: &Server) -> Self {
        Self {
            name: s.name.clone(),
            ip: s.ip.clone(),
            hoster: s.hoster.clone(),
            location: s.location.clone(),
            parent_id: s.parent_id,
            color: s.color.clone(),
            note: s.note.clone(),
        }
    }
}

// =============================================================================
// Services
// =============================================================================

/// A single exposed port of a service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate, ToSchema)]
pub struct ServicePort {
    /// Port number
    #[validate(minimum = 1)]
    #[schema(example = 443)]
    pub port: u16,
    /// Human readable label
    #[validate(max_length = 64)]
    #[schema(example = "https")]
    #[serde(default)]
    pub label: String,
}

/// An application or process hosted on a server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub id: Id,
    pub server_id: Id,
    pub name: String,
    pub icon: Option<String>,
    pub path: Option<String>,
    pub repo_url: Option<String>,
    pub doc_path: Option<String>,
    pub ports: Vec<ServicePort>,
    pub last_maintenance_at: Option<DateTime<Utc>>,
    pub color: Option<String>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Writable fields of a service, used for both create and update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct ServiceInput {
    pub server_id: Id,
    #[validate(min_length = 1)]
    #[validate(max_length = 255)]
    pub name: String,
    #[validate(max_length = 255)]
    pub icon: Option<String>,
    #[validate(max_length = 1024)]
    pub path: Option<String>,
    #[validate(pattern = r"^https?://\S+$")]
    pub repo_url: Option<String>,
    #[validate(max_length = 1024)]
    pub doc_path: Option<String>,
    #[validate]
    #[serde(default)]
    pub ports: Vec<ServicePort>,
    pub last_maintenance_at: Option<DateTime<Utc>>,
    #[validate(pattern = r"^#[0-9a-fA-F]{6}$")]
    pub color: Option<String>,
    pub note: Option<String>,
}

impl From<&Service> for ServiceInput {
    fn from(s: &Service) -> Self {
        Self {
            server_id: s.server_id,
            name: s.name.clone(),
            icon: s.icon.clone(),
            path: s.path.clone(),
            repo_url: s.repo_url.clone(),
            doc_path: s.doc_path.clone(),
            ports: s.ports.clone(),
            last_maintenance_at: s.last_maintenance_at,
            color: s.color.clone(),
            note: s.note.clone(),
        }
    }
}

// =============================================================================
// Dependencies
// =============================================================================

/// Kind of a service-to-service dependency edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DependencyType {
    #[default]
    Required,
    Optional,
    Fallback,
}

impl DependencyType {
    pub const ALL: [DependencyType; 3] = [
        DependencyType::Required,
        DependencyType::Optional,
        DependencyType::Fallback,
    ];
}

impl std::fmt::Display for DependencyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DependencyType::Required => write!(f, "required"),
            DependencyType::Optional => write!(f, "optional"),
            DependencyType::Fallback => write!(f, "fallback"),
        }
    }
}

impl std::str::FromStr for DependencyType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "required" => Ok(DependencyType::Required),
            "optional" => Ok(DependencyType::Optional),
            "fallback" => Ok(DependencyType::Fallback),
            _ => Err(format!("Invalid dependency type: {}", s)),
        }
    }
}

/// Directed edge: `service_id` depends on `depends_on_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub id: Id,
    pub service_id: Id,
    pub depends_on_id: Id,
    pub label: Option<String>,
    pub dependency_type: DependencyType,
    pub created_at: DateTime<Utc>,
}

/// Writable fields of a dependency row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct DependencyInput {
    pub service_id: Id,
    pub depends_on_id: Id,
    #[validate(max_length = 255)]
    pub label: Option<String>,
    #[serde(default)]
    pub dependency_type: DependencyType,
}

/// The service at the other end of a dependency row, as seen from one service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedService {
    pub dependency_id: Id,
    pub service_id: Id,
    pub name: String,
    pub server_id: Id,
    pub label: Option<String>,
    pub dependency_type: DependencyType,
}

// =============================================================================
// Hosters
// =============================================================================

/// A hosting provider used to categorise servers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hoster {
    pub id: Id,
    pub name: String,
    pub hoster_type: Option<String>,
    pub description: Option<String>,
    pub display_order: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct HosterInput {
    #[validate(min_length = 1)]
    #[validate(max_length = 255)]
    pub name: String,
    #[validate(max_length = 64)]
    pub hoster_type: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub display_order: i64,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

// =============================================================================
// Users, API keys, images
// =============================================================================

/// An account identified by the OAuth provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Id,
    pub oauth_id: String,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Profile fields received from the OAuth provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserProfile {
    pub oauth_id: String,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
}

/// A stored API key. Only the hash of the secret is kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKey {
    pub id: Id,
    pub user_id: Option<Id>,
    pub name: String,
    pub key_prefix: String,
    #[serde(skip_serializing)]
    pub key_hash: String,
    pub permissions: Vec<String>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl ApiKey {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| exp <= now)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewApiKey {
    pub user_id: Option<Id>,
    pub name: String,
    pub key_prefix: String,
    pub key_hash: String,
    pub permissions: Vec<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Metadata of an uploaded service icon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceImage {
    pub id: Id,
    pub filename: String,
    pub original_name: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewServiceImage {
    pub filename: String,
    pub original_name: String,
    pub mime_type: String,
    pub size_bytes: i64,
}
