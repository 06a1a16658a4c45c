//! Repository traits for data access abstraction.
//!
//! These traits define the contract for data access, allowing different
//! storage backends to be swapped without changing business logic.
//! Futures are required to be `Send` so handlers generic over [`Database`]
//! can be used as axum handlers.

use std::future::Future;

use crate::db::{
    DbResult,
    models::{
        ApiKey, Dependency, DependencyInput, DependencyQuery, Hoster, HosterInput, Id,
        LinkedService, ListResult, NewApiKey, NewServiceImage, Server, ServerInput, ServerQuery,
        Service, ServiceImage, ServiceInput, ServiceQuery, User, UserProfile,
    },
};

/// Repository for Server operations.
pub trait ServerRepository: Send + Sync {
    /// Create a new server and return it with generated id and timestamps.
    fn create(&self, input: &ServerInput) -> impl Future<Output = DbResult<Server>> + Send;

    /// Get a server by ID.
    fn get(&self, id: Id) -> impl Future<Output = DbResult<Server>> + Send;

    /// List servers with optional filtering, sorting, and pagination.
    fn list(
        &self,
        query: Option<&ServerQuery>,
    ) -> impl Future<Output = DbResult<ListResult<Server>>> + Send;

    /// Replace the writable fields of a server.
    fn update(&self, id: Id, input: &ServerInput) -> impl Future<Output = DbResult<Server>> + Send;

    /// Delete a server. Its services and their dependency rows go with it.
    fn delete(&self, id: Id) -> impl Future<Output = DbResult<()>> + Send;

    /// Total number of servers.
    fn count(&self) -> impl Future<Output = DbResult<usize>> + Send;
}

/// Repository for Service operations.
pub trait ServiceRepository: Send + Sync {
    fn create(&self, input: &ServiceInput) -> impl Future<Output = DbResult<Service>> + Send;

    fn get(&self, id: Id) -> impl Future<Output = DbResult<Service>> + Send;

    fn list(
        &self,
        query: Option<&ServiceQuery>,
    ) -> impl Future<Output = DbResult<ListResult<Service>>> + Send;

    fn update(
        &self,
        id: Id,
        input: &ServiceInput,
    ) -> impl Future<Output = DbResult<Service>> + Send;

    fn delete(&self, id: Id) -> impl Future<Output = DbResult<()>> + Send;

    /// Stamp `last_maintenance_at` with the current time.
    fn mark_maintained(&self, id: Id) -> impl Future<Output = DbResult<Service>> + Send;

    /// Services ordered by most recent maintenance, never-maintained last.
    fn recently_maintained(
        &self,
        limit: usize,
    ) -> impl Future<Output = DbResult<Vec<Service>>> + Send;

    fn count(&self) -> impl Future<Output = DbResult<usize>> + Send;
}

/// Repository for service-to-service dependency rows.
pub trait DependencyRepository: Send + Sync {
    fn create(&self, input: &DependencyInput)
    -> impl Future<Output = DbResult<Dependency>> + Send;

    fn get(&self, id: Id) -> impl Future<Output = DbResult<Dependency>> + Send;

    fn list(
        &self,
        query: Option<&DependencyQuery>,
    ) -> impl Future<Output = DbResult<ListResult<Dependency>>> + Send;

    /// Update label and type of an existing row. Endpoints are immutable.
    fn update(
        &self,
        id: Id,
        input: &DependencyInput,
    ) -> impl Future<Output = DbResult<Dependency>> + Send;

    fn delete(&self, id: Id) -> impl Future<Output = DbResult<()>> + Send;

    /// Services that `service_id` depends on.
    fn dependencies_of(
        &self,
        service_id: Id,
    ) -> impl Future<Output = DbResult<Vec<LinkedService>>> + Send;

    /// Services that depend on `service_id`.
    fn dependents_of(
        &self,
        service_id: Id,
    ) -> impl Future<Output = DbResult<Vec<LinkedService>>> + Send;
}

/// Repository for Hoster operations.
pub trait HosterRepository: Send + Sync {
    fn create(&self, input: &HosterInput) -> impl Future<Output = DbResult<Hoster>> + Send;

    fn get(&self, id: Id) -> impl Future<Output = DbResult<Hoster>> + Send;

    /// All hosters ordered by `display_order`, then name.
    fn list(&self, active_only: bool) -> impl Future<Output = DbResult<Vec<Hoster>>> + Send;

    fn update(&self, id: Id, input: &HosterInput)
    -> impl Future<Output = DbResult<Hoster>> + Send;

    fn delete(&self, id: Id) -> impl Future<Output = DbResult<()>> + Send;

    /// Rewrite `display_order` so that `ids[i]` gets order `i`.
    fn reorder(&self, ids: &[Id]) -> impl Future<Output = DbResult<()>> + Send;
}

/// Repository for OAuth-identified users.
pub trait UserRepository: Send + Sync {
    /// Insert or refresh the user keyed by the provider-supplied id.
    fn upsert(&self, profile: &UserProfile) -> impl Future<Output = DbResult<User>> + Send;

    fn get(&self, id: Id) -> impl Future<Output = DbResult<User>> + Send;
}

/// Repository for hashed API keys.
pub trait ApiKeyRepository: Send + Sync {
    fn create(&self, key: &NewApiKey) -> impl Future<Output = DbResult<ApiKey>> + Send;

    fn get_by_prefix(&self, prefix: &str)
    -> impl Future<Output = DbResult<Option<ApiKey>>> + Send;

    /// Keys owned by `user_id`, or every key when `None`.
    fn list(&self, user_id: Option<Id>) -> impl Future<Output = DbResult<Vec<ApiKey>>> + Send;

    /// Record a successful authentication.
    fn touch(&self, id: Id) -> impl Future<Output = DbResult<()>> + Send;

    fn delete(&self, id: Id) -> impl Future<Output = DbResult<()>> + Send;
}

/// Repository for uploaded service icon metadata.
pub trait ServiceImageRepository: Send + Sync {
    fn create(
        &self,
        image: &NewServiceImage,
    ) -> impl Future<Output = DbResult<ServiceImage>> + Send;

    fn get_by_filename(
        &self,
        filename: &str,
    ) -> impl Future<Output = DbResult<Option<ServiceImage>>> + Send;

    fn list(&self) -> impl Future<Output = DbResult<Vec<ServiceImage>>> + Send;
}

/// Combined database interface.
pub trait Database: Send + Sync {
    type Servers<'a>: ServerRepository
    where
        Self: 'a;
    type Services<'a>: ServiceRepository
    where
        Self: 'a;
    type Dependencies<'a>: DependencyRepository
    where
        Self: 'a;
    type Hosters<'a>: HosterRepository
    where
        Self: 'a;
    type Users<'a>: UserRepository
    where
        Self: 'a;
    type ApiKeys<'a>: ApiKeyRepository
    where
        Self: 'a;
    type ServiceImages<'a>: ServiceImageRepository
    where
        Self: 'a;

    /// Run pending migrations.
    fn migrate(&self) -> impl Future<Output = DbResult<()>> + Send;

    /// Cheap liveness probe.
    fn ping(&self) -> impl Future<Output = DbResult<()>> + Send;

    fn servers(&self) -> Self::Servers<'_>;

    fn services(&self) -> Self::Services<'_>;

    fn dependencies(&self) -> Self::Dependencies<'_>;

    fn hosters(&self) -> Self::Hosters<'_>;

    fn users(&self) -> Self::Users<'_>;

    fn api_keys(&self) -> Self::ApiKeys<'_>;

    fn service_images(&self) -> Self::ServiceImages<'_>;
}
