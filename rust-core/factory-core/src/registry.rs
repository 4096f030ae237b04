//! # Metadata Registry
//!
//! In-memory graph of endpoints, method groups, parameter groups and property
//! groups, drained from the metadata store once at startup.
//!
//! ## Locking discipline
//!
//! - Readers take the data `RwLock` briefly and never across an `.await`.
//! - Writers first take the async `writer` mutex and hold it across the whole
//!   check → store write → cache update sequence, so duplicate checks cannot
//!   race. The cache is updated under a single write lock, which is what makes
//!   a new method (and a newly allocated group) appear atomically.
//! - The store is always written first; an id the store rejected is never
//!   cached.

use crate::database::{DatabasePool, DbValue};
use crate::error::{Error, Result};
use crate::model::{
    group_defined, EndpointDef, MethodDef, ParameterDef, PropertyGroup, PropertyRow, Record,
};
use crate::route::normalize_path;
use crate::router::Method;
use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{error, info};

static NO_CONSTRAINTS: PropertyGroup = PropertyGroup::EMPTY;

const INSERT_ENDPOINT: &str =
    "INSERT INTO endpoint (path, uri_params, methods) VALUES ($1, 0, 0) RETURNING id";
const INSERT_METHOD: &str = "INSERT INTO method (group_id, name, query, headers) \
     VALUES ($1, $2, $3, $4) RETURNING id, group_id";
const INSERT_METHOD_NEW_GROUP: &str = "INSERT INTO method (group_id, name, query, headers) \
     VALUES ((SELECT COALESCE(MAX(g), 0) + 1 FROM \
     (SELECT group_id AS g FROM method UNION ALL SELECT methods AS g FROM endpoint) AS refs), \
     $1, $2, $3) \
     RETURNING id, group_id";
const UPDATE_ENDPOINT_METHODS: &str = "UPDATE endpoint SET methods = $1 WHERE id = $2";

/// The four lookup tables, read through [`Registry::read`]
#[derive(Debug, Clone, Default)]
pub struct RegistryData {
    endpoints: BTreeMap<i64, EndpointDef>,
    methods: HashMap<i64, BTreeMap<Method, MethodDef>>,
    parameters: HashMap<i64, BTreeMap<String, ParameterDef>>,
    properties: HashMap<i64, PropertyGroup>,
}

impl RegistryData {
    /// Create empty tables
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an endpoint
    pub fn insert_endpoint(&mut self, endpoint: EndpointDef) {
        self.endpoints.insert(endpoint.id, endpoint);
    }

    /// Add or replace a method in its group
    pub fn insert_method(&mut self, method: MethodDef) {
        self.methods
            .entry(method.group_id)
            .or_default()
            .insert(method.verb, method);
    }

    /// Add or replace a parameter in its group
    pub fn insert_parameter(&mut self, parameter: ParameterDef) {
        self.parameters
            .entry(parameter.group_id)
            .or_default()
            .insert(parameter.name.clone(), parameter);
    }

    /// Add or replace a property in its group
    pub fn insert_property(&mut self, property: &PropertyRow) {
        self.properties
            .entry(property.group_id)
            .or_default()
            .insert(&property.key, &property.value);
    }

    /// All endpoints in id order
    pub fn endpoints(&self) -> impl Iterator<Item = &EndpointDef> {
        self.endpoints.values()
    }

    /// Endpoint by id
    #[must_use]
    pub fn endpoint(&self, id: i64) -> Option<&EndpointDef> {
        self.endpoints.get(&id)
    }

    /// Endpoint by id, or a not-found error naming the id
    pub fn require_endpoint(&self, id: i64) -> Result<&EndpointDef> {
        self.endpoint(id)
            .ok_or_else(|| Error::NotFound(format!("endpoint {id} not found")))
    }

    /// Endpoint by canonical path
    #[must_use]
    pub fn endpoint_by_path(&self, path: &str) -> Option<&EndpointDef> {
        self.endpoints.values().find(|e| e.path == path)
    }

    /// Methods of a group in verb order; empty for an absent group
    pub fn methods(&self, group: i64) -> impl Iterator<Item = &MethodDef> {
        self.methods
            .get(&group)
            .filter(|_| group_defined(group))
            .into_iter()
            .flat_map(BTreeMap::values)
    }

    /// One verb of a methods group
    #[must_use]
    pub fn method(&self, group: i64, verb: Method) -> Option<&MethodDef> {
        if !group_defined(group) {
            return None;
        }
        self.methods.get(&group).and_then(|m| m.get(&verb))
    }

    /// Verbs configured in a methods group, sorted
    #[must_use]
    pub fn verbs(&self, group: i64) -> Vec<Method> {
        self.methods(group).map(|m| m.verb).collect()
    }

    /// Parameters of a group in name order; empty for an absent group
    pub fn parameters(&self, group: i64) -> impl Iterator<Item = &ParameterDef> {
        self.parameters
            .get(&group)
            .filter(|_| group_defined(group))
            .into_iter()
            .flat_map(BTreeMap::values)
    }

    /// Whether a parameter group is defined
    #[must_use]
    pub fn has_parameter_group(&self, group: i64) -> bool {
        group_defined(group) && self.parameters.contains_key(&group)
    }

    /// Constraints of a properties group; empty for an absent group
    #[must_use]
    pub fn properties(&self, group: i64) -> &PropertyGroup {
        if !group_defined(group) {
            return &NO_CONSTRAINTS;
        }
        self.properties.get(&group).unwrap_or(&NO_CONSTRAINTS)
    }

    /// Whether a properties group is defined
    #[must_use]
    pub fn has_property_group(&self, group: i64) -> bool {
        group_defined(group) && self.properties.contains_key(&group)
    }

    /// Defined parameter group ids, sorted
    #[must_use]
    pub fn parameter_groups(&self) -> Vec<i64> {
        let mut groups: Vec<i64> = self
            .parameters
            .keys()
            .copied()
            .filter(|g| group_defined(*g))
            .collect();
        groups.sort_unstable();
        groups
    }

    /// Defined property group ids, sorted
    #[must_use]
    pub fn property_groups(&self) -> Vec<i64> {
        let mut groups: Vec<i64> = self
            .properties
            .keys()
            .copied()
            .filter(|g| group_defined(*g))
            .collect();
        groups.sort_unstable();
        groups
    }
}

/// Shared, explicitly owned metadata registry
#[derive(Debug, Default)]
pub struct Registry {
    data: RwLock<RegistryData>,
    writer: tokio::sync::Mutex<()>,
}

impl Registry {
    /// Wrap already-built tables
    #[must_use]
    pub fn from_data(data: RegistryData) -> Self {
        Self {
            data: RwLock::new(data),
            writer: tokio::sync::Mutex::new(()),
        }
    }

    /// Drain the four relations into a new registry
    ///
    /// # Errors
    ///
    /// Any store or decoding failure is returned; callers treat it as fatal.
    pub async fn load(store: &DatabasePool) -> Result<Self> {
        let mut data = RegistryData::new();

        for endpoint in drain::<EndpointDef>(store).await? {
            data.insert_endpoint(endpoint);
        }
        for method in drain::<MethodDef>(store).await? {
            data.insert_method(method);
        }
        for parameter in drain::<ParameterDef>(store).await? {
            data.insert_parameter(parameter);
        }
        for property in drain::<PropertyRow>(store).await? {
            data.insert_property(&property);
        }

        info!(
            endpoints = data.endpoints.len(),
            method_groups = data.methods.len(),
            parameter_groups = data.parameters.len(),
            property_groups = data.properties.len(),
            "Registry loaded"
        );
        Ok(Self::from_data(data))
    }

    /// Read access to the tables
    ///
    /// The guard must not be held across an `.await`.
    pub fn read(&self) -> RwLockReadGuard<'_, RegistryData> {
        self.data.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, RegistryData> {
        self.data.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Register a new endpoint path
    ///
    /// `check_route` is called with the canonical path after the duplicate
    /// check and before the store write, so the caller can veto paths that
    /// would not route.
    ///
    /// # Errors
    ///
    /// `BadRequest` for an empty path, `Conflict` for a duplicate, whatever
    /// `check_route` returns, or `Database` if the insert fails.
    pub async fn register<F>(
        &self,
        store: &DatabasePool,
        raw_path: &str,
        check_route: F,
    ) -> Result<EndpointDef>
    where
        F: FnOnce(&str) -> Result<()>,
    {
        let path = normalize_path(raw_path)
            .ok_or_else(|| Error::BadRequest("path must be provided".to_string()))?;

        let _writer = self.writer.lock().await;

        if self.read().endpoint_by_path(&path).is_some() {
            return Err(Error::Conflict(format!("endpoint {path} already registered")));
        }
        check_route(&path)?;

        let id = store
            .insert_returning_id(INSERT_ENDPOINT, &[DbValue::from(path.as_str())])
            .await?;

        let endpoint = EndpointDef {
            id,
            path,
            uri_params: 0,
            methods: 0,
        };
        self.write().insert_endpoint(endpoint.clone());

        info!(endpoint_id = id, path = %endpoint.path, "Endpoint registered");
        Ok(endpoint)
    }

    /// Register a verb for an existing endpoint
    ///
    /// Allocates a methods group through the store when the endpoint has none;
    /// the new id is above every group referenced by a method or an endpoint.
    /// The method row and the endpoint update commit together.
    /// Endpoints sharing a methods group share the new verb.
    ///
    /// # Errors
    ///
    /// `BadRequest` for an unsupported verb, `NotFound` for an unknown
    /// endpoint, `Conflict` when the verb is already in the endpoint's group,
    /// `Database` if a write fails.
    pub async fn register_method(
        &self,
        store: &DatabasePool,
        endpoint_id: i64,
        verb_name: &str,
        headers: i64,
        query: i64,
    ) -> Result<MethodDef> {
        let verb = verb_name
            .parse::<Method>()
            .ok()
            .filter(Method::is_data_verb)
            .ok_or_else(|| {
                Error::BadRequest(format!(
                    "unsupported method {}",
                    verb_name.trim().to_ascii_uppercase()
                ))
            })?;

        let _writer = self.writer.lock().await;

        let endpoint = self.read().require_endpoint(endpoint_id)?.clone();
        if self.read().method(endpoint.methods, verb).is_some() {
            return Err(Error::Conflict(format!(
                "{verb} already registered for endpoint {endpoint_id}"
            )));
        }

        let allocate = !group_defined(endpoint.methods);
        let mut tx = store.begin().await?;
        let row = if allocate {
            tx.fetch_one(
                INSERT_METHOD_NEW_GROUP,
                &[verb.as_str().into(), query.into(), headers.into()],
            )
            .await?
        } else {
            tx.fetch_one(
                INSERT_METHOD,
                &[
                    endpoint.methods.into(),
                    verb.as_str().into(),
                    query.into(),
                    headers.into(),
                ],
            )
            .await?
        };

        let (Some(id), Some(group_id)) = (
            row.get("id").and_then(DbValue::as_int),
            row.get("group_id").and_then(DbValue::as_int),
        ) else {
            error!(endpoint_id, "Method insert returned no keys");
            return Err(Error::database("Insert error", "no generated keys returned"));
        };

        if allocate {
            tx.execute(UPDATE_ENDPOINT_METHODS, &[group_id.into(), endpoint_id.into()])
                .await?;
        }
        tx.commit().await?;

        let method = MethodDef {
            id,
            group_id,
            verb,
            query,
            headers,
        };
        {
            let mut data = self.write();
            if allocate {
                if let Some(cached) = data.endpoints.get_mut(&endpoint_id) {
                    cached.methods = group_id;
                }
            }
            data.insert_method(method.clone());
        }

        info!(endpoint_id, method_id = id, group_id, verb = %verb, "Method registered");
        Ok(method)
    }
}

async fn drain<T: Record>(store: &DatabasePool) -> Result<Vec<T>> {
    let rows = store.query_all(T::RELATION).await.map_err(|e| {
        error!(relation = T::RELATION, error = %e, "Failed to fetch system relation");
        e
    })?;
    rows.iter().map(T::from_row).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ParamType;

    async fn seeded_store() -> DatabasePool {
        let store = DatabasePool::connect_sqlite("sqlite::memory:", Some(1))
            .await
            .unwrap();
        store.migrate().await.unwrap();

        for statement in [
            "INSERT INTO endpoint (id, path, uri_params, methods) VALUES (1, '/grid/{x}', 1, 1)",
            "INSERT INTO endpoint (id, path, uri_params, methods) VALUES (2, '/railway', 0, 1)",
            "INSERT INTO endpoint (id, path, uri_params, methods) VALUES (3, '/empty', -1, 0)",
            "INSERT INTO method (group_id, name, query, headers) VALUES (1, 'GET', 2, 0)",
            "INSERT INTO method (group_id, name, query, headers) VALUES (1, 'post', 0, 0)",
            "INSERT INTO parameter (group_id, name, type, required, properties) VALUES (1, 'x', 'integer', 1, 0)",
            "INSERT INTO parameter (group_id, name, type, required, properties) VALUES (2, 'mode', 'string', 0, 5)",
            "INSERT INTO property (group_id, key, value) VALUES (5, 'enum', 'fast,slow')",
            "INSERT INTO property (group_id, key, value) VALUES (5, 'note', 'kept')",
        ] {
            store.execute(statement, &[]).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_load_builds_all_tables() {
        let store = seeded_store().await;
        let registry = Registry::load(&store).await.unwrap();
        let data = registry.read();

        assert_eq!(data.endpoints().count(), 3);
        assert_eq!(data.verbs(1), vec![Method::Get, Method::Post]);
        assert_eq!(data.method(1, Method::Get).map(|m| m.query), Some(2));

        let x: Vec<_> = data.parameters(1).collect();
        assert_eq!(x.len(), 1);
        assert_eq!(x[0].param_type, ParamType::Integer);
        assert!(x[0].required);

        let props = data.properties(5);
        assert_eq!(props.enum_values().map(|(v, _)| v.len()), Some(2));
        assert_eq!(props.entries().get("note").map(String::as_str), Some("kept"));
    }

    #[tokio::test]
    async fn test_absent_groups_are_empty() {
        let registry = Registry::load(&seeded_store().await).await.unwrap();
        let data = registry.read();

        assert_eq!(data.parameters(-1).count(), 0);
        assert_eq!(data.parameters(0).count(), 0);
        assert_eq!(data.methods(0).count(), 0);
        assert!(data.properties(0).is_empty());
        assert!(data.properties(42).is_empty());
    }

    #[tokio::test]
    async fn test_unknown_endpoint_is_not_found() {
        let registry = Registry::load(&seeded_store().await).await.unwrap();
        let result = registry.read().require_endpoint(99).map(|_| ());
        match result {
            Err(Error::NotFound(message)) => assert!(message.contains("99")),
            other => panic!("expected not found, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_load_fails_without_relations() {
        let store = DatabasePool::connect_sqlite("sqlite::memory:", Some(1))
            .await
            .unwrap();
        let result = Registry::load(&store).await;
        assert!(matches!(result, Err(Error::Database { .. })));
    }

    #[tokio::test]
    async fn test_load_fails_on_unknown_type() {
        let store = seeded_store().await;
        store
            .execute(
                "INSERT INTO parameter (group_id, name, type, required, properties) VALUES (9, 'z', 'float', 0, 0)",
                &[],
            )
            .await
            .unwrap();
        let result = Registry::load(&store).await;
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[tokio::test]
    async fn test_register_endpoint() {
        let store = seeded_store().await;
        let registry = Registry::load(&store).await.unwrap();

        let endpoint = registry.register(&store, "/factory/", |_| Ok(())).await.unwrap();
        assert_eq!(endpoint.path, "/factory");
        assert_eq!(endpoint.methods, 0);
        assert!(registry.read().endpoint(endpoint.id).is_some());

        let reloaded = Registry::load(&store).await.unwrap();
        assert!(reloaded.read().endpoint_by_path("/factory").is_some());
    }

    #[tokio::test]
    async fn test_register_duplicate_path_conflicts() {
        let store = seeded_store().await;
        let registry = Registry::load(&store).await.unwrap();

        let result = registry.register(&store, "railway/", |_| Ok(())).await;
        assert!(matches!(result, Err(Error::Conflict(_))));
    }

    #[tokio::test]
    async fn test_register_empty_path() {
        let store = seeded_store().await;
        let registry = Registry::load(&store).await.unwrap();

        for raw in ["", "/", "  "] {
            match registry.register(&store, raw, |_| Ok(())).await {
                Err(Error::BadRequest(message)) => assert_eq!(message, "path must be provided"),
                other => panic!("expected bad request for {raw:?}, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_register_vetoed_path_is_not_written() {
        let store = seeded_store().await;
        let registry = Registry::load(&store).await.unwrap();

        let result = registry
            .register(&store, "/grid/{y}", |_| Err(Error::Conflict("route".into())))
            .await;
        assert!(matches!(result, Err(Error::Conflict(_))));

        let reloaded = Registry::load(&store).await.unwrap();
        assert!(reloaded.read().endpoint_by_path("/grid/{y}").is_none());
    }

    #[tokio::test]
    async fn test_register_method_allocates_group() {
        let store = seeded_store().await;
        let registry = Registry::load(&store).await.unwrap();

        let method = registry
            .register_method(&store, 3, "put", 0, 2)
            .await
            .unwrap();
        assert_eq!(method.verb, Method::Put);
        assert!(method.group_id > 1);

        let data = registry.read();
        assert_eq!(data.endpoint(3).map(|e| e.methods), Some(method.group_id));
        assert_eq!(data.verbs(method.group_id), vec![Method::Put]);
        drop(data);

        let reloaded = Registry::load(&store).await.unwrap();
        assert_eq!(
            reloaded.read().endpoint(3).map(|e| e.methods),
            Some(method.group_id)
        );
    }

    #[tokio::test]
    async fn test_register_method_appends_to_group() {
        let store = seeded_store().await;
        let registry = Registry::load(&store).await.unwrap();

        let method = registry
            .register_method(&store, 2, "DELETE", 0, 0)
            .await
            .unwrap();
        assert_eq!(method.group_id, 1);
        assert_eq!(
            registry.read().verbs(1),
            vec![Method::Get, Method::Post, Method::Delete]
        );
    }

    #[tokio::test]
    async fn test_register_method_duplicate_verb() {
        let store = seeded_store().await;
        let registry = Registry::load(&store).await.unwrap();

        let result = registry.register_method(&store, 1, "get", 0, 0).await;
        assert!(matches!(result, Err(Error::Conflict(_))));
    }

    #[tokio::test]
    async fn test_same_verb_on_different_groups() {
        let store = seeded_store().await;
        let registry = Registry::load(&store).await.unwrap();

        let a = registry.register(&store, "/a", |_| Ok(())).await.unwrap();
        let b = registry.register(&store, "/b", |_| Ok(())).await.unwrap();

        let first = registry.register_method(&store, a.id, "GET", 0, 0).await.unwrap();
        let second = registry.register_method(&store, b.id, "GET", 0, 0).await.unwrap();
        assert_ne!(first.group_id, second.group_id);
    }

    #[tokio::test]
    async fn test_register_method_errors() {
        let store = seeded_store().await;
        let registry = Registry::load(&store).await.unwrap();

        let unknown = registry.register_method(&store, 77, "GET", 0, 0).await;
        assert!(matches!(unknown, Err(Error::NotFound(_))));

        let options = registry.register_method(&store, 1, "options", 0, 0).await;
        match options {
            Err(Error::BadRequest(message)) => assert_eq!(message, "unsupported method OPTIONS"),
            other => panic!("expected bad request, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_new_group_skips_referenced_empty_groups() {
        let store = seeded_store().await;
        store
            .execute(
                "INSERT INTO endpoint (id, path, uri_params, methods) VALUES (4, '/shared', 0, 7)",
                &[],
            )
            .await
            .unwrap();
        let registry = Registry::load(&store).await.unwrap();

        let method = registry
            .register_method(&store, 3, "DELETE", 0, 0)
            .await
            .unwrap();
        assert_eq!(method.group_id, 8);

        let data = registry.read();
        assert!(data.verbs(7).is_empty());
        assert_eq!(data.verbs(8), vec![Method::Delete]);
    }

    #[tokio::test]
    async fn test_failed_group_update_leaves_no_method() {
        let store = seeded_store().await;
        store
            .execute(
                "CREATE TRIGGER reject_methods BEFORE UPDATE OF methods ON endpoint \
                 BEGIN SELECT RAISE(ABORT, 'rejected'); END",
                &[],
            )
            .await
            .unwrap();
        let registry = Registry::load(&store).await.unwrap();

        let result = registry.register_method(&store, 3, "PUT", 0, 0).await;
        assert!(matches!(result, Err(Error::Database { .. })));
        assert_eq!(registry.read().endpoint(3).map(|e| e.methods), Some(0));

        let reloaded = Registry::load(&store).await.unwrap();
        let data = reloaded.read();
        assert_eq!(data.endpoint(3).map(|e| e.methods), Some(0));
        assert_eq!(data.verbs(2), Vec::<Method>::new());
        assert_eq!(data.verbs(1), vec![Method::Get, Method::Post]);
    }

    #[tokio::test]
    async fn test_stored_trailing_slash_still_conflicts() {
        let store = seeded_store().await;
        store
            .execute(
                "INSERT INTO endpoint (path, uri_params, methods) VALUES ('/stored/', 0, 0)",
                &[],
            )
            .await
            .unwrap();
        let registry = Registry::load(&store).await.unwrap();

        assert!(registry.read().endpoint_by_path("/stored").is_some());
        let result = registry.register(&store, "/stored", |_| Ok(())).await;
        assert!(matches!(result, Err(Error::Conflict(_))));
    }
}
