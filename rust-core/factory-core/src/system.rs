//! # System Routes
//!
//! Introspection of the registry and the two mutations (register endpoint,
//! register method) under `/system`.
//!
//! Read handlers copy what they need out of the registry under a short read
//! lock. Mutations go through [`Registry`](crate::registry::Registry), which
//! writes the store first, and then rebuild the catalog.

use crate::catalog::{self, Catalog, RouteTarget};
use crate::error::{Error, Result};
use crate::json::parse_json;
use crate::model::{MethodDef, ParameterDef};
use crate::registry::RegistryData;
use crate::request::HttpRequest;
use crate::response::HttpResponse;
use crate::router::Method;
use crate::state::AppState;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::info;

/// Introspection and mutation handlers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemRoute {
    /// `GET /system/endpoints`
    ListEndpoints,
    /// `GET /system/endpoints/{endpoint}`
    GetEndpoint,
    /// `GET /system/endpoints/{endpoint}/{method}`
    GetMethod,
    /// `GET /system/parameters`
    ListParameters,
    /// `GET /system/parameters/{parameter}`
    GetParameterGroup,
    /// `GET /system/properties`
    ListProperties,
    /// `GET /system/properties/{property}`
    GetPropertyGroup,
    /// `POST /system/endpoints`
    RegisterEndpoint,
    /// `POST /system/endpoints/{endpoint}/{method}`
    RegisterMethod,
}

impl SystemRoute {
    /// Every system route with its verb and template
    pub const ALL: [(Method, &'static str, Self); 9] = [
        (Method::Get, "/system/endpoints", Self::ListEndpoints),
        (Method::Get, "/system/endpoints/{endpoint}", Self::GetEndpoint),
        (Method::Get, "/system/endpoints/{endpoint}/{method}", Self::GetMethod),
        (Method::Get, "/system/parameters", Self::ListParameters),
        (Method::Get, "/system/parameters/{parameter}", Self::GetParameterGroup),
        (Method::Get, "/system/properties", Self::ListProperties),
        (Method::Get, "/system/properties/{property}", Self::GetPropertyGroup),
        (Method::Post, "/system/endpoints", Self::RegisterEndpoint),
        (Method::Post, "/system/endpoints/{endpoint}/{method}", Self::RegisterMethod),
    ];
}

/// Add every system route to `catalog`
///
/// # Errors
///
/// Returns `Error::InvalidRoutePattern` if a template clashes.
pub fn mount(catalog: &mut Catalog) -> Result<()> {
    for (method, path, route) in SystemRoute::ALL {
        catalog.add_route(method, path, RouteTarget::System(route))?;
    }
    Ok(())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EndpointDetail {
    path: String,
    #[serde(skip_serializing_if = "is_zero")]
    uri_params: i64,
    #[serde(skip_serializing_if = "is_zero")]
    methods: i64,
    configured: BTreeMap<&'static str, ConfiguredMethod>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ConfiguredMethod {
    id: i64,
    query: i64,
    headers: i64,
    parameters: ResolvedParameters,
}

/// Parameter groups of one verb, resolved per source
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ResolvedParameters {
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    uri_params: BTreeMap<String, ParameterDetail>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    headers: BTreeMap<String, ParameterDetail>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    query: BTreeMap<String, ParameterDetail>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MethodDetail {
    id: i64,
    method: &'static str,
    uri_params: i64,
    query: i64,
    headers: i64,
}

#[derive(Debug, Serialize)]
struct ParameterDetail {
    #[serde(rename = "type")]
    param_type: &'static str,
    required: bool,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    properties: BTreeMap<String, String>,
}

/// Body of `POST /system/endpoints/{endpoint}/{method}`
#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
struct MethodGroups {
    #[serde(default)]
    query: i64,
    #[serde(default)]
    headers: i64,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_zero(value: &i64) -> bool {
    *value == 0
}

fn id_param(params: &HashMap<String, String>, name: &str) -> Result<i64> {
    let raw = params.get(name).map_or("", String::as_str);
    raw.parse::<i64>().map_err(|_| {
        Error::BadRequest(format!("uri value {{{name}}} must be a number, got '{raw}'"))
    })
}

fn verb_param(params: &HashMap<String, String>) -> String {
    params
        .get("method")
        .map(|m| m.to_ascii_uppercase())
        .unwrap_or_default()
}

fn parameter_group(data: &RegistryData, group: i64) -> BTreeMap<String, ParameterDetail> {
    data.parameters(group)
        .map(|p: &ParameterDef| {
            (
                p.name.clone(),
                ParameterDetail {
                    param_type: p.param_type.type_name(),
                    required: p.required,
                    properties: data.properties(p.properties).entries(),
                },
            )
        })
        .collect()
}

fn list_endpoints(data: &RegistryData, req: &HttpRequest) -> HttpResponse {
    let base_path = req.query("basePath").unwrap_or_default();
    let endpoints: BTreeMap<&str, i64> = data
        .endpoints()
        .filter(|e| e.path.starts_with(base_path))
        .map(|e| (e.path.as_str(), e.id))
        .collect();
    HttpResponse::json_value(&endpoints)
}

fn get_endpoint(data: &RegistryData, id: i64) -> Result<HttpResponse> {
    let endpoint = data.require_endpoint(id)?;
    let configured = data
        .methods(endpoint.methods)
        .map(|m| {
            (
                m.verb.as_str(),
                ConfiguredMethod {
                    id: m.id,
                    query: m.query,
                    headers: m.headers,
                    parameters: ResolvedParameters {
                        uri_params: parameter_group(data, endpoint.uri_params),
                        headers: parameter_group(data, m.headers),
                        query: parameter_group(data, m.query),
                    },
                },
            )
        })
        .collect();

    Ok(HttpResponse::json_value(&EndpointDetail {
        path: endpoint.path.clone(),
        uri_params: endpoint.uri_params,
        methods: endpoint.methods,
        configured,
    }))
}

fn get_method(data: &RegistryData, id: i64, verb: &str) -> Result<HttpResponse> {
    let endpoint = data.require_endpoint(id)?;
    let method = verb
        .parse::<Method>()
        .ok()
        .and_then(|v| data.method(endpoint.methods, v))
        .ok_or_else(|| Error::NotFound(format!("{verb} not found for endpoint {id}")))?;

    Ok(HttpResponse::json_value(&MethodDetail {
        id: method.id,
        method: method.verb.as_str(),
        uri_params: endpoint.uri_params,
        query: method.query,
        headers: method.headers,
    }))
}

fn list_parameters(data: &RegistryData) -> HttpResponse {
    let groups: BTreeMap<i64, _> = data
        .parameter_groups()
        .into_iter()
        .map(|g| (g, parameter_group(data, g)))
        .collect();
    HttpResponse::json_value(&groups)
}

fn get_parameter_group(data: &RegistryData, group: i64) -> Result<HttpResponse> {
    if !data.has_parameter_group(group) {
        return Err(Error::NotFound(format!("parameter group {group} not found")));
    }
    Ok(HttpResponse::json_value(&parameter_group(data, group)))
}

fn list_properties(data: &RegistryData) -> HttpResponse {
    let groups: BTreeMap<i64, _> = data
        .property_groups()
        .into_iter()
        .map(|g| (g, data.properties(g).entries()))
        .collect();
    HttpResponse::json_value(&groups)
}

fn get_property_group(data: &RegistryData, group: i64) -> Result<HttpResponse> {
    if !data.has_property_group(group) {
        return Err(Error::NotFound(format!("property group {group} not found")));
    }
    Ok(HttpResponse::json_value(&data.properties(group).entries()))
}

async fn register_endpoint(
    state: &AppState,
    req: &HttpRequest,
    correlation_id: &str,
) -> Result<HttpResponse> {
    let registry = state.registry();
    let raw_path = req.body_str().unwrap_or_default();

    let endpoint = registry
        .register(state.store(), raw_path, |path| {
            let current = catalog::build(&registry.read())?;
            catalog::check_path(&current, path)
        })
        .await?;
    state.rebuild_catalog()?;

    let message = format!("endpoint {} registered with id {}", endpoint.path, endpoint.id);
    info!(correlation_id, endpoint_id = endpoint.id, "{message}");
    Ok(HttpResponse::envelope(correlation_id, 200, message))
}

async fn register_method(
    state: &AppState,
    req: &HttpRequest,
    params: &HashMap<String, String>,
    correlation_id: &str,
) -> Result<HttpResponse> {
    let endpoint_id = id_param(params, "endpoint")?;
    let verb = verb_param(params);
    let groups = match req.body_str().map(str::trim) {
        None | Some("") => MethodGroups::default(),
        Some(body) => parse_json::<MethodGroups>(body)?,
    };

    let method: MethodDef = state
        .registry()
        .register_method(state.store(), endpoint_id, &verb, groups.headers, groups.query)
        .await?;
    state.rebuild_catalog()?;

    let message = format!(
        "method {} registered for endpoint {endpoint_id} with id {}",
        method.verb, method.id
    );
    info!(correlation_id, endpoint_id, method_id = method.id, "{message}");
    Ok(HttpResponse::envelope(correlation_id, 200, message))
}

/// Run a system route
///
/// # Errors
///
/// `BadRequest` for non-numeric ids or bodies, `NotFound` for unknown ids,
/// and whatever the registry returns for mutations.
pub async fn handle(
    route: SystemRoute,
    state: &AppState,
    req: &HttpRequest,
    params: &HashMap<String, String>,
    correlation_id: &str,
) -> Result<HttpResponse> {
    match route {
        SystemRoute::RegisterEndpoint => register_endpoint(state, req, correlation_id).await,
        SystemRoute::RegisterMethod => register_method(state, req, params, correlation_id).await,
        read => inspect(read, &state.registry().read(), req, params),
    }
}

fn inspect(
    route: SystemRoute,
    data: &RegistryData,
    req: &HttpRequest,
    params: &HashMap<String, String>,
) -> Result<HttpResponse> {
    match route {
        SystemRoute::ListEndpoints => Ok(list_endpoints(data, req)),
        SystemRoute::GetEndpoint => get_endpoint(data, id_param(params, "endpoint")?),
        SystemRoute::GetMethod => get_method(data, id_param(params, "endpoint")?, &verb_param(params)),
        SystemRoute::ListParameters => Ok(list_parameters(data)),
        SystemRoute::GetParameterGroup => get_parameter_group(data, id_param(params, "parameter")?),
        SystemRoute::ListProperties => Ok(list_properties(data)),
        SystemRoute::GetPropertyGroup => get_property_group(data, id_param(params, "property")?),
        SystemRoute::RegisterEndpoint | SystemRoute::RegisterMethod => Err(Error::Configuration(
            format!("{route:?} is not a read-only route"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EndpointDef, PropertyRow};
    use crate::types::ParamType;

    fn data() -> RegistryData {
        let mut data = RegistryData::new();
        data.insert_endpoint(EndpointDef {
            id: 1,
            path: "/grid/{x}".into(),
            uri_params: 4,
            methods: 2,
        });
        data.insert_endpoint(EndpointDef {
            id: 2,
            path: "/railway".into(),
            uri_params: 0,
            methods: 0,
        });
        data.insert_method(MethodDef {
            id: 10,
            group_id: 2,
            verb: Method::Get,
            query: 5,
            headers: 0,
        });
        data.insert_parameter(ParameterDef {
            group_id: 4,
            ..ParameterDef::new("x", ParamType::Integer, true)
        });
        data.insert_parameter(ParameterDef {
            group_id: 5,
            ..ParameterDef::new("mode", ParamType::String, false).with_properties(6)
        });
        data.insert_property(&PropertyRow {
            group_id: 6,
            key: "enum".into(),
            value: "a,b".into(),
        });
        data
    }

    fn body(resp: &HttpResponse) -> serde_json::Value {
        serde_json::from_str(&resp.body).unwrap()
    }

    fn get(path: &str) -> HttpRequest {
        HttpRequest::new(Method::Get, path, HashMap::new(), None)
    }

    #[test]
    fn test_list_endpoints_by_prefix() {
        let all = list_endpoints(&data(), &get("/system/endpoints"));
        assert_eq!(all.body, r#"{"/grid/{x}":1,"/railway":2}"#);

        let some = list_endpoints(&data(), &get("/system/endpoints?basePath=/rail"));
        assert_eq!(some.body, r#"{"/railway":2}"#);
    }

    #[test]
    fn test_get_endpoint_detail() {
        let resp = get_endpoint(&data(), 1).unwrap();
        let json = body(&resp);
        assert_eq!(json["path"], "/grid/{x}");
        assert_eq!(json["uriParams"], 4);
        assert_eq!(json["methods"], 2);

        let configured = &json["configured"]["GET"];
        assert_eq!(configured["id"], 10);
        assert_eq!(configured["query"], 5);
        assert_eq!(configured["headers"], 0);
        assert_eq!(configured["parameters"]["uriParams"]["x"]["type"], "integer");
        assert_eq!(configured["parameters"]["uriParams"]["x"]["required"], true);
        assert_eq!(configured["parameters"]["query"]["mode"]["properties"]["enum"], "a,b");
        assert!(configured["parameters"].get("headers").is_none());

        let bare = get_endpoint(&data(), 2).unwrap();
        assert_eq!(bare.body, r#"{"path":"/railway","configured":{}}"#);
    }

    #[test]
    fn test_get_method() {
        let resp = get_method(&data(), 1, "GET").unwrap();
        assert_eq!(
            resp.body,
            r#"{"id":10,"method":"GET","uriParams":4,"query":5,"headers":0}"#
        );

        match get_method(&data(), 1, "PUT") {
            Err(Error::NotFound(message)) => assert_eq!(message, "PUT not found for endpoint 1"),
            other => panic!("expected not found, got {other:?}"),
        }
        assert!(matches!(get_method(&data(), 1, "BREW"), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_parameter_groups() {
        let all = list_parameters(&data());
        let json = body(&all);
        assert_eq!(json["4"]["x"]["type"], "integer");
        assert_eq!(json["4"]["x"]["required"], true);
        assert_eq!(json["5"]["mode"]["properties"]["enum"], "a,b");
        assert!(json["4"]["x"].get("properties").is_none());

        let one = get_parameter_group(&data(), 5).unwrap();
        assert_eq!(
            one.body,
            r#"{"mode":{"type":"string","required":false,"properties":{"enum":"a,b"}}}"#
        );
        assert!(matches!(get_parameter_group(&data(), 9), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_property_groups() {
        assert_eq!(list_properties(&data()).body, r#"{"6":{"enum":"a,b"}}"#);
        assert_eq!(get_property_group(&data(), 6).unwrap().body, r#"{"enum":"a,b"}"#);
        match get_property_group(&data(), 0) {
            Err(Error::NotFound(message)) => assert_eq!(message, "property group 0 not found"),
            other => panic!("expected not found, got {other:?}"),
        }
    }

    #[test]
    fn test_id_param() {
        let params = HashMap::from([("endpoint".to_string(), "abc".to_string())]);
        match id_param(&params, "endpoint") {
            Err(Error::BadRequest(message)) => {
                assert_eq!(message, "uri value {endpoint} must be a number, got 'abc'");
            }
            other => panic!("expected bad request, got {other:?}"),
        }
        assert!(id_param(&HashMap::new(), "property").is_err());

        let params = HashMap::from([("endpoint".to_string(), "12".to_string())]);
        assert_eq!(id_param(&params, "endpoint").unwrap(), 12);
    }

    #[test]
    fn test_method_groups_body() {
        let groups: MethodGroups = parse_json(r#"{"query": 3}"#).unwrap();
        assert_eq!(groups, MethodGroups { query: 3, headers: 0 });
    }

    #[test]
    fn test_mount_all_routes() {
        let mut catalog = Catalog::new();
        mount(&mut catalog).unwrap();
        assert_eq!(catalog.len(), SystemRoute::ALL.len());
    }
}
