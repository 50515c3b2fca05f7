//! Route definitions and their flattened, per-utterance form.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A named classification target described by example utterances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    /// Route name.
    pub name: String,

    /// Example utterances, in order.
    pub utterances: Vec<String>,

    /// Function-call schemas handed to whoever handles the route.
    #[serde(default)]
    pub function_schemas: Option<Vec<Value>>,

    /// Free-form metadata.
    #[serde(default)]
    pub metadata: Option<Map<String, Value>>,
}

impl Route {
    /// Create a new route.
    pub fn new<S: Into<String>>(
        name: impl Into<String>,
        utterances: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            name: name.into(),
            utterances: utterances.into_iter().map(Into::into).collect(),
            function_schemas: None,
            metadata: None,
        }
    }

    /// Attach a function-call schema.
    pub fn with_function_schema(mut self, schema: Value) -> Self {
        self.function_schemas.get_or_insert_with(Vec::new).push(schema);
        self
    }

    /// Attach a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
        self
    }

    /// One entry per utterance of this route.
    pub fn to_utterances(&self) -> Vec<Utterance> {
        self.utterances
            .iter()
            .map(|utterance| Utterance {
                route: self.name.clone(),
                utterance: utterance.clone(),
                function_schemas: self.function_schemas.clone(),
                metadata: self.metadata.clone(),
            })
            .collect()
    }
}

/// A single utterance together with the route it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Utterance {
    pub route: String,
    pub utterance: String,
    pub function_schemas: Option<Vec<Value>>,
    pub metadata: Option<Map<String, Value>>,
}

impl Utterance {
    /// Render as `route: utterance`, optionally followed by schemas and
    /// metadata as JSON.
    pub fn to_line(&self, include_metadata: bool) -> String {
        if !include_metadata {
            return format!("{}: {}", self.route, self.utterance);
        }
        let schemas = serde_json::to_string(&self.function_schemas).unwrap_or_default();
        let metadata = serde_json::to_string(&self.metadata).unwrap_or_default();
        format!("{}: {} | {schemas} | {metadata}", self.route, self.utterance)
    }
}

/// One or more routes handed to the router in a single call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteBatch(Vec<Route>);

impl RouteBatch {
    /// Number of routes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the batch has no routes.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The routes, in order.
    pub fn routes(&self) -> &[Route] {
        &self.0
    }

    /// Take the routes out of the batch.
    pub fn into_routes(self) -> Vec<Route> {
        self.0
    }
}

impl From<Route> for RouteBatch {
    fn from(route: Route) -> Self {
        Self(vec![route])
    }
}

impl From<Vec<Route>> for RouteBatch {
    fn from(routes: Vec<Route>) -> Self {
        Self(routes)
    }
}

impl From<&[Route]> for RouteBatch {
    fn from(routes: &[Route]) -> Self {
        Self(routes.to_vec())
    }
}

impl FromIterator<Route> for RouteBatch {
    fn from_iter<T: IntoIterator<Item = Route>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Routes flattened into parallel per-utterance sequences.
///
/// Position `i` of every sequence describes the same utterance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteDetails {
    pub route_names: Vec<String>,
    pub utterances: Vec<String>,
    pub function_schemas: Vec<Option<Vec<Value>>>,
    pub metadata: Vec<Option<Map<String, Value>>>,
}

impl RouteDetails {
    /// Flatten `routes`, keeping route order and utterance order.
    pub fn extract(routes: &[Route]) -> Self {
        let mut details = Self::default();
        for route in routes {
            for utterance in &route.utterances {
                details.route_names.push(route.name.clone());
                details.utterances.push(utterance.clone());
                details.function_schemas.push(route.function_schemas.clone());
                details.metadata.push(route.metadata.clone());
            }
        }
        details
    }

    /// Number of utterances.
    pub fn len(&self) -> usize {
        self.utterances.len()
    }

    /// Whether there are no utterances.
    pub fn is_empty(&self) -> bool {
        self.utterances.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_extract_keeps_association() {
        let routes = vec![
            Route::new("greeting", ["hi", "hello"]).with_metadata("lang", "en"),
            Route::new("weather", ["is it raining?"])
                .with_function_schema(json!({"name": "get_weather"})),
        ];

        let details = RouteDetails::extract(&routes);

        assert_eq!(details.len(), 3);
        assert_eq!(details.route_names, vec!["greeting", "greeting", "weather"]);
        assert_eq!(details.utterances, vec!["hi", "hello", "is it raining?"]);
        assert_eq!(details.function_schemas[0], None);
        assert_eq!(
            details.function_schemas[2],
            Some(vec![json!({"name": "get_weather"})])
        );
        assert_eq!(details.metadata[1].as_ref().unwrap()["lang"], "en");
        assert_eq!(details.metadata[2], None);
    }

    #[test]
    fn test_single_route_is_one_element_batch() {
        let batch = RouteBatch::from(Route::new("greeting", ["hi"]));
        assert_eq!(batch.len(), 1);
        assert_eq!(batch.routes()[0].name, "greeting");
    }

    #[test]
    fn test_utterance_lines() {
        let route = Route::new("greeting", ["hi"]).with_metadata("lang", "en");
        let utterance = &route.to_utterances()[0];

        assert_eq!(utterance.to_line(false), "greeting: hi");
        assert_eq!(utterance.to_line(true), r#"greeting: hi | null | {"lang":"en"}"#);
    }

    #[test]
    fn test_route_deserializes_without_optional_fields() {
        let route: Route =
            serde_json::from_str(r#"{"name": "greeting", "utterances": ["hi"]}"#).unwrap();
        assert_eq!(route, Route::new("greeting", ["hi"]));
    }
}
