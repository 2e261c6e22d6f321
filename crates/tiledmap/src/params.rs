//! Request parameters sent with every tile and grid request.
//!
//! Parameters are a pure function of the query snapshot, the drawn shape and
//! the dataset identifier. They are rebuilt from scratch on every redraw.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::geometry::DrawnShape;
use crate::query::{Filter, QuerySnapshot};

pub const RESOURCE_ID: &str = "resource_id";
pub const FILTERS: &str = "filters";
pub const QUERY: &str = "q";
pub const GEOMETRY: &str = "geom";
pub const HEATMAP: &str = "heatmap";

/// How the backend renders the dataset's tiles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MapStyle {
    /// One marker per record.
    #[default]
    Plot,
    /// Record density. Sent to the backend as `heatmap=true`.
    Heatmap,
}

/// Parameter name to value, iterated in key order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestParameters {
    values: BTreeMap<String, String>,
}

impl RequestParameters {
    /// Value of a parameter, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Whether the parameter is present.
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether there are no parameters at all.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Parameters in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// `application/x-www-form-urlencoded` encoding, keys in order.
    pub fn to_query_string(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.iter())
            .finish()
    }

    fn insert(&mut self, key: &str, value: String) {
        self.values.insert(key.to_string(), value);
    }
}

impl<'a> IntoIterator for &'a RequestParameters {
    type Item = (&'a String, &'a String);
    type IntoIter = std::collections::btree_map::Iter<'a, String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

/// Serialize filters as a JSON object keyed by field.
///
/// A field filtered once maps to its term; a field filtered several times maps
/// to the array of its terms in the order they were added.
pub fn encode_filters(filters: &[Filter]) -> String {
    let mut grouped: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for filter in filters {
        grouped
            .entry(filter.field.as_str())
            .or_default()
            .push(filter.term.as_str());
    }

    let object: Map<String, Value> = grouped
        .into_iter()
        .map(|(field, terms)| {
            let value = match terms.as_slice() {
                [single] => Value::String((*single).to_string()),
                many => Value::Array(many.iter().map(|t| Value::String((*t).to_string())).collect()),
            };
            (field.to_string(), value)
        })
        .collect();

    Value::Object(object).to_string()
}

/// Assemble the parameters for the current state in the default plot style.
///
/// `resource_id` and `filters` are always present; `q` only for a non-empty
/// term; `geom` only while a shape is drawn.
pub fn build_parameters(
    resource_id: &str,
    query: &QuerySnapshot,
    shape: Option<&DrawnShape>,
) -> RequestParameters {
    build_styled_parameters(resource_id, query, shape, MapStyle::Plot)
}

/// Like [`build_parameters`], adding `heatmap` for the heatmap style.
pub fn build_styled_parameters(
    resource_id: &str,
    query: &QuerySnapshot,
    shape: Option<&DrawnShape>,
    style: MapStyle,
) -> RequestParameters {
    let mut params = RequestParameters::default();
    params.insert(RESOURCE_ID, resource_id.to_string());
    params.insert(FILTERS, encode_filters(&query.filters));
    if !query.q.is_empty() {
        params.insert(QUERY, query.q.clone());
    }
    if let Some(shape) = shape {
        params.insert(GEOMETRY, shape.to_wkt());
    }
    if style == MapStyle::Heatmap {
        params.insert(HEATMAP, "true".to_string());
    }
    params
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{LatLng, LatLngBounds};

    fn snapshot(q: &str, filters: Vec<Filter>) -> QuerySnapshot {
        QuerySnapshot {
            q: q.to_string(),
            filters,
            geometry: None,
        }
    }

    fn square() -> DrawnShape {
        DrawnShape::rectangle(LatLngBounds::new(LatLng::new(0.0, 0.0), LatLng::new(1.0, 1.0)))
            .unwrap()
    }

    #[test]
    fn test_empty_state_has_only_required_keys() {
        let params = build_parameters("abc", &snapshot("", Vec::new()), None);
        assert_eq!(params.len(), 2);
        assert_eq!(params.get(RESOURCE_ID), Some("abc"));
        assert_eq!(params.get(FILTERS), Some("{}"));
        assert!(!params.contains(QUERY));
        assert!(!params.contains(GEOMETRY));
    }

    #[test]
    fn test_q_present_only_when_non_empty() {
        for (term, expected) in [("", None), ("lion", Some("lion")), (" ", Some(" "))] {
            let params = build_parameters("abc", &snapshot(term, Vec::new()), None);
            assert_eq!(params.get(QUERY), expected, "term {term:?}");
        }
    }

    #[test]
    fn test_geom_present_iff_shape() {
        let query = snapshot("", Vec::new());
        assert!(!build_parameters("abc", &query, None).contains(GEOMETRY));

        let shape = square();
        let params = build_parameters("abc", &query, Some(&shape));
        assert_eq!(params.get(GEOMETRY), Some(shape.to_wkt().as_str()));
    }

    #[test]
    fn test_equal_inputs_build_equal_parameters() {
        let filters = vec![Filter::term("country", "Kenya"), Filter::term("class", "Mammalia")];
        let shape = square();
        let a = build_parameters("abc", &snapshot("lion", filters.clone()), Some(&shape));
        let b = build_parameters("abc", &snapshot("lion", filters), Some(&shape.clone()));
        assert_eq!(a, b);
        assert_eq!(a.to_query_string(), b.to_query_string());
    }

    #[test]
    fn test_filters_grouped_by_field() {
        let filters = vec![
            Filter::term("species", "Panthera leo"),
            Filter::term("country", "Kenya"),
            Filter::term("species", "Panthera pardus"),
        ];
        assert_eq!(
            encode_filters(&filters),
            r#"{"country":"Kenya","species":["Panthera leo","Panthera pardus"]}"#
        );
    }

    #[test]
    fn test_query_string_is_form_encoded() {
        let params = build_parameters(
            "abc",
            &snapshot("panthera leo", vec![Filter::term("country", "Kenya")]),
            None,
        );
        assert_eq!(
            params.to_query_string(),
            "filters=%7B%22country%22%3A%22Kenya%22%7D&q=panthera+leo&resource_id=abc"
        );
    }

    #[test]
    fn test_heatmap_flag_follows_style() {
        let query = snapshot("lion", Vec::new());
        let plot = build_styled_parameters("abc", &query, None, MapStyle::Plot);
        assert_eq!(plot, build_parameters("abc", &query, None));
        assert!(!plot.contains(HEATMAP));

        let heatmap = build_styled_parameters("abc", &query, None, MapStyle::Heatmap);
        assert_eq!(heatmap.get(HEATMAP), Some("true"));
        assert_eq!(heatmap.len(), plot.len() + 1);
        assert_eq!(
            heatmap.to_query_string(),
            "filters=%7B%7D&heatmap=true&q=lion&resource_id=abc"
        );
    }

    #[test]
    fn test_foreign_filters_pass_through() {
        // Filters written by other views are forwarded untouched.
        let params = build_parameters(
            "abc",
            &snapshot("", vec![Filter::term("_tags", "grid-view")]),
            None,
        );
        assert_eq!(params.get(FILTERS), Some(r#"{"_tags":"grid-view"}"#));
    }
}
