//! Records, attribute blocks and single-record results.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A record of some Salesforce object kind.
///
/// Collection operations never send the caller's value: they send the copy
/// returned by [`SObject::with_attributes`], which carries the `attributes`
/// block the API needs to route each record.
///
/// ```rust,ignore
/// #[derive(Clone, Serialize)]
/// struct Contact {
///     #[serde(skip_serializing_if = "Option::is_none")]
///     attributes: Option<Attributes>,
///     #[serde(rename = "LastName")]
///     last_name: String,
/// }
///
/// impl SObject for Contact {
///     fn sobject_name(&self) -> &str {
///         "Contact"
///     }
///
///     fn with_attributes(&self, reference: Option<&str>) -> Self {
///         Self {
///             attributes: Some(Attributes::new("Contact").with_reference(reference)),
///             ..self.clone()
///         }
///     }
/// }
/// ```
pub trait SObject: Send + Sync {
    /// The object kind, e.g. `Account` or `Invoice__c`.
    fn sobject_name(&self) -> &str;

    /// A copy of this record tagged with its attributes block and an
    /// optional correlation reference.
    fn with_attributes(&self, reference: Option<&str>) -> Self
    where
        Self: Sized;
}

/// The `attributes` block of a record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attributes {
    #[serde(rename = "type")]
    pub sobject_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(
        rename = "referenceId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub reference_id: Option<String>,
}

impl Attributes {
    pub fn new(sobject_type: impl Into<String>) -> Self {
        Self {
            sobject_type: sobject_type.into(),
            url: None,
            reference_id: None,
        }
    }

    pub fn with_reference(mut self, reference: Option<&str>) -> Self {
        self.reference_id = reference.filter(|r| !r.is_empty()).map(str::to_string);
        self
    }
}

/// An untyped record: a JSON object whose kind is read from its
/// `attributes.type` entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordMap(pub Map<String, Value>);

impl RecordMap {
    /// An empty record of the given kind.
    pub fn new(sobject_type: &str) -> Self {
        let mut map = Map::new();
        map.insert(
            "attributes".to_string(),
            serde_json::json!({ "type": sobject_type }),
        );
        Self(map)
    }

    /// Set a field, builder style.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// The record `Id`, if present.
    pub fn id(&self) -> Option<&str> {
        self.0.get("Id").and_then(Value::as_str)
    }
}

impl From<Map<String, Value>> for RecordMap {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl SObject for RecordMap {
    fn sobject_name(&self) -> &str {
        self.0
            .get("attributes")
            .and_then(|attrs| attrs.get("type"))
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    fn with_attributes(&self, reference: Option<&str>) -> Self {
        let mut tagged = self.clone();
        let attributes = Attributes::new(self.sobject_name()).with_reference(reference);
        tagged.0.insert(
            "attributes".to_string(),
            serde_json::to_value(attributes).unwrap_or(Value::Null),
        );
        tagged
    }
}

/// A bare record id standing in for a record, so that deletes present the
/// same record-shaped view as the other collection operations.
///
/// Only the id goes on the wire; the tagged form is what a batch logger sees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteId {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Attributes>,
    #[serde(rename = "Id")]
    pub id: String,
}

impl DeleteId {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            attributes: None,
            id: id.into(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.id
    }
}

impl SObject for DeleteId {
    fn sobject_name(&self) -> &str {
        "DeleteId"
    }

    fn with_attributes(&self, reference: Option<&str>) -> Self {
        Self {
            attributes: Some(Attributes::new(self.sobject_name()).with_reference(reference)),
            id: self.id.clone(),
        }
    }
}

/// Per-record error returned by write operations.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SalesforceError {
    #[serde(rename = "statusCode")]
    pub status_code: String,
    pub message: String,
    #[serde(default)]
    pub fields: Vec<String>,
}

/// Result of a single-record create.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CreateResult {
    pub id: String,
    pub success: bool,
    #[serde(default)]
    pub errors: Vec<SalesforceError>,
}

/// Result of a single-record upsert.
///
/// Older API versions answer an update with `204 No Content`, in which case
/// `id` is `None` and `created` is false.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct UpsertResult {
    pub id: Option<String>,
    pub success: bool,
    #[serde(default)]
    pub created: bool,
    #[serde(default)]
    pub errors: Vec<SalesforceError>,
}
