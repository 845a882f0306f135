//! Describe and change-feed response types.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::types::Datetime;

/// Result of `GET sobjects/`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DescribeGlobalResult {
    #[serde(default)]
    pub encoding: String,
    #[serde(default)]
    pub max_batch_size: u32,
    pub sobjects: Vec<SObjectSummary>,
}

impl DescribeGlobalResult {
    pub fn find(&self, name: &str) -> Option<&SObjectSummary> {
        self.sobjects
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
    }
}

/// One object kind as listed by describe global.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SObjectSummary {
    pub name: String,
    pub label: String,
    pub label_plural: String,
    pub key_prefix: Option<String>,
    pub custom: bool,
    pub custom_setting: bool,
    pub queryable: bool,
    pub createable: bool,
    pub updateable: bool,
    pub deletable: bool,
    pub searchable: bool,
    pub retrieveable: bool,
    pub replicateable: bool,
    pub urls: HashMap<String, String>,
}

/// Result of `GET sobjects/{name}/describe`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DescribeSObjectResult {
    pub name: String,
    pub label: String,
    pub label_plural: String,
    pub key_prefix: Option<String>,
    pub custom: bool,
    pub custom_setting: bool,
    pub activateable: bool,
    pub createable: bool,
    pub updateable: bool,
    pub deletable: bool,
    pub undeletable: bool,
    pub mergeable: bool,
    pub queryable: bool,
    pub retrieveable: bool,
    pub searchable: bool,
    pub replicateable: bool,
    pub triggerable: bool,
    pub feed_enabled: bool,
    pub deprecated_and_hidden: bool,
    pub fields: Vec<FieldDescribe>,
    pub child_relationships: Vec<ChildRelationship>,
    pub record_type_infos: Vec<RecordTypeInfo>,
    pub urls: HashMap<String, String>,
}

impl DescribeSObjectResult {
    /// Look a field up by API name, ignoring case.
    pub fn field(&self, name: &str) -> Option<&FieldDescribe> {
        self.fields.iter().find(|f| f.name.eq_ignore_ascii_case(name))
    }

    /// Fields usable as the key of an upsert.
    pub fn external_id_fields(&self) -> impl Iterator<Item = &FieldDescribe> {
        self.fields.iter().filter(|f| f.external_id || (f.id_lookup && f.name != "Id"))
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FieldDescribe {
    pub name: String,
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: String,
    pub soap_type: String,
    pub length: u32,
    pub byte_length: u32,
    pub precision: u32,
    pub scale: u32,
    pub digits: u32,
    pub custom: bool,
    pub calculated: bool,
    pub auto_number: bool,
    pub createable: bool,
    pub updateable: bool,
    pub nillable: bool,
    pub unique: bool,
    pub external_id: bool,
    pub id_lookup: bool,
    pub filterable: bool,
    pub sortable: bool,
    pub groupable: bool,
    pub defaulted_on_create: bool,
    pub default_value: Option<serde_json::Value>,
    pub calculated_formula: Option<String>,
    pub relationship_name: Option<String>,
    pub reference_to: Vec<String>,
    pub picklist_values: Vec<PicklistValue>,
    pub dependent_picklist: bool,
    pub controller_name: Option<String>,
    pub inline_help_text: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PicklistValue {
    pub value: String,
    pub label: Option<String>,
    pub active: bool,
    pub default_value: bool,
    pub valid_for: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChildRelationship {
    #[serde(rename = "childSObject")]
    pub child_sobject: String,
    pub field: String,
    pub relationship_name: Option<String>,
    pub cascade_delete: bool,
    pub restricted_delete: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecordTypeInfo {
    pub name: String,
    pub developer_name: String,
    pub record_type_id: String,
    pub active: bool,
    pub available: bool,
    pub master: bool,
    pub default_record_type_mapping: bool,
    pub urls: HashMap<String, String>,
}

/// Result of `GET sobjects/{name}/deleted/`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GetDeletedResult {
    pub deleted_records: Vec<DeletedRecord>,
    pub earliest_date_available: Datetime,
    pub latest_date_covered: Datetime,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeletedRecord {
    pub id: String,
    pub deleted_date: Datetime,
}

/// Result of `GET sobjects/{name}/updated/`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GetUpdatedResult {
    pub ids: Vec<String>,
    pub latest_date_covered: Datetime,
}
