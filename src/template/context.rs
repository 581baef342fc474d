use serde::Serialize;
use serde_json::{Map, Value};

use crate::asset::SegmentAssets;
use crate::models::RequestRecord;

/// Images a template can embed, already encoded as data URIs.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TemplateAssets {
    pub logo: String,
    pub signature: String,
    pub background: String,
}

impl TemplateAssets {
    pub fn new(segment: SegmentAssets, background: String) -> Self {
        Self {
            logo: segment.logo,
            signature: segment.signature,
            background,
        }
    }
}

/// The value tree a template is bound against.
///
/// Record fields sit at the top level. `data` and `formData` hold the same
/// record for templates written against those names, and `assets` holds the
/// embeddable images. Engine-specific values are added with [`with`](Self::with).
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct BindingContext(Map<String, Value>);

impl BindingContext {
    pub fn new(record: &RequestRecord, assets: &TemplateAssets) -> Self {
        let mut root = record.as_map().clone();
        let record_value = Value::Object(record.as_map().clone());
        root.insert("data".to_string(), record_value.clone());
        root.insert("formData".to_string(), record_value);
        root.insert(
            "assets".to_string(),
            serde_json::to_value(assets).unwrap_or_default(),
        );
        Self(root)
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }
}
