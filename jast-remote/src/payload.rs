//! Wire shapes of the Jamf Pro API script and category endpoints.

use serde::{Deserialize, Deserializer, Serialize};

use jast_core::{LocalScript, Priority, RemoteScript, ScriptId, ScriptMetadata};

/// Category id sent for scripts filed under `NONE`.
pub const NO_CATEGORY_ID: i64 = -1;

/// Script record as sent to and received from `/v1/scripts`.
///
/// The server leaves unset strings out or sends `null`, so every optional
/// attribute is an `Option` on the way in.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptPayload {
    #[serde(default, skip_serializing)]
    pub id: Option<ScriptId>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub info: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub parameter4: Option<String>,
    #[serde(default)]
    pub parameter5: Option<String>,
    #[serde(default)]
    pub parameter6: Option<String>,
    #[serde(default)]
    pub parameter7: Option<String>,
    #[serde(default)]
    pub parameter8: Option<String>,
    #[serde(default)]
    pub parameter9: Option<String>,
    #[serde(default)]
    pub parameter10: Option<String>,
    #[serde(default)]
    pub parameter11: Option<String>,
    #[serde(default)]
    pub os_requirements: Option<String>,
    #[serde(default)]
    pub script_contents: Option<String>,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub category_name: Option<String>,
}

impl ScriptPayload {
    /// Request body for create/update of `script` filed under `category_id`.
    pub fn from_local(script: &LocalScript, category_id: i64) -> Self {
        let m = &script.metadata;
        Self {
            id: None,
            name: script.name.0.clone(),
            info: Some(m.info.clone()),
            notes: Some(m.notes.clone()),
            priority: Some(m.priority),
            parameter4: Some(m.parameter4.clone()),
            parameter5: Some(m.parameter5.clone()),
            parameter6: Some(m.parameter6.clone()),
            parameter7: Some(m.parameter7.clone()),
            parameter8: Some(m.parameter8.clone()),
            parameter9: Some(m.parameter9.clone()),
            parameter10: Some(m.parameter10.clone()),
            parameter11: Some(m.parameter11.clone()),
            os_requirements: Some(m.os_requirements.clone()),
            script_contents: Some(script.body.clone()),
            category_id: Some(category_id.to_string()),
            category_name: Some(m.category_name.clone()),
        }
    }

    /// Domain view of a record read from the server.
    pub fn into_remote(self) -> Option<RemoteScript> {
        let id = self.id?;
        let defaults = ScriptMetadata::default();
        let metadata = ScriptMetadata {
            id: Some(id),
            info: self.info.unwrap_or_default(),
            notes: self.notes.unwrap_or_default(),
            priority: self.priority.unwrap_or_default(),
            parameter4: self.parameter4.unwrap_or_default(),
            parameter5: self.parameter5.unwrap_or_default(),
            parameter6: self.parameter6.unwrap_or_default(),
            parameter7: self.parameter7.unwrap_or_default(),
            parameter8: self.parameter8.unwrap_or_default(),
            parameter9: self.parameter9.unwrap_or_default(),
            parameter10: self.parameter10.unwrap_or_default(),
            parameter11: self.parameter11.unwrap_or_default(),
            os_requirements: self.os_requirements.unwrap_or_default(),
            category_name: self
                .category_name
                .filter(|c| !c.is_empty())
                .unwrap_or(defaults.category_name),
        };
        Some(RemoteScript {
            id,
            name: self.name,
            body: self.script_contents.unwrap_or_default(),
            metadata,
        })
    }
}

/// One page of a paginated collection.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    #[serde(default)]
    pub total_count: Option<usize>,
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
}

/// `{ "id": "101", "href": "..." }` returned by create.
#[derive(Debug, Deserialize)]
pub struct CreatedRecord {
    pub id: ScriptId,
}

/// `{ "token": "...", "expires": "..." }` returned by the auth endpoint.
#[derive(Debug, Deserialize)]
pub struct AuthToken {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct HistoryNote<'a> {
    pub note: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Category {
    #[serde(deserialize_with = "flexible_i64")]
    pub id: i64,
    pub name: String,
}

fn flexible_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(i64),
        Text(String),
    }

    match Repr::deserialize(deserializer)? {
        Repr::Number(n) => Ok(n),
        Repr::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}
