//! Domain types for locally mirrored and remotely hosted scripts.
//!
//! A local script is the pair (metadata descriptor, body file). The
//! descriptor never stores the script name: the file stem is the durable
//! identity anchor, and it is the only thing left to go on once a body has
//! been deleted.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Remote identifier assigned by the management server on first create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ScriptId(pub u64);

impl fmt::Display for ScriptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<u64> for ScriptId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl FromStr for ScriptId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

// The server serialises ids as JSON strings; descriptors store integers.
impl<'de> Deserialize<'de> for ScriptId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Number(u64),
            Text(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Number(n) => Ok(Self(n)),
            Repr::Text(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}

/// Stable local file stem of a script (`<name>.sh` / `<name>.toml`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScriptName(pub String);

impl ScriptName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScriptName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ScriptName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ScriptName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// When the management agent runs the script relative to other payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Priority {
    #[serde(rename = "BEFORE")]
    Before,
    #[default]
    #[serde(rename = "AFTER")]
    After,
    #[serde(rename = "AT_REBOOT", alias = "AFTER REBOOT")]
    AtReboot,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::Before => write!(f, "BEFORE"),
            Priority::After => write!(f, "AFTER"),
            Priority::AtReboot => write!(f, "AT_REBOOT"),
        }
    }
}

// ---------------------------------------------------------------------------
// Domain structs
// ---------------------------------------------------------------------------

/// Category used when a script has not been filed anywhere.
pub const NO_CATEGORY: &str = "NONE";

/// The TOML descriptor kept next to every script body.
///
/// Only remotely mirrored, user-editable attributes live here. The name comes
/// from the file stem, the body from the script file, and the category id is
/// resolved from `category_name` at push time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScriptMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<ScriptId>,
    pub info: String,
    pub notes: String,
    pub priority: Priority,
    pub parameter4: String,
    pub parameter5: String,
    pub parameter6: String,
    pub parameter7: String,
    pub parameter8: String,
    pub parameter9: String,
    pub parameter10: String,
    pub parameter11: String,
    pub os_requirements: String,
    pub category_name: String,
}

impl Default for ScriptMetadata {
    fn default() -> Self {
        Self {
            id: None,
            info: String::new(),
            notes: String::new(),
            priority: Priority::default(),
            parameter4: String::new(),
            parameter5: String::new(),
            parameter6: String::new(),
            parameter7: String::new(),
            parameter8: String::new(),
            parameter9: String::new(),
            parameter10: String::new(),
            parameter11: String::new(),
            os_requirements: String::new(),
            category_name: NO_CATEGORY.to_string(),
        }
    }
}

/// A script as mirrored on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalScript {
    pub name: ScriptName,
    pub metadata: ScriptMetadata,
    pub body: String,
}

/// A script as held by the management server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteScript {
    pub id: ScriptId,
    pub name: String,
    pub body: String,
    /// Always carries `id: Some(self.id)`.
    pub metadata: ScriptMetadata,
}

impl RemoteScript {
    /// The local mirror this remote record would produce under `name`.
    pub fn to_local(&self, name: ScriptName) -> LocalScript {
        let mut metadata = self.metadata.clone();
        metadata.id = Some(self.id);
        LocalScript {
            name,
            metadata,
            body: self.body.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newtype_display() {
        assert_eq!(ScriptId(101).to_string(), "101");
        assert_eq!(ScriptName::from("check-disk").to_string(), "check-disk");
    }

    #[test]
    fn script_id_accepts_json_string_and_number() {
        let from_text: ScriptId = serde_json::from_str("\"42\"").expect("string id");
        let from_number: ScriptId = serde_json::from_str("42").expect("numeric id");
        assert_eq!(from_text, ScriptId(42));
        assert_eq!(from_number, ScriptId(42));
        assert!(serde_json::from_str::<ScriptId>("\"abc\"").is_err());
    }

    #[test]
    fn metadata_defaults_fill_missing_keys() {
        let meta: ScriptMetadata = toml::from_str("info = \"disk check\"\n").expect("parse");
        assert_eq!(meta.id, None);
        assert_eq!(meta.info, "disk check");
        assert_eq!(meta.priority, Priority::After);
        assert_eq!(meta.category_name, NO_CATEGORY);
    }

    #[test]
    fn metadata_uses_camel_case_keys() {
        let meta = ScriptMetadata {
            id: Some(ScriptId(7)),
            os_requirements: "14.x".to_string(),
            category_name: "Maintenance".to_string(),
            ..ScriptMetadata::default()
        };
        let text = toml::to_string(&meta).expect("serialize");
        assert!(text.contains("id = 7"));
        assert!(text.contains("osRequirements = \"14.x\""));
        assert!(text.contains("categoryName = \"Maintenance\""));
    }

    #[test]
    fn unpushed_metadata_omits_id() {
        let text = toml::to_string(&ScriptMetadata::default()).expect("serialize");
        assert!(!text.contains("id ="));
    }

    #[test]
    fn priority_accepts_legacy_reboot_spelling() {
        #[derive(Deserialize)]
        struct Wrapper {
            priority: Priority,
        }
        let w: Wrapper = toml::from_str("priority = \"AFTER REBOOT\"").expect("parse");
        assert_eq!(w.priority, Priority::AtReboot);
        assert_eq!(Priority::AtReboot.to_string(), "AT_REBOOT");
    }

    #[test]
    fn remote_to_local_carries_id() {
        let remote = RemoteScript {
            id: ScriptId(9),
            name: "cleanup".to_string(),
            body: "#!/bin/bash\n".to_string(),
            metadata: ScriptMetadata::default(),
        };
        let local = remote.to_local(ScriptName::from("cleanup"));
        assert_eq!(local.metadata.id, Some(ScriptId(9)));
        assert_eq!(local.body, remote.body);
    }
}
