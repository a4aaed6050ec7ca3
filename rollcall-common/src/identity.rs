//! Identity extraction
//!
//! Turns an arbitrarily-shaped record into the `{name, company, position,
//! imageUrl?}` tuple shown on the kiosk and returned by the identity lookup.
//! Every field is resolved through an ordered chain of lookups; the first
//! lookup that yields a non-blank string wins. The chains below are the wire
//! contract with record producers, so their order matters.

use serde::{Deserialize, Serialize};

use crate::record::{first_text_at, text_at, Fields};

pub const UNKNOWN_NAME: &str = "Unknown";
pub const UNKNOWN_COMPANY: &str = "Unknown Company";
pub const UNKNOWN_POSITION: &str = "Unknown Position";

/// Normalized identity of the person behind a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayedIdentity {
    pub name: String,
    pub company: String,
    pub position: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// One step of a fallback chain
#[derive(Debug, Clone, Copy)]
pub enum Lookup {
    /// Non-blank string at a field path
    Text(&'static [&'static str]),
    /// First element of a string list at a field path
    FirstItem(&'static [&'static str]),
    /// `firstName lastName`, only when both are present
    FullName,
}

impl Lookup {
    pub fn apply(&self, fields: &Fields) -> Option<String> {
        match self {
            Lookup::Text(path) => text_at(fields, path).map(str::to_string),
            Lookup::FirstItem(path) => first_text_at(fields, path).map(str::to_string),
            Lookup::FullName => {
                let first = text_at(fields, &["firstName"])?;
                let last = text_at(fields, &["lastName"])?;
                Some(format!("{} {}", first.trim(), last.trim()))
            }
        }
    }
}

pub const NAME_CHAIN: &[Lookup] = &[
    Lookup::FullName,
    Lookup::Text(&["user", "name"]),
    Lookup::Text(&["name"]),
];

pub const COMPANY_CHAIN: &[Lookup] = &[
    Lookup::Text(&["user", "company"]),
    Lookup::Text(&["companyName"]),
    Lookup::Text(&["company"]),
];

pub const POSITION_CHAIN: &[Lookup] = &[
    Lookup::Text(&["user", "position"]),
    Lookup::Text(&["position"]),
    Lookup::Text(&["user", "role"]),
];

pub const IMAGE_CHAIN: &[Lookup] = &[
    Lookup::FirstItem(&["image"]),
    Lookup::Text(&["image"]),
    Lookup::Text(&["user", "imageUrl"]),
    Lookup::FirstItem(&["user", "image"]),
    Lookup::Text(&["user", "image"]),
    Lookup::Text(&["imageUrl"]),
    Lookup::Text(&["user", "photo"]),
    Lookup::Text(&["photo"]),
];

/// First match of a chain
pub fn resolve(chain: &[Lookup], fields: &Fields) -> Option<String> {
    chain.iter().find_map(|lookup| lookup.apply(fields))
}

/// Extract the display identity from a record's fields. Never fails.
pub fn extract_identity(fields: &Fields) -> DisplayedIdentity {
    DisplayedIdentity {
        name: resolve(NAME_CHAIN, fields).unwrap_or_else(|| UNKNOWN_NAME.to_string()),
        company: resolve(COMPANY_CHAIN, fields).unwrap_or_else(|| UNKNOWN_COMPANY.to_string()),
        position: resolve(POSITION_CHAIN, fields).unwrap_or_else(|| UNKNOWN_POSITION.to_string()),
        image_url: resolve(IMAGE_CHAIN, fields),
    }
}
