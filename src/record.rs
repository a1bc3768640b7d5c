// Record types and serialization

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// One field of a record type. Sensitive fields are prompted without echo
/// and are eligible for generated values.
pub struct FieldSpec {
    pub name: &'static str,
    pub sensitive: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordType {
    Login,
    Environment,
    Snippet,
    Unstructured,
}

impl RecordType {
    pub const ALL: [RecordType; 4] = [
        RecordType::Login,
        RecordType::Environment,
        RecordType::Snippet,
        RecordType::Unstructured,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            RecordType::Login => "login",
            RecordType::Environment => "environment",
            RecordType::Snippet => "snippet",
            RecordType::Unstructured => "unstructured",
        }
    }

    pub fn fields(&self) -> &'static [FieldSpec] {
        match self {
            RecordType::Login => &[
                FieldSpec {
                    name: "username",
                    sensitive: false,
                },
                FieldSpec {
                    name: "password",
                    sensitive: true,
                },
            ],
            RecordType::Environment => &[
                FieldSpec {
                    name: "variable",
                    sensitive: false,
                },
                FieldSpec {
                    name: "value",
                    sensitive: true,
                },
            ],
            RecordType::Snippet => &[
                FieldSpec {
                    name: "code",
                    sensitive: false,
                },
                FieldSpec {
                    name: "description",
                    sensitive: false,
                },
            ],
            RecordType::Unstructured => &[FieldSpec {
                name: "text",
                sensitive: false,
            }],
        }
    }

    /// Resolve a user-supplied type name. An exact match wins; otherwise a
    /// prefix resolves only when it is unique. An ambiguous prefix is an
    /// error, not a guess.
    pub fn resolve(name: &str) -> Result<RecordType, Error> {
        if name.is_empty() {
            return Err(Error::RecordType(name.to_string()));
        }
        if let Some(exact) = Self::ALL.iter().find(|t| t.name() == name) {
            return Ok(*exact);
        }

        let mut matches = Self::ALL.iter().filter(|t| t.name().starts_with(name));
        match (matches.next(), matches.next()) {
            (Some(only), None) => Ok(*only),
            _ => Err(Error::RecordType(name.to_string())),
        }
    }
}

/// A stored record: its type plus fields in entry order. The label is the
/// file stem on the backend, not part of the serialized body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    pub kind: RecordType,
    pub fields: Vec<(String, String)>,
    #[serde(skip)]
    pub label: String,
}

impl Record {
    pub fn new(kind: RecordType, label: &str, fields: Vec<(String, String)>) -> Self {
        Self {
            kind,
            fields,
            label: label.to_string(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn from_json(label: &str, bytes: &[u8]) -> Result<Record, Error> {
        let mut record: Record = serde_json::from_slice(bytes)
            .map_err(|e| Error::RecordParse(label.to_string(), e.to_string()))?;
        record.label = label.to_string();
        Ok(record)
    }

    pub fn to_json(&self) -> Result<Vec<u8>, Error> {
        serde_json::to_vec(self).map_err(|e| Error::RecordParse(self.label.clone(), e.to_string()))
    }
}
