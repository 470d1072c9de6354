use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

use crate::error::ApiError;

/// One submitted inquiry from the public contact form.
///
/// The server may key records by `_id` or `id`; both collapse into
/// [`ContactRecord::id`] at ingestion, `_id` winning when both are present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawContactRecord")]
pub struct ContactRecord {
    pub id: String,
    pub nombre: String,
    pub cedula: String,
    pub telefono: String,
    pub email: String,
    pub comentario: String,
    pub paqueteria: BTreeSet<String>,
    pub fecha: DateTime<Utc>,
}

#[derive(Deserialize)]
struct RawContactRecord {
    #[serde(rename = "_id")]
    mongo_id: Option<String>,
    id: Option<String>,
    // Missing and `null` both mean empty.
    #[serde(default)]
    nombre: Option<String>,
    #[serde(default)]
    cedula: Option<String>,
    #[serde(default)]
    telefono: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    comentario: Option<String>,
    #[serde(default)]
    paqueteria: Option<BTreeSet<String>>,
    fecha: DateTime<Utc>,
}

impl TryFrom<RawContactRecord> for ContactRecord {
    type Error = String;

    fn try_from(raw: RawContactRecord) -> Result<Self, Self::Error> {
        let id = raw
            .mongo_id
            .or(raw.id)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| "record has neither `_id` nor `id`".to_string())?;
        Ok(Self {
            id,
            nombre: raw.nombre.unwrap_or_default(),
            cedula: raw.cedula.unwrap_or_default(),
            telefono: raw.telefono.unwrap_or_default(),
            email: raw.email.unwrap_or_default(),
            comentario: raw.comentario.unwrap_or_default(),
            paqueteria: raw.paqueteria.unwrap_or_default(),
            fecha: raw.fecha,
        })
    }
}

impl ContactRecord {
    /// Name shown in notices; the form allows it to be blank on old records.
    pub fn display_name(&self) -> &str {
        if self.nombre.trim().is_empty() { "Sin nombre" } else { &self.nombre }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListEnvelope {
    pub success: bool,
    pub data: Option<Vec<Value>>,
}

impl ListEnvelope {
    /// Turn the envelope into records, all or nothing.
    pub fn into_records(self) -> Result<Vec<ContactRecord>, ApiError> {
        let items = match (self.success, self.data) {
            (true, Some(items)) => items,
            _ => return Err(ApiError::Malformed("expected `success: true` with `data`".into())),
        };
        items
            .into_iter()
            .map(|item| {
                serde_json::from_value::<ContactRecord>(item)
                    .map_err(|e| ApiError::Malformed(e.to_string()))
            })
            .collect()
    }
}

/// Response body of `POST /form` and `DELETE /form/{id}`.
#[derive(Debug, Deserialize)]
pub struct Ack {
    pub success: bool,
    pub message: Option<String>,
}
