use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::FormError;

pub const MAX_COMENTARIO_CHARS: usize = 300;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

/// Body of `POST /form`. The server assigns the id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContactSubmission {
    pub nombre: String,
    pub cedula: String,
    pub telefono: String,
    pub email: String,
    pub comentario: String,
    pub paqueteria: Vec<String>,
    pub fecha: DateTime<Utc>,
}

impl ContactSubmission {
    /// Trim every field and stamp the submission time.
    pub fn new(
        nombre: &str,
        cedula: &str,
        telefono: &str,
        email: &str,
        comentario: &str,
        paqueteria: &[&str],
    ) -> Self {
        Self {
            nombre: nombre.trim().to_string(),
            cedula: cedula.trim().to_string(),
            telefono: telefono.trim().to_string(),
            email: email.trim().to_string(),
            comentario: comentario.trim().to_string(),
            paqueteria: paqueteria.iter().map(|p| p.to_string()).collect(),
            fecha: Utc::now(),
        }
    }

    /// Checks run in form order; the first failing rule is reported.
    pub fn validate(&self) -> Result<(), FormError> {
        if self.nombre.is_empty() {
            return Err(FormError::MissingNombre);
        }
        if self.cedula.is_empty() {
            return Err(FormError::MissingCedula);
        }
        if self.telefono.is_empty() {
            return Err(FormError::MissingTelefono);
        }
        if self.email.is_empty() {
            return Err(FormError::MissingEmail);
        }
        if !EMAIL_RE.is_match(&self.email) {
            return Err(FormError::InvalidEmail);
        }
        if self.comentario.is_empty() {
            return Err(FormError::MissingComentario);
        }
        if self.comentario.chars().count() > MAX_COMENTARIO_CHARS {
            return Err(FormError::ComentarioTooLong { max: MAX_COMENTARIO_CHARS });
        }
        Ok(())
    }
}
