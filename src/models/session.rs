// src/models/session.rs

use serde::{Deserialize, Serialize};

/// Usuário normalizado da sessão. As chaves seguem a grafia PascalCase
/// da API do Renfi porque o blob viaja serializado para o storage do
/// navegador e volta.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SessionUser {
    pub id_usuario: Option<i64>,
    pub numero_documento: Option<String>,
    pub nombre_usuario: Option<String>,
    pub apellido_usuario: Option<String>,
    pub telefono: Option<String>,
    pub correo: Option<String>,
    pub estado: Option<String>,
    pub rol: Option<String>,
    pub id_rol: Option<i64>,
}

impl SessionUser {
    /// Nome completo para exibição, quando houver partes suficientes.
    pub fn full_name(&self) -> Option<String> {
        match (&self.nombre_usuario, &self.apellido_usuario) {
            (Some(nombre), Some(apellido)) => Some(format!("{nombre} {apellido}").trim().to_string()),
            (Some(nombre), None) => Some(nombre.clone()),
            (None, Some(apellido)) => Some(apellido.clone()),
            (None, None) => None,
        }
    }

    /// Documento para reservas: NumeroDocumento, senão o IdUsuario.
    pub fn document(&self) -> Option<String> {
        match &self.numero_documento {
            Some(doc) if !doc.is_empty() => Some(doc.clone()),
            _ => self.id_usuario.map(|id| id.to_string()),
        }
    }
}

/// Blob persistido no storage da sessão (e, com "recordar", no local).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoredSession {
    pub token: Option<String>,
    pub usuario: Option<SessionUser>,
}
