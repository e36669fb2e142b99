// src/models/resource.rs

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Um registro genérico do backend: mapa aberto de chave/valor. A forma
/// varia por recurso e a grafia das chaves (PascalCase, camelCase,
/// snake_case ou alias livre) se resolve em tempo de leitura.
pub type Record = serde_json::Map<String, Value>;

// --- Enums ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    #[default]
    Text,
    Number,
    Email,
    Date,
    Textarea,
    Select,
    Password,
}

// --- Structs ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectOption {
    pub value: Value,
    pub label: String,
}

/// Campo declarado de um recurso administrável.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldConfig {
    pub key: String,
    pub label: String,
    #[serde(default)]
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub read_only: bool,

    // Origem das opções de um campo `select`: lista estática ou um
    // endpoint de outro recurso.
    pub select_options: Option<Vec<SelectOption>>,
    pub select_endpoint: Option<String>,
    pub select_value_key: Option<String>,
    pub select_label_key: Option<String>,
}

/// Relatório associado a um recurso. Cada um é buscado e acompanhado de
/// forma independente, chaveado pelo endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    pub label: String,
    pub endpoint: String,
    pub description: Option<String>,
    pub columns: Option<Vec<String>>,
}

/// Descrição declarativa de uma entidade administrável. Dado puro:
/// mudar o esquema é uma edição de deploy, não uma operação de runtime.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceConfig {
    pub id: String,
    pub title: String,
    pub endpoint: String,
    pub description: Option<String>,

    /// Nome do campo identificador usado em update/delete.
    pub id_field: Option<String>,
    pub create_path: Option<String>,
    pub update_path: Option<String>,
    pub delete_path: Option<String>,
    pub delete_query_param: Option<String>,

    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub preferred_fields: Vec<FieldConfig>,

    /// Chave canônica -> grafias alternativas vistas em registros crus.
    #[serde(default)]
    pub field_aliases: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub hidden_columns: Vec<String>,

    /// Modelo de carga para registros novos.
    pub sample_payload: Option<Record>,
    #[serde(default)]
    pub reports: Vec<ReportConfig>,
}

impl ResourceConfig {
    /// Aliases declarados para um campo canônico (vazio se não houver).
    pub fn aliases_for(&self, field: &str) -> &[String] {
        self.field_aliases
            .get(field)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}
