// src/services/select_options.rs

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::api::gateway::ApiGateway;
use crate::models::resource::{FieldConfig, SelectOption};

enum CacheEntry {
    /// Requisição despachada e ainda sem resposta: nenhuma segunda
    /// chamada pode sair para a mesma chave.
    Pending,
    Ready(Vec<SelectOption>),
}

/// Cache das listas de opções de campos `select` alimentados por outro
/// recurso. Escopo de processo, chaveado pelo endpoint de origem,
/// escrito uma única vez por chave e nunca invalidado. Injetável, para
/// que os testes criem instâncias novas.
#[derive(Default)]
pub struct SelectOptionsCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl SelectOptionsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opções já resolvidas para um endpoint, se houver.
    pub fn cached(&self, endpoint: &str) -> Option<Vec<SelectOption>> {
        let entries = self.entries.lock().ok()?;
        match entries.get(endpoint) {
            Some(CacheEntry::Ready(opciones)) => Some(opciones.clone()),
            _ => None,
        }
    }

    /// Opções de um campo: a lista estática quando declarada, senão o
    /// cache (vazio enquanto a carga não resolve).
    pub fn options_for(&self, campo: &FieldConfig) -> Vec<SelectOption> {
        if let Some(estaticas) = &campo.select_options {
            if !estaticas.is_empty() {
                return estaticas.clone();
            }
        }

        match &campo.select_endpoint {
            Some(endpoint) => self.cached(endpoint).unwrap_or_default(),
            None => Vec::new(),
        }
    }

    /// Garante a carga das opções de um campo com endpoint. Chave com
    /// entrada pendente ou resolvida não dispara nova requisição; erro
    /// de busca grava uma lista vazia (definitiva, como tudo aqui).
    pub async fn ensure_loaded(&self, gateway: &dyn ApiGateway, campo: &FieldConfig) {
        let Some(endpoint) = campo.select_endpoint.clone() else {
            return;
        };

        {
            let mut entries = match self.entries.lock() {
                Ok(entries) => entries,
                Err(_) => return,
            };
            if entries.contains_key(&endpoint) {
                return;
            }
            entries.insert(endpoint.clone(), CacheEntry::Pending);
        }

        let opciones = match gateway.list(&endpoint, None).await {
            Ok(respuesta) => map_options(&respuesta, campo),
            Err(e) => {
                tracing::warn!(
                    endpoint = %endpoint,
                    "falha carregando opções de select: {}",
                    e.user_message()
                );
                Vec::new()
            }
        };

        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(endpoint, CacheEntry::Ready(opciones));
        }
    }
}

fn map_options(respuesta: &Value, campo: &FieldConfig) -> Vec<SelectOption> {
    let registros: Vec<&Value> = match respuesta {
        Value::Array(itens) => itens.iter().collect(),
        Value::Null => Vec::new(),
        unico => vec![unico],
    };

    let value_key = campo.select_value_key.as_deref().unwrap_or("id");
    let label_key = campo.select_label_key.as_deref().unwrap_or("nombre");

    registros
        .into_iter()
        .map(|registro| SelectOption {
            value: registro.get(value_key).cloned().unwrap_or(Value::Null),
            label: match registro.get(label_key) {
                Some(Value::String(texto)) => texto.clone(),
                Some(Value::Null) | None => String::new(),
                Some(otro) => otro.to_string(),
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::resource::FieldType;
    use crate::test_support::FakeGateway;
    use serde_json::json;

    fn campo_rol() -> FieldConfig {
        FieldConfig {
            key: "IdRol".to_string(),
            label: "Rol".to_string(),
            field_type: FieldType::Select,
            select_endpoint: Some("rol".to_string()),
            select_value_key: Some("IdRol".to_string()),
            select_label_key: Some("NombreRol".to_string()),
            ..FieldConfig::default()
        }
    }

    #[tokio::test]
    async fn loads_once_per_endpoint() {
        let cache = SelectOptionsCache::new();
        let gateway = FakeGateway::new();
        gateway.on(
            "LIST rol",
            Ok(json!([
                { "IdRol": 1, "NombreRol": "Administrador" },
                { "IdRol": 2, "NombreRol": "Cliente" }
            ])),
        );
        let campo = campo_rol();

        cache.ensure_loaded(&gateway, &campo).await;
        cache.ensure_loaded(&gateway, &campo).await;

        assert_eq!(gateway.calls_for("LIST", "rol"), 1);

        let opciones = cache.cached("rol").unwrap();
        assert_eq!(opciones.len(), 2);
        assert_eq!(opciones[0].value, json!(1));
        assert_eq!(opciones[0].label, "Administrador");
    }

    #[tokio::test]
    async fn fetch_error_caches_an_empty_list() {
        let cache = SelectOptionsCache::new();
        let gateway = FakeGateway::new();
        gateway.on("LIST rol", Err("Error HTTP 500"));
        let campo = campo_rol();

        cache.ensure_loaded(&gateway, &campo).await;
        assert_eq!(cache.cached("rol"), Some(Vec::new()));

        // A chave já resolvida (ainda que vazia) não dispara nova carga.
        cache.ensure_loaded(&gateway, &campo).await;
        assert_eq!(gateway.calls_for("LIST", "rol"), 1);
    }

    #[tokio::test]
    async fn static_options_bypass_the_cache() {
        let cache = SelectOptionsCache::new();
        let campo = FieldConfig {
            key: "Estado".to_string(),
            label: "Estado".to_string(),
            field_type: FieldType::Select,
            select_options: Some(vec![SelectOption {
                value: json!("Activo"),
                label: "Activo".to_string(),
            }]),
            ..FieldConfig::default()
        };

        let opciones = cache.options_for(&campo);
        assert_eq!(opciones.len(), 1);
        assert_eq!(opciones[0].label, "Activo");
    }
}
