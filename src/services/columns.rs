// src/services/columns.rs
//
// Derivação dinâmica das colunas visíveis de um recurso: esquema +
// campos preferidos + chaves observadas nos registros carregados, tudo
// canonizado pelo mapa inverso de aliases. Determinística e idempotente.

use serde_json::Value;
use std::collections::{HashMap, HashSet};

use crate::models::resource::{Record, ResourceConfig};
use crate::services::fields;

/// Mapa alias -> chave canônica: cada alias declarado e cada variante
/// mecânica da chave canônica apontam de volta para ela.
pub fn invert_aliases(config: &ResourceConfig) -> HashMap<String, String> {
    let mut mapa = HashMap::new();

    for (canonico, aliases) in &config.field_aliases {
        for alias in aliases {
            mapa.insert(alias.clone(), canonico.clone());
        }
        for variante in fields::field_variants(canonico, aliases) {
            mapa.insert(variante, canonico.clone());
        }
    }

    mapa
}

/// Valor "definido": nem nulo, nem texto em branco, nem coleção vazia.
pub fn has_defined_value(valor: &Value) -> bool {
    match valor {
        Value::Null => false,
        Value::String(texto) => !texto.trim().is_empty(),
        Value::Array(itens) => !itens.is_empty(),
        Value::Object(mapa) => !mapa.is_empty(),
        _ => true,
    }
}

/// Lista ordenada de colunas visíveis para o conjunto carregado.
///
/// Semeia de `config.columns`, depois dos campos preferidos, depois das
/// chaves de cada registro; no filtro final as colunas forçadas pelo
/// esquema sobrevivem sempre, colunas com cara de id externo caem, e o
/// resto só fica se algum registro tiver valor definido.
pub fn derive_columns(config: &ResourceConfig, registros: &[Record]) -> Vec<String> {
    let inverso = invert_aliases(config);
    let ocultas: HashSet<&str> = config.hidden_columns.iter().map(String::as_str).collect();

    let mut colunas: Vec<String> = Vec::new();
    let mut agregar = |clave: &str| {
        if clave.is_empty() {
            return;
        }
        let canonico = inverso.get(clave).cloned().unwrap_or_else(|| clave.to_string());
        if ocultas.contains(canonico.as_str()) || canonico.starts_with('_') {
            return;
        }
        if !colunas.contains(&canonico) {
            colunas.push(canonico);
        }
    };

    for coluna in &config.columns {
        agregar(coluna);
    }
    for campo in &config.preferred_fields {
        agregar(&campo.key);
    }
    for registro in registros {
        for clave in registro.keys() {
            agregar(clave);
        }
    }

    if colunas.is_empty() {
        return colunas;
    }

    let forzadas: HashSet<&str> = config.columns.iter().map(String::as_str).collect();

    colunas
        .into_iter()
        .filter(|coluna| {
            // Colunas declaradas no esquema ficam isentas do descarte
            // de ids externos e da exigência de valor definido.
            if forzadas.contains(coluna.as_str()) {
                return true;
            }
            if fields::is_external_id_column(coluna, config.id_field.as_deref()) {
                return false;
            }
            if ocultas.contains(coluna.as_str()) {
                return false;
            }

            registros.iter().any(|registro| {
                fields::resolve_field_value(registro, coluna, config.aliases_for(coluna))
                    .map(has_defined_value)
                    .unwrap_or(false)
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::resource::FieldConfig;
    use serde_json::json;

    fn registro(json: Value) -> Record {
        json.as_object().cloned().unwrap()
    }

    fn config_reservas() -> ResourceConfig {
        let mut config = ResourceConfig {
            id: "reservas".to_string(),
            title: "Reservas".to_string(),
            endpoint: "reserva".to_string(),
            id_field: Some("IdReserva".to_string()),
            columns: vec!["IdReserva".to_string(), "FechaEntrada".to_string()],
            hidden_columns: vec!["NumeroDocumento".to_string()],
            preferred_fields: vec![
                FieldConfig {
                    key: "NumeroDocumento".to_string(),
                    label: "Usuario (Documento)".to_string(),
                    ..FieldConfig::default()
                },
                FieldConfig {
                    key: "Estado".to_string(),
                    label: "Estado".to_string(),
                    ..FieldConfig::default()
                },
            ],
            ..ResourceConfig::default()
        };
        config.field_aliases.insert(
            "NumeroDocumento".to_string(),
            vec!["IdUsuario".to_string(), "UsuarioId".to_string()],
        );
        config
    }

    #[test]
    fn forced_columns_survive_the_external_id_drop() {
        let config = config_reservas();
        let registros = vec![registro(json!({ "Estado": "Activa" }))];

        let colunas = derive_columns(&config, &registros);

        // `IdReserva` e `FechaEntrada` vêm forçadas pelo esquema, mesmo
        // sem valor definido em registro algum.
        assert_eq!(colunas, vec!["IdReserva", "FechaEntrada", "Estado"]);
    }

    #[test]
    fn record_keys_are_canonicalized_and_appended() {
        let config = config_reservas();
        let registros = vec![registro(json!({
            "IdReserva": 7,
            "FechaEntrada": "2025-01-15",
            "Estado": "Activa",
            "NombreFinca": "El Paraíso",
            // alias de NumeroDocumento: canoniza para uma coluna oculta
            "IdUsuario": 99,
            // id externo observado no registro: descartado
            "IdFinca": 3,
            "_interno": true
        }))];

        let colunas = derive_columns(&config, &registros);
        assert_eq!(
            colunas,
            vec!["IdReserva", "FechaEntrada", "Estado", "NombreFinca"]
        );
    }

    #[test]
    fn unforced_columns_need_a_defined_value() {
        let mut config = config_reservas();
        config.columns.clear();

        let registros = vec![
            registro(json!({ "Estado": "", "Nota": null })),
            registro(json!({ "Estado": "Activa" })),
        ];

        let colunas = derive_columns(&config, &registros);
        assert_eq!(colunas, vec!["Estado"]);
    }

    #[test]
    fn derivation_is_idempotent() {
        let config = config_reservas();
        let registros = vec![registro(json!({
            "Estado": "Activa",
            "NombreFinca": "El Paraíso"
        }))];

        let primera = derive_columns(&config, &registros);
        let segunda = derive_columns(&config, &registros);
        assert_eq!(primera, segunda);
    }

    #[test]
    fn empty_input_yields_no_columns() {
        let config = ResourceConfig::default();
        assert!(derive_columns(&config, &[]).is_empty());
    }
}
