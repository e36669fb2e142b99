// src/services/form.rs
//
// Estado transitório de um diálogo de criação/edição. Vive do abrir ao
// fechar; a submissão monta a carga final a partir dos controles
// declarados, do blob de campos adicionais e, no modo edição, do
// registro selecionado.

use serde_json::{json, Map, Value};
use std::sync::Arc;

use crate::common::error::AppError;
use crate::models::resource::{FieldConfig, FieldType, Record, ResourceConfig};
use crate::services::fields;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit,
}

/// Um controle do formulário estruturado. O valor é sempre texto, como
/// num input de navegador; a tipagem acontece na submissão.
#[derive(Debug, Clone)]
pub struct FormField {
    pub config: FieldConfig,
    pub value: String,
    pub disabled: bool,
}

#[derive(Debug, Clone)]
pub struct FormModel {
    config: Arc<ResourceConfig>,
    pub mode: FormMode,
    /// Registro em edição (base da carga no modo edição).
    selected: Option<Record>,
    pub fields: Vec<FormField>,
    /// Chaves do registro não cobertas pelos campos declarados, como
    /// JSON identado. Painel alternável pelo usuário.
    pub additional_json: String,
    pub show_additional: bool,
    /// Controle único de JSON cru quando o recurso não declara campos.
    pub raw_json: Option<String>,
}

impl FormModel {
    /// Monta o formulário. `origin` é o registro selecionado (edição)
    /// ou o modelo de exemplo/plantilla (criação) — no modo criação os
    /// controles declarados começam vazios mesmo com origem presente.
    pub fn build(
        config: Arc<ResourceConfig>,
        mode: FormMode,
        origin: Option<Record>,
        current_columns: &[String],
    ) -> Self {
        let campos = configured_fields(&config, mode);

        if campos.is_empty() {
            let base = match mode {
                FormMode::Edit => origin
                    .clone()
                    .or_else(|| config.sample_payload.clone())
                    .unwrap_or_else(|| template_from_columns(current_columns)),
                FormMode::Create => template_from_columns(current_columns),
            };

            return Self {
                config,
                mode,
                selected: if mode == FormMode::Edit { origin } else { None },
                fields: Vec::new(),
                additional_json: String::new(),
                show_additional: false,
                raw_json: Some(pretty_json(&Value::Object(base))),
            };
        }

        let mut controles = Vec::with_capacity(campos.len());
        for campo in &campos {
            let inicial = if mode == FormMode::Edit {
                origin
                    .as_ref()
                    .and_then(|registro| registro.get(&campo.key))
            } else {
                None
            };

            let disabled = campo.read_only
                || (mode == FormMode::Edit
                    && config.id_field.as_deref() == Some(campo.key.as_str()));

            controles.push(FormField {
                config: campo.clone(),
                value: display_value(inicial),
                disabled,
            });
        }

        let additional_json = additional_fields_json(origin.as_ref(), &campos);
        let show_additional = !additional_json.trim().is_empty();

        Self {
            config,
            mode,
            selected: if mode == FormMode::Edit { origin } else { None },
            fields: controles,
            additional_json,
            show_additional,
            raw_json: None,
        }
    }

    pub fn is_structured(&self) -> bool {
        self.raw_json.is_none()
    }

    pub fn selected(&self) -> Option<&Record> {
        self.selected.as_ref()
    }

    /// Atualiza um controle pelo nome. Controles desabilitados não
    /// mudam (id e campos somente-leitura em edição).
    pub fn set_value(&mut self, key: &str, value: &str) -> bool {
        match self.fields.iter_mut().find(|campo| campo.config.key == key) {
            Some(campo) if !campo.disabled => {
                campo.value = value.to_string();
                true
            }
            _ => false,
        }
    }

    pub fn value_of(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|campo| campo.config.key == key)
            .map(|campo| campo.value.as_str())
    }

    pub fn toggle_additional(&mut self) {
        self.show_additional = !self.show_additional;
    }

    /// Carga final a transmitir. Validações locais curto-circuitam aqui,
    /// antes de qualquer chamada de rede.
    pub fn payload(&self) -> Result<Value, AppError> {
        if let Some(texto) = &self.raw_json {
            let mut valor: Value = serde_json::from_str(texto).map_err(|_| {
                AppError::Form(
                    "JSON inválido. Verifica la sintaxis y vuelve a intentar.".to_string(),
                )
            })?;

            // No modo criação o identificador nunca viaja, também no
            // modo JSON cru.
            if self.mode == FormMode::Create {
                if let (Some(id_field), Some(objeto)) =
                    (&self.config.id_field, valor.as_object_mut())
                {
                    objeto.remove(id_field);
                }
            }

            return Ok(valor);
        }

        let mut procesados = Map::new();
        for campo in &self.fields {
            match normalize_field_value(&campo.config, &campo.value) {
                Ok(Some(valor)) => {
                    procesados.insert(campo.config.key.clone(), valor);
                }
                Ok(None) => {}
                Err(mensaje) => return Err(AppError::Form(mensaje)),
            }
        }

        let adicionales = self.parse_additional()?;

        // Ordem de fusão: registro selecionado (edição), depois campos
        // adicionais, depois campos declarados — declarados vencem.
        let mut carga = match (&self.mode, &self.selected) {
            (FormMode::Edit, Some(seleccionado)) => seleccionado.clone(),
            _ => Map::new(),
        };
        carga.extend(adicionales);
        carga.extend(procesados);

        if self.mode == FormMode::Create {
            if let Some(id_field) = &self.config.id_field {
                carga.remove(id_field);
            }
        }

        Ok(Value::Object(carga))
    }

    fn parse_additional(&self) -> Result<Map<String, Value>, AppError> {
        let texto = self.additional_json.trim();
        if texto.is_empty() {
            return Ok(Map::new());
        }

        let valor: Value = serde_json::from_str(texto).map_err(|_| {
            AppError::Form(
                "JSON inválido en los campos adicionales. Verifica la sintaxis.".to_string(),
            )
        })?;

        match valor {
            Value::Object(mapa) => Ok(mapa),
            _ => Err(AppError::Form(
                "Los campos adicionales deben ser un objeto JSON (clave: valor).".to_string(),
            )),
        }
    }
}

/// Campos declarados: os preferidos do esquema e, apenas em edição, um
/// identificador somente-leitura sintetizado quando não declarado. Na
/// criação o id sai do formulário: o backend o atribui.
fn configured_fields(config: &ResourceConfig, mode: FormMode) -> Vec<FieldConfig> {
    let mut campos: Vec<FieldConfig> = config.preferred_fields.clone();

    if let Some(id_field) = &config.id_field {
        let declarado = campos.iter().any(|campo| &campo.key == id_field);
        if mode == FormMode::Edit && !declarado {
            campos.insert(
                0,
                FieldConfig {
                    key: id_field.clone(),
                    label: fields::field_label(config, id_field),
                    field_type: FieldType::Text,
                    read_only: true,
                    ..FieldConfig::default()
                },
            );
        }
    }

    campos
}

fn additional_fields_json(origin: Option<&Record>, campos: &[FieldConfig]) -> String {
    let Some(origin) = origin else {
        return String::new();
    };

    let declaradas: Vec<&str> = campos.iter().map(|campo| campo.key.as_str()).collect();
    let mut adicionales = Map::new();
    for (clave, valor) in origin {
        if !declaradas.contains(&clave.as_str()) {
            adicionales.insert(clave.clone(), valor.clone());
        }
    }

    if adicionales.is_empty() {
        String::new()
    } else {
        pretty_json(&Value::Object(adicionales))
    }
}

fn template_from_columns(columns: &[String]) -> Record {
    if columns.is_empty() {
        return json!({ "campo": "valor" }).as_object().cloned().unwrap();
    }

    columns
        .iter()
        .map(|columna| (columna.clone(), json!("")))
        .collect()
}

fn display_value(valor: Option<&Value>) -> String {
    match valor {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(texto)) => texto.clone(),
        Some(otro) => otro.to_string(),
    }
}

fn pretty_json(valor: &Value) -> String {
    serde_json::to_string_pretty(valor).unwrap_or_default()
}

/// Normalização por tipo declarado. `Ok(None)` significa "não enviar a
/// chave": vazio opcional é omitido, não transmitido como texto vazio.
fn normalize_field_value(campo: &FieldConfig, valor: &str) -> Result<Option<Value>, String> {
    if !campo.required && valor.trim().is_empty() {
        return Ok(None);
    }

    match campo.field_type {
        FieldType::Number => {
            let numero: f64 = valor
                .trim()
                .parse()
                .map_err(|_| format!("El campo \"{}\" debe ser numérico.", campo.label))?;
            if !numero.is_finite() {
                return Err(format!("El campo \"{}\" debe ser numérico.", campo.label));
            }
            Ok(Some(number_value(numero)))
        }
        _ => {
            let texto = valor.trim();
            if texto.is_empty() {
                // Obrigatório vazio viaja como "" e a rejeição fica com
                // a validação do servidor.
                return Ok(Some(json!("")));
            }
            Ok(Some(json!(texto)))
        }
    }
}

/// Inteiros continuam inteiros no JSON de saída (250000, não 250000.0).
fn number_value(numero: f64) -> Value {
    if numero.fract() == 0.0 && numero.abs() < i64::MAX as f64 {
        json!(numero as i64)
    } else {
        json!(numero)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::registry::ResourceRegistry;

    fn config(id: &str) -> Arc<ResourceConfig> {
        Arc::new(ResourceRegistry::builtin().get(id).unwrap().clone())
    }

    fn registro(json: Value) -> Record {
        json.as_object().cloned().unwrap()
    }

    #[test]
    fn create_fields_start_empty_despite_sample_payload() {
        let usuarios = config("usuarios");
        let sample = usuarios.sample_payload.clone();
        let form = FormModel::build(usuarios, FormMode::Create, sample, &[]);

        assert!(form.is_structured());
        for campo in &form.fields {
            assert_eq!(campo.value, "", "campo {} deveria começar vazio", campo.config.key);
        }
    }

    #[test]
    fn edit_synthesizes_a_disabled_identifier_field() {
        let usuarios = config("usuarios");
        let origen = registro(json!({
            "NumeroDocumento": 123456789,
            "NombreUsuario": "Laura",
            "Correo": "laura@renfi.com"
        }));

        let form = FormModel::build(usuarios, FormMode::Edit, Some(origen), &[]);

        let id = &form.fields[0];
        assert_eq!(id.config.key, "NumeroDocumento");
        assert!(id.disabled);
        assert_eq!(id.value, "123456789");

        let nombre = form.value_of("NombreUsuario").unwrap();
        assert_eq!(nombre, "Laura");
    }

    #[test]
    fn uncovered_keys_land_in_the_additional_panel() {
        let usuarios = config("usuarios");
        let origen = registro(json!({
            "NombreUsuario": "Laura",
            "CampoLibre": "valor raro"
        }));

        let form = FormModel::build(usuarios, FormMode::Edit, Some(origen), &[]);
        assert!(form.show_additional);
        assert!(form.additional_json.contains("CampoLibre"));
        assert!(!form.additional_json.contains("NombreUsuario"));
    }

    #[test]
    fn create_payload_never_contains_the_id_key() {
        // Propriedade válida para todos os recursos do registro.
        let registry = ResourceRegistry::builtin();
        for recurso in registry.iter() {
            let Some(id_field) = recurso.id_field.clone() else {
                continue;
            };

            let config = Arc::new(recurso.clone());
            let mut origen = recurso
                .sample_payload
                .clone()
                .unwrap_or_default();
            origen.insert(id_field.clone(), json!(99));

            let mut form =
                FormModel::build(config, FormMode::Create, Some(origen), &["campo".to_string()]);
            // Preenche os obrigatórios para a submissão passar.
            let claves: Vec<(String, FieldType)> = form
                .fields
                .iter()
                .filter(|c| c.config.required)
                .map(|c| (c.config.key.clone(), c.config.field_type))
                .collect();
            for (clave, tipo) in claves {
                let relleno = if tipo == FieldType::Number { "7" } else { "x" };
                form.set_value(&clave, relleno);
            }

            let payload = form.payload().unwrap();
            assert!(
                payload.get(&id_field).is_none(),
                "recurso {} vazou o id {} na criação",
                recurso.id,
                id_field
            );
        }
    }

    #[test]
    fn empty_optional_values_are_omitted_not_sent_blank() {
        let fincas = config("fincas");
        let mut form = FormModel::build(fincas, FormMode::Create, None, &[]);
        form.set_value("NombreFinca", "La Esperanza");
        form.set_value("Direccion", "Km 4 vía al mar");
        // Capacidad (number, opcional) e Estado (texto, opcional) vazios

        let payload = form.payload().unwrap();
        assert_eq!(payload["NombreFinca"], "La Esperanza");
        assert!(payload.get("Capacidad").is_none());
        assert!(payload.get("Estado").is_none());
    }

    #[test]
    fn required_empty_text_travels_as_empty_string() {
        let usuarios = config("usuarios");
        let mut form = FormModel::build(usuarios, FormMode::Create, None, &[]);
        form.set_value("NombreUsuario", "Laura");
        // ApellidoUsuario obrigatório fica vazio: viaja como "" e o
        // servidor decide.
        form.set_value("Correo", "laura@renfi.com");
        form.set_value("Contrasena", "123456");
        form.set_value("IdRol", "2");
        form.set_value("Estado", "Activo");

        let payload = form.payload().unwrap();
        assert_eq!(payload["ApellidoUsuario"], "");
    }

    #[test]
    fn non_numeric_number_field_names_the_field() {
        let fincas = config("fincas");
        let mut form = FormModel::build(fincas, FormMode::Create, None, &[]);
        form.set_value("NombreFinca", "La Esperanza");
        form.set_value("Direccion", "Km 4");
        form.set_value("Precio", "mucho");

        let err = form.payload().unwrap_err();
        assert_eq!(
            err.user_message(),
            "El campo \"Precio por noche\" debe ser numérico."
        );
    }

    #[test]
    fn declared_fields_win_over_additional_and_selected() {
        let fincas = config("fincas");
        let origen = registro(json!({
            "IdFinca": 4,
            "NombreFinca": "Vieja",
            "Clima": "templado"
        }));

        let mut form = FormModel::build(fincas, FormMode::Edit, Some(origen), &[]);
        form.set_value("NombreFinca", "Renovada");
        form.additional_json = r#"{ "Clima": "frío", "NombreFinca": "Intrusa" }"#.to_string();

        let payload = form.payload().unwrap();
        // declarado vence o adicional, que vence o selecionado
        assert_eq!(payload["NombreFinca"], "Renovada");
        assert_eq!(payload["Clima"], "frío");
        // o id sintetizado volta pelo controle do formulário, como texto
        assert_eq!(payload["IdFinca"], "4");
    }

    #[test]
    fn additional_fields_must_be_a_json_object() {
        let fincas = config("fincas");
        let mut form = FormModel::build(fincas, FormMode::Create, None, &[]);
        form.set_value("NombreFinca", "x");
        form.set_value("Direccion", "y");

        form.additional_json = "[1, 2]".to_string();
        let err = form.payload().unwrap_err();
        assert_eq!(
            err.user_message(),
            "Los campos adicionales deben ser un objeto JSON (clave: valor)."
        );

        form.additional_json = "{ sin comillas }".to_string();
        let err = form.payload().unwrap_err();
        assert_eq!(
            err.user_message(),
            "JSON inválido en los campos adicionales. Verifica la sintaxis."
        );
    }

    #[test]
    fn freeform_mode_uses_the_raw_json_verbatim() {
        let config = Arc::new(ResourceConfig {
            id: "libre".to_string(),
            title: "Libre".to_string(),
            endpoint: "libre".to_string(),
            id_field: Some("IdLibre".to_string()),
            ..ResourceConfig::default()
        });

        let columnas = vec!["IdLibre".to_string(), "Nombre".to_string()];
        let mut form = FormModel::build(config.clone(), FormMode::Create, None, &columnas);

        // plantilla sintetizada a partir das colunas atuais
        let plantilla: Value = serde_json::from_str(form.raw_json.as_ref().unwrap()).unwrap();
        assert_eq!(plantilla, json!({ "IdLibre": "", "Nombre": "" }));

        form.raw_json = Some(r#"{ "IdLibre": 9, "Nombre": "Nueva" }"#.to_string());
        let payload = form.payload().unwrap();
        // id descartado também no modo cru, em criação
        assert_eq!(payload, json!({ "Nombre": "Nueva" }));

        form.raw_json = Some("{ roto".to_string());
        let err = form.payload().unwrap_err();
        assert_eq!(
            err.user_message(),
            "JSON inválido. Verifica la sintaxis y vuelve a intentar."
        );
    }

    #[test]
    fn edit_round_trip_repopulates_declared_fields() {
        let fincas = config("fincas");
        let mut form = FormModel::build(fincas.clone(), FormMode::Create, None, &[]);
        form.set_value("NombreFinca", "La Esperanza");
        form.set_value("Direccion", "Km 4 vía al mar");
        form.set_value("Precio", "250000");
        form.set_value("Capacidad", "12");

        let enviado = form.payload().unwrap();

        // O backend atribui o id e devolve o registro.
        let mut guardado = enviado.as_object().cloned().unwrap();
        guardado.insert("IdFinca".to_string(), json!(31));

        let reabierto = FormModel::build(fincas, FormMode::Edit, Some(guardado), &[]);
        assert_eq!(reabierto.value_of("NombreFinca"), Some("La Esperanza"));
        assert_eq!(reabierto.value_of("Direccion"), Some("Km 4 vía al mar"));
        assert_eq!(reabierto.value_of("Precio"), Some("250000"));
        assert_eq!(reabierto.value_of("Capacidad"), Some("12"));
        assert_eq!(reabierto.value_of("IdFinca"), Some("31"));
    }
}
