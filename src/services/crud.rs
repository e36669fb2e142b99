// src/services/crud.rs
//
// O motor genérico de administração: um único motor serve os N recursos
// do registro, parametrizado pelo esquema — despacho dirigido por dado,
// sem um tipo por recurso.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::api::gateway::{ApiGateway, RequestOptions};
use crate::common::error::AppError;
use crate::models::resource::{Record, ReportConfig, ResourceConfig, SelectOption};
use crate::services::columns::derive_columns;
use crate::services::crypto;
use crate::services::fields::{self, normalize_collection};
use crate::services::form::{FormMode, FormModel};
use crate::services::select_options::SelectOptionsCache;

/// Trava global de rolagem do corpo da página enquanto um diálogo está
/// aberto. Todo caminho de saída do diálogo precisa soltá-la.
#[derive(Default)]
pub struct ScrollLock(AtomicBool);

impl ScrollLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn unlock(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_locked(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Acompanhamento independente de cada relatório, chaveado pelo
/// endpoint.
#[derive(Debug, Clone, Default)]
pub struct ReportState {
    pub loading: bool,
    pub error: Option<String>,
    pub data: Option<Value>,
}

struct PendingDelete {
    record: Record,
    id: Value,
}

pub struct CrudEngine {
    config: Arc<ResourceConfig>,
    gateway: Arc<dyn ApiGateway>,
    options_cache: Arc<SelectOptionsCache>,
    scroll_lock: Arc<ScrollLock>,

    pub records: Vec<Record>,
    pub columns: Vec<String>,
    pub loading: bool,
    /// Erro ativo do escopo da listagem (string local, nunca exceção).
    pub error: Option<String>,

    pub form: Option<FormModel>,
    pub form_error: Option<String>,

    pub reports: HashMap<String, ReportState>,

    pending_delete: Option<PendingDelete>,
}

impl CrudEngine {
    pub fn new(
        config: Arc<ResourceConfig>,
        gateway: Arc<dyn ApiGateway>,
        options_cache: Arc<SelectOptionsCache>,
        scroll_lock: Arc<ScrollLock>,
    ) -> Self {
        Self {
            config,
            gateway,
            options_cache,
            scroll_lock,
            records: Vec::new(),
            columns: Vec::new(),
            loading: false,
            error: None,
            form: None,
            form_error: None,
            reports: HashMap::new(),
            pending_delete: None,
        }
    }

    pub fn config(&self) -> &ResourceConfig {
        &self.config
    }

    /// Recarga completa: registros e relatórios. As duas cargas são
    /// independentes; cada uma falha sozinha.
    pub async fn reload(&mut self) {
        self.load_records().await;
        self.load_reports().await;
    }

    pub async fn load_records(&mut self) {
        self.loading = true;
        self.error = None;

        match self.gateway.list(&self.config.endpoint, None).await {
            Ok(respuesta) => {
                self.records = normalize_collection(&respuesta)
                    .into_iter()
                    .filter_map(|item| item.as_object().cloned())
                    .collect();
                self.columns = derive_columns(&self.config, &self.records);
            }
            Err(e) => {
                self.error = Some(e.user_message());
                self.records.clear();
            }
        }

        self.loading = false;
    }

    pub async fn load_reports(&mut self) {
        if self.config.reports.is_empty() {
            self.reports.clear();
            return;
        }

        let reportes = self.config.reports.clone();
        for reporte in reportes {
            self.reports.insert(
                reporte.endpoint.clone(),
                ReportState { loading: true, error: None, data: None },
            );

            let estado = match self.gateway.list(&reporte.endpoint, None).await {
                Ok(datos) => ReportState { loading: false, error: None, data: Some(datos) },
                Err(e) => ReportState {
                    loading: false,
                    error: Some(e.user_message()),
                    data: None,
                },
            };
            self.reports.insert(reporte.endpoint.clone(), estado);
        }
    }

    pub fn report_state(&self, reporte: &ReportConfig) -> ReportState {
        self.reports.get(&reporte.endpoint).cloned().unwrap_or(ReportState {
            loading: false,
            error: Some("No hay datos para este reporte.".to_string()),
            data: None,
        })
    }

    /// Colunas de um relatório: as declaradas, senão a união das chaves
    /// das 10 primeiras linhas.
    pub fn report_columns(&self, reporte: &ReportConfig) -> Vec<String> {
        if let Some(declaradas) = &reporte.columns {
            if !declaradas.is_empty() {
                return declaradas.clone();
            }
        }

        let estado = self.report_state(reporte);
        let Some(Value::Array(filas)) = estado.data else {
            return Vec::new();
        };

        let mut colunas: Vec<String> = Vec::new();
        for fila in filas.iter().take(10) {
            if let Some(objeto) = fila.as_object() {
                for clave in objeto.keys() {
                    if !colunas.contains(clave) {
                        colunas.push(clave.clone());
                    }
                }
            }
        }
        colunas
    }

    /// Valor lógico de um campo num registro, resolvendo aliases.
    pub fn field_value<'a>(&self, registro: &'a Record, campo: &str) -> Option<&'a Value> {
        fields::resolve_field_value(registro, campo, self.config.aliases_for(campo))
    }

    // --- diálogo de criação/edição ---

    pub async fn open_create(&mut self) {
        let plantilla = self
            .config
            .sample_payload
            .clone()
            .unwrap_or_else(|| template_from_current(&self.columns));

        self.form = Some(FormModel::build(
            self.config.clone(),
            FormMode::Create,
            Some(plantilla),
            &self.columns,
        ));
        self.form_error = None;
        self.scroll_lock.lock();
        self.load_all_select_options().await;
    }

    pub async fn open_edit(&mut self, registro: Record) {
        self.form = Some(FormModel::build(
            self.config.clone(),
            FormMode::Edit,
            Some(registro),
            &self.columns,
        ));
        self.form_error = None;
        self.scroll_lock.lock();
        self.load_all_select_options().await;
    }

    pub fn close_form(&mut self) {
        self.form = None;
        self.form_error = None;
        self.scroll_lock.unlock();
    }

    /// Submete o diálogo aberto. Sucesso fecha e recarrega registros e
    /// relatórios; falha deixa o diálogo aberto com a mensagem no lugar.
    pub async fn submit(&mut self) -> bool {
        let Some(form) = &self.form else {
            return false;
        };

        self.form_error = None;

        let mut payload = match form.payload() {
            Ok(payload) => payload,
            Err(e) => {
                self.form_error = Some(e.user_message());
                return false;
            }
        };

        // Recurso `usuarios`: uma senha presente vira digest irreversível
        // antes de sair; o texto plano nunca é transmitido.
        if self.config.id == "usuarios" {
            if let Err(e) = digest_password_field(&mut payload).await {
                self.form_error = Some(e.user_message());
                return false;
            }
        }

        let resultado = match form.mode {
            FormMode::Create => {
                let path = self
                    .config
                    .create_path
                    .clone()
                    .unwrap_or_else(|| self.config.endpoint.clone());
                self.gateway.create(&path, &payload, None).await
            }
            FormMode::Edit => {
                let registro_base = form
                    .selected()
                    .map(|registro| Value::Object(registro.clone()))
                    .unwrap_or_else(|| payload.clone());
                let Some(id) = self.resolve_id_value(&registro_base) else {
                    self.form_error =
                        Some("No fue posible determinar la acción a ejecutar.".to_string());
                    return false;
                };
                let base = self
                    .config
                    .update_path
                    .clone()
                    .unwrap_or_else(|| self.config.endpoint.clone());
                let path = resolve_path_with_id(&base, &stringify_id(&id));
                self.gateway.update(&path, &payload, None).await
            }
        };

        match resultado {
            Ok(_) => {
                self.close_form();
                self.load_records().await;
                self.load_reports().await;
                true
            }
            Err(e) => {
                self.form_error = Some(e.user_message());
                false
            }
        }
    }

    // --- exclusão com confirmação ---

    /// Pede a exclusão de um registro. Sem identificador resolvível não
    /// há chamada de rede: o erro fica no escopo e nada mais acontece.
    pub fn request_delete(&mut self, registro: Record) {
        let Some(id) = self.resolve_id_value(&Value::Object(registro.clone())) else {
            self.error = Some(AppError::MissingIdentifier.user_message());
            return;
        };

        self.pending_delete = Some(PendingDelete { record: registro, id });
    }

    pub fn delete_pending(&self) -> bool {
        self.pending_delete.is_some()
    }

    /// Registro exibido no modal de confirmação.
    pub fn pending_record(&self) -> Option<&Record> {
        self.pending_delete.as_ref().map(|pendiente| &pendiente.record)
    }

    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
    }

    /// Confirmação explícita do modal; só aqui a chamada sai.
    pub async fn confirm_delete(&mut self) {
        let Some(pendiente) = self.pending_delete.take() else {
            return;
        };

        self.loading = true;
        let id = stringify_id(&pendiente.id);

        let resultado = if let Some(parametro) = &self.config.delete_query_param {
            let path = self
                .config
                .delete_path
                .clone()
                .unwrap_or_else(|| self.config.endpoint.clone());
            let options = RequestOptions::default().with_param(parametro, pendiente.id.clone());
            self.gateway.delete(&path, Some(options)).await
        } else {
            let base = self
                .config
                .delete_path
                .clone()
                .unwrap_or_else(|| self.config.endpoint.clone());
            let path = resolve_path_with_id(&base, &id);
            self.gateway.delete(&path, None).await
        };

        self.loading = false;

        match resultado {
            Ok(_) => {
                self.load_records().await;
                self.load_reports().await;
            }
            Err(e) => {
                self.error = Some(e.user_message());
            }
        }
    }

    // --- opções de select ---

    pub fn select_options(&self, key: &str) -> Vec<SelectOption> {
        let Some(form) = &self.form else {
            return Vec::new();
        };
        match form.fields.iter().find(|campo| campo.config.key == key) {
            Some(campo) => self.options_cache.options_for(&campo.config),
            None => Vec::new(),
        }
    }

    async fn load_all_select_options(&self) {
        let Some(form) = &self.form else {
            return;
        };

        for campo in &form.fields {
            if campo.config.select_endpoint.is_some() {
                self.options_cache
                    .ensure_loaded(self.gateway.as_ref(), &campo.config)
                    .await;
            }
        }
    }

    // --- identificadores e rotas ---

    /// Identificador do registro: o campo do esquema, senão os
    /// genéricos `id`/`Id`/`ID`. Nulo ou texto vazio não servem.
    fn resolve_id_value(&self, registro: &Value) -> Option<Value> {
        let objeto = registro.as_object()?;
        let principal = self.config.id_field.as_deref().unwrap_or("id");

        for clave in [principal, "id", "Id", "ID"] {
            match objeto.get(clave) {
                Some(Value::Null) | None => continue,
                Some(Value::String(texto)) if texto.is_empty() => continue,
                Some(valor) => return Some(valor.clone()),
            }
        }

        None
    }
}

impl Drop for CrudEngine {
    fn drop(&mut self) {
        // Teardown com o diálogo aberto também devolve a rolagem.
        if self.form.is_some() {
            self.scroll_lock.unlock();
        }
    }
}

fn template_from_current(columns: &[String]) -> Record {
    if columns.is_empty() {
        return serde_json::json!({ "campo": "valor" })
            .as_object()
            .cloned()
            .unwrap();
    }
    columns
        .iter()
        .map(|columna| (columna.clone(), Value::String(String::new())))
        .collect()
}

async fn digest_password_field(payload: &mut Value) -> Result<(), AppError> {
    let Some(objeto) = payload.as_object_mut() else {
        return Ok(());
    };

    let plano = match objeto.get("Contrasena") {
        Some(Value::String(texto)) if !texto.is_empty() => texto.clone(),
        Some(Value::Number(numero)) => numero.to_string(),
        _ => return Ok(()),
    };

    let digest = crypto::sha512_hex(&plano).await?;
    objeto.insert("Contrasena".to_string(), Value::String(digest));
    Ok(())
}

fn stringify_id(id: &Value) -> String {
    match id {
        Value::String(texto) => texto.clone(),
        otro => otro.to_string(),
    }
}

/// Substitui o marcador `:id` quando presente; senão anexa o id como
/// segmento, depois de aparar uma barra final.
fn resolve_path_with_id(base: &str, id: &str) -> String {
    let codificado = crate::api::gateway::encode_path_segment(id);
    if base.contains(":id") {
        return base.replace(":id", &codificado);
    }

    let limpio = base.strip_suffix('/').unwrap_or(base);
    format!("{limpio}/{codificado}")
}
