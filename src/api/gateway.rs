// src/api/gateway.rs

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::common::error::AppError;

/// Opções de uma chamada: parâmetros de query (primitivos ou listas de
/// primitivos) e cabeçalhos extras. Entradas nulas são descartadas;
/// listas viram chaves repetidas.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub params: BTreeMap<String, Value>,
    pub headers: BTreeMap<String, String>,
}

impl RequestOptions {
    pub fn with_param(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }
}

/// Porta de saída única para a API do Renfi. Os motores dependem do
/// trait, nunca do cliente HTTP concreto, para que os testes injetem
/// um gateway em memória.
#[async_trait]
pub trait ApiGateway: Send + Sync {
    async fn list(&self, path: &str, options: Option<RequestOptions>) -> Result<Value, AppError>;
    async fn retrieve(&self, path: &str, options: Option<RequestOptions>)
        -> Result<Value, AppError>;
    async fn create(
        &self,
        path: &str,
        payload: &Value,
        options: Option<RequestOptions>,
    ) -> Result<Value, AppError>;
    async fn update(
        &self,
        path: &str,
        payload: &Value,
        options: Option<RequestOptions>,
    ) -> Result<Value, AppError>;
    async fn patch(
        &self,
        path: &str,
        payload: &Value,
        options: Option<RequestOptions>,
    ) -> Result<Value, AppError>;
    async fn delete(&self, path: &str, options: Option<RequestOptions>)
        -> Result<Value, AppError>;
}

/// Implementação HTTP sobre `reqwest`. Nenhuma outra parte da
/// biblioteca toca tipos do reqwest.
pub struct HttpApiGateway {
    base_url: String,
    client: reqwest::Client,
}

impl HttpApiGateway {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }

    /// URLs absolutas passam direto; caminhos relativos se juntam à
    /// base, descartando uma barra inicial duplicada.
    fn compose_url(&self, path: &str) -> String {
        if path.is_empty() {
            return self.base_url.clone();
        }

        let lower = path.to_ascii_lowercase();
        if lower.starts_with("http:") || lower.starts_with("https:") {
            return path.to_string();
        }

        let normalizado = path.strip_prefix('/').unwrap_or(path);
        format!("{}/{}", self.base_url, normalizado)
    }

    fn apply_options(
        &self,
        mut request: reqwest::RequestBuilder,
        options: Option<RequestOptions>,
    ) -> reqwest::RequestBuilder {
        let Some(options) = options else {
            return request;
        };

        let pairs = build_query_pairs(&options.params);
        if !pairs.is_empty() {
            request = request.query(&pairs);
        }

        for (nome, valor) in &options.headers {
            request = request.header(nome.as_str(), valor.as_str());
        }

        request
    }

    /// Funil único de execução: toda falha sai daqui como
    /// `AppError::Gateway` com a mensagem já normalizada. Sem retries;
    /// política de repetição é problema do chamador.
    async fn execute(&self, request: reqwest::RequestBuilder) -> Result<Value, AppError> {
        let response = request
            .send()
            .await
            .map_err(|e| AppError::Gateway(normalize_failure(None, Some(&e.to_string()))))?;

        let status = response.status();
        if !status.is_success() {
            let transporte = format!("Error HTTP {}", status.as_u16());
            let cuerpo: Option<Value> = response.json().await.ok();
            return Err(AppError::Gateway(normalize_failure(
                cuerpo.as_ref(),
                Some(&transporte),
            )));
        }

        let texto = response
            .text()
            .await
            .map_err(|e| AppError::Gateway(normalize_failure(None, Some(&e.to_string()))))?;

        if texto.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&texto)
            .map_err(|e| AppError::Gateway(normalize_failure(None, Some(&e.to_string()))))
    }
}

#[async_trait]
impl ApiGateway for HttpApiGateway {
    async fn list(&self, path: &str, options: Option<RequestOptions>) -> Result<Value, AppError> {
        let request = self.client.get(self.compose_url(path));
        self.execute(self.apply_options(request, options)).await
    }

    async fn retrieve(
        &self,
        path: &str,
        options: Option<RequestOptions>,
    ) -> Result<Value, AppError> {
        let request = self.client.get(self.compose_url(path));
        self.execute(self.apply_options(request, options)).await
    }

    async fn create(
        &self,
        path: &str,
        payload: &Value,
        options: Option<RequestOptions>,
    ) -> Result<Value, AppError> {
        let request = self.client.post(self.compose_url(path)).json(payload);
        self.execute(self.apply_options(request, options)).await
    }

    async fn update(
        &self,
        path: &str,
        payload: &Value,
        options: Option<RequestOptions>,
    ) -> Result<Value, AppError> {
        let request = self.client.put(self.compose_url(path)).json(payload);
        self.execute(self.apply_options(request, options)).await
    }

    async fn patch(
        &self,
        path: &str,
        payload: &Value,
        options: Option<RequestOptions>,
    ) -> Result<Value, AppError> {
        let request = self.client.patch(self.compose_url(path)).json(payload);
        self.execute(self.apply_options(request, options)).await
    }

    async fn delete(&self, path: &str, options: Option<RequestOptions>) -> Result<Value, AppError> {
        let request = self.client.delete(self.compose_url(path));
        self.execute(self.apply_options(request, options)).await
    }
}

/// Expande o mapa de parâmetros em pares chave/valor já em texto.
fn build_query_pairs(params: &BTreeMap<String, Value>) -> Vec<(String, String)> {
    let mut pares = Vec::new();

    for (chave, valor) in params {
        match valor {
            Value::Null => {}
            Value::Array(itens) => {
                for item in itens {
                    if !item.is_null() {
                        pares.push((chave.clone(), stringify_param(item)));
                    }
                }
            }
            outro => pares.push((chave.clone(), stringify_param(outro))),
        }
    }

    pares
}

fn stringify_param(valor: &Value) -> String {
    match valor {
        Value::String(texto) => texto.clone(),
        outro => outro.to_string(),
    }
}

/// Percent-encoding de um segmento de caminho (equivalente ao
/// `encodeURIComponent` das rotas originais). Os ids reais são
/// numéricos; isto cobre o resto.
pub fn encode_path_segment(valor: &str) -> String {
    let mut saida = String::with_capacity(valor.len());
    for byte in valor.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                saida.push(byte as char);
            }
            otro => saida.push_str(&format!("%{otro:02X}")),
        }
    }
    saida
}

/// Normalização de falha, em ordem de prioridade: campo `message` do
/// corpo de erro, campo `error` do corpo, mensagem de transporte, e o
/// genérico por último. É a única forma de erro que sobe deste módulo.
pub fn normalize_failure(cuerpo: Option<&Value>, transporte: Option<&str>) -> String {
    if let Some(cuerpo) = cuerpo {
        for campo in ["message", "error"] {
            if let Some(texto) = cuerpo.get(campo).and_then(Value::as_str) {
                if !texto.trim().is_empty() {
                    return texto.to_string();
                }
            }
        }
    }

    if let Some(mensaje) = transporte {
        if !mensaje.trim().is_empty() {
            return mensaje.to_string();
        }
    }

    "Error desconocido en la solicitud.".to_string()
}
