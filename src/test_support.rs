// src/test_support.rs
//
// Gateway em memória para os testes de unidade: respostas roteirizadas
// por "MÉTODO caminho" e registro de toda chamada feita.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use crate::api::gateway::{ApiGateway, RequestOptions};
use crate::common::error::AppError;

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: String,
    pub path: String,
    pub payload: Option<Value>,
    pub options: Option<RequestOptions>,
}

#[derive(Default)]
pub struct FakeGateway {
    responses: Mutex<HashMap<String, VecDeque<Result<Value, String>>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Programa uma resposta para `"LIST finca"`, `"CREATE reserva"`,
    /// etc. Respostas na fila são consumidas em ordem; a última se
    /// repete para chamadas subsequentes.
    pub fn on(&self, clave: &str, resultado: Result<Value, &str>) {
        let mut responses = self.responses.lock().unwrap();
        responses
            .entry(clave.to_string())
            .or_default()
            .push_back(resultado.map_err(|m| m.to_string()));
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, method: &str, path: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.method == method && c.path == path)
            .count()
    }

    fn respond(
        &self,
        method: &str,
        path: &str,
        payload: Option<&Value>,
        options: Option<RequestOptions>,
    ) -> Result<Value, AppError> {
        self.calls.lock().unwrap().push(RecordedCall {
            method: method.to_string(),
            path: path.to_string(),
            payload: payload.cloned(),
            options,
        });

        let clave = format!("{method} {path}");
        let mut responses = self.responses.lock().unwrap();
        let Some(fila) = responses.get_mut(&clave) else {
            // Sem roteiro: listagens devolvem coleção vazia, mutações
            // um objeto vazio.
            return Ok(if method == "LIST" || method == "RETRIEVE" {
                json!([])
            } else {
                json!({})
            });
        };

        let resultado = if fila.len() > 1 {
            fila.pop_front().unwrap()
        } else {
            fila.front().cloned().unwrap_or(Ok(Value::Null))
        };

        resultado.map_err(AppError::Gateway)
    }
}

#[async_trait]
impl ApiGateway for FakeGateway {
    async fn list(&self, path: &str, options: Option<RequestOptions>) -> Result<Value, AppError> {
        self.respond("LIST", path, None, options)
    }

    async fn retrieve(
        &self,
        path: &str,
        options: Option<RequestOptions>,
    ) -> Result<Value, AppError> {
        self.respond("RETRIEVE", path, None, options)
    }

    async fn create(
        &self,
        path: &str,
        payload: &Value,
        options: Option<RequestOptions>,
    ) -> Result<Value, AppError> {
        self.respond("CREATE", path, Some(payload), options)
    }

    async fn update(
        &self,
        path: &str,
        payload: &Value,
        options: Option<RequestOptions>,
    ) -> Result<Value, AppError> {
        self.respond("UPDATE", path, Some(payload), options)
    }

    async fn patch(
        &self,
        path: &str,
        payload: &Value,
        options: Option<RequestOptions>,
    ) -> Result<Value, AppError> {
        self.respond("PATCH", path, Some(payload), options)
    }

    async fn delete(&self, path: &str, options: Option<RequestOptions>) -> Result<Value, AppError> {
        self.respond("DELETE", path, None, options)
    }
}
