// src/services/checkout.rs

use std::sync::Arc;

use crate::common::storage::ClientStorage;
use crate::models::reservation::{CheckoutDraft, CheckoutResult};

const DRAFT_KEY: &str = "renfi_checkout_draft";
const RESULT_KEY: &str = "renfi_checkout_result";

/// Estado de checkout com escopo de sessão: no máximo dois blobs — o
/// rascunho em andamento e o último comprovante. Só os fluxos donos
/// limpam as chaves; nunca um timer.
pub struct CheckoutService {
    storage: Arc<dyn ClientStorage>,
}

impl CheckoutService {
    pub fn new(storage: Arc<dyn ClientStorage>) -> Self {
        Self { storage }
    }

    /// Guarda o rascunho para que sobreviva à navegação até a pasarela.
    pub fn set_draft(&self, draft: &CheckoutDraft) {
        self.write(DRAFT_KEY, draft);
    }

    pub fn draft(&self) -> Option<CheckoutDraft> {
        self.read(DRAFT_KEY)
    }

    /// Limpo ao concluir o pagamento ou ao cancelar explicitamente.
    pub fn clear_draft(&self) {
        self.storage.remove(DRAFT_KEY);
    }

    pub fn set_result(&self, result: &CheckoutResult) {
        self.write(RESULT_KEY, result);
    }

    /// Lê e limpa: o comprovante é de consumo único.
    pub fn consume_result(&self) -> Option<CheckoutResult> {
        let resultado = self.read(RESULT_KEY);
        self.storage.remove(RESULT_KEY);
        resultado
    }

    fn read<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        let crudo = self.storage.get(key)?;
        match serde_json::from_str(&crudo) {
            Ok(valor) => Some(valor),
            Err(e) => {
                // Blob corrompido degrada para "não há nada", sem erro.
                tracing::warn!(key, "blob de checkout ilegível: {e}");
                None
            }
        }
    }

    fn write<T: serde::Serialize>(&self, key: &str, valor: &T) {
        match serde_json::to_string(valor) {
            Ok(texto) => self.storage.set(key, &texto),
            Err(e) => tracing::warn!(key, "falha serializando blob de checkout: {e}"),
        }
    }
}
