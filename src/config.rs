// src/config.rs

use std::env;
use std::sync::Arc;

use crate::api::gateway::{ApiGateway, HttpApiGateway};
use crate::common::storage::{ClientStorage, MemoryStorage};
use crate::services::auth_state::AuthState;
use crate::services::checkout::CheckoutService;
use crate::services::crud::{CrudEngine, ScrollLock};
use crate::services::registry::ResourceRegistry;
use crate::services::reservation::ReservationService;
use crate::services::select_options::SelectOptionsCache;

/// Configuração lida do ambiente (com `.env` opcional via dotenvy).
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
}

impl ApiConfig {
    pub const DEFAULT_BASE_URL: &'static str = "http://localhost:3000/api";

    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let base_url = env::var("RENFI_API_BASE_URL")
            .unwrap_or_else(|_| Self::DEFAULT_BASE_URL.to_string());

        Self { base_url }
    }
}

/// Estado compartilhado da aplicação: o gateway, o registro de
/// recursos e os singletons de sessão/checkout/cache, montados uma vez
/// e injetados nos motores.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ResourceRegistry>,
    pub gateway: Arc<dyn ApiGateway>,
    pub options_cache: Arc<SelectOptionsCache>,
    pub scroll_lock: Arc<ScrollLock>,
    pub auth: Arc<AuthState>,
    pub checkout: Arc<CheckoutService>,
    pub reservations: Arc<ReservationService>,
}

impl AppState {
    /// Monta o estado contra a API configurada no ambiente.
    pub fn from_env() -> Self {
        let config = ApiConfig::from_env();
        tracing::info!("API do Renfi em {}", config.base_url);
        Self::with_gateway(Arc::new(HttpApiGateway::new(config.base_url)))
    }

    /// Monta o gráfico de dependências sobre um gateway arbitrário (os
    /// testes passam um gateway em memória por aqui).
    pub fn with_gateway(gateway: Arc<dyn ApiGateway>) -> Self {
        let session_storage: Arc<dyn ClientStorage> = Arc::new(MemoryStorage::new());
        let local_storage: Arc<dyn ClientStorage> = Arc::new(MemoryStorage::new());

        Self {
            registry: Arc::new(ResourceRegistry::builtin()),
            options_cache: Arc::new(SelectOptionsCache::new()),
            scroll_lock: Arc::new(ScrollLock::new()),
            auth: Arc::new(AuthState::new(session_storage.clone(), local_storage)),
            checkout: Arc::new(CheckoutService::new(session_storage)),
            reservations: Arc::new(ReservationService::new(gateway.clone())),
            gateway,
        }
    }

    /// Um motor de administração para o recurso pedido, compartilhando
    /// gateway, cache de opções e trava de rolagem.
    pub fn crud_engine(&self, resource_id: &str) -> Option<CrudEngine> {
        let config = self.registry.get(resource_id)?.clone();
        Some(CrudEngine::new(
            Arc::new(config),
            self.gateway.clone(),
            self.options_cache.clone(),
            self.scroll_lock.clone(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeGateway;

    #[test]
    fn engines_exist_for_every_registered_resource() {
        let state = AppState::with_gateway(Arc::new(FakeGateway::new()));
        for id in state.registry.ids() {
            assert!(state.crud_engine(id).is_some(), "sin motor para {id}");
        }
        assert!(state.crud_engine("desconocido").is_none());
    }
}
