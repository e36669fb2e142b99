// src/lib.rs

//! renfi-core — núcleo headless do front-end de reservas do Renfi.
//!
//! Aqui vivem o motor genérico de administração dirigido por esquema,
//! o cálculo de disponibilidade com a grade de calendário e o fluxo
//! transacional reserva -> fatura -> pagamento com compensação. O
//! backend HTTP é um colaborador externo alcançado só pelo
//! [`api::gateway::ApiGateway`]; a camada visual fica no host.

// Declaração dos nossos módulos
pub mod api;
pub mod common;
pub mod config;
pub mod models;
pub mod services;

#[cfg(test)]
pub(crate) mod test_support;

// Reexportações principais
pub use api::gateway::{ApiGateway, HttpApiGateway, RequestOptions};
pub use common::error::AppError;
pub use common::storage::{ClientStorage, MemoryStorage};
pub use config::{ApiConfig, AppState};
pub use models::reservation::{
    CheckoutDraft, CheckoutResult, CreateWithPayment, Invoice, NewReservation, Payment,
    PaymentMethod, PaymentRequest, PaymentSummary, Reservation, ReservationWithPayment,
};
pub use models::resource::{FieldConfig, FieldType, Record, ReportConfig, ResourceConfig};
pub use models::session::SessionUser;
pub use services::auth_state::AuthState;
pub use services::calendar::{CalendarDay, CalendarMonth, CalendarView, DayState};
pub use services::checkout::CheckoutService;
pub use services::crud::{CrudEngine, ReportState, ScrollLock};
pub use services::form::{FormMode, FormModel};
pub use services::registry::ResourceRegistry;
pub use services::reservation::{ReservationFilter, ReservationService};
pub use services::select_options::SelectOptionsCache;

/// Inicializa o logger. O host chama uma vez, na subida.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();
}
