// src/models/reservation.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

// Modelos tipados do fluxo de reserva. Os registros crus do backend
// chegam com grafias heterogêneas; os mapeadores tolerantes vivem em
// `services::reservation` e produzem estes tipos.

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethod {
    pub id: String,
    pub name: String,
    pub allows_mixed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: Option<String>,
    pub reserva_id: Option<String>,
    pub method_id: Option<String>,
    pub method_name: Option<String>,
    pub amount: Option<Decimal>,
    pub paid_at: Option<String>,
    pub status: Option<String>,
    pub reference: Option<String>,
    pub mixed: Option<bool>,

    /// Registro cru de origem, preservado para diagnóstico.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: Option<String>,
    pub reserva_id: Option<String>,
    pub total: Option<Decimal>,
    pub issued_at: Option<String>,
    pub reserva_status: Option<String>,
    pub finca_name: Option<String>,
    pub municipality: Option<String>,
    pub nightly_price: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub id: String,
    pub finca_id: String,
    pub finca_name: Option<String>,
    pub municipality: Option<String>,
    pub reserved_at: Option<String>,

    // Datas de estadia já normalizadas. Registro com entrada
    // inanalisável não vira `Reservation` (é descartado no mapeador).
    pub entry_date: NaiveDate,
    pub exit_date: NaiveDate,

    pub nights: Option<i64>,
    pub guests: Option<i64>,
    pub amount: Option<Decimal>,
    pub status: Option<String>,
    pub user_email: Option<String>,
    pub user_name: Option<String>,
    pub user_document: Option<String>,
    pub user_id: Option<i64>,
    pub nightly_price: Option<Decimal>,
    pub created_at: Option<String>,
    pub payment: Option<Payment>,
    pub invoice: Option<Invoice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

impl Reservation {
    /// Reserva cancelada não ocupa datas no calendário.
    pub fn is_cancelled(&self) -> bool {
        self.status
            .as_deref()
            .map(|estado| estado.trim().to_lowercase().starts_with("cancel"))
            .unwrap_or(false)
    }
}

// --- Cargas de criação (lado cliente) ---

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReservation {
    pub finca_id: String,
    pub finca_name: Option<String>,
    pub municipality: Option<String>,
    /// `AAAA-MM-DD` ou um instante ISO completo.
    pub entry_date: String,
    pub exit_date: String,
    pub nights: i64,
    pub guests: i64,
    pub amount: Decimal,
    pub user_email: Option<String>,
    pub user_name: Option<String>,
    pub user_document: Option<String>,
    pub user_id: Option<i64>,
    pub nightly_price: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub amount: Decimal,
    pub method_id: Option<String>,
    pub method_name: String,
    pub mixed: Option<bool>,
    pub reference: Option<String>,
}

/// Entrada do orquestrador reserva -> fatura -> pagamento.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWithPayment {
    pub reservation: NewReservation,
    pub payment: PaymentRequest,
}

/// Resultado composto do orquestrador em caso de sucesso.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationWithPayment {
    pub reservation: Reservation,
    pub invoice: Invoice,
    pub payment: Payment,
}

// --- Rascunho de checkout ---

/// Estado produzido pela página de detalhe quando o usuário escolhe as
/// datas. Pertence exclusivamente ao passo de pagamento; sobrevive à
/// navegação via storage de sessão e é limpo ao concluir ou cancelar.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutDraft {
    pub finca_id: String,
    pub finca_name: String,
    pub municipality: Option<String>,
    pub nightly_price: Option<Decimal>,
    /// `AAAA-MM-DD`.
    pub entry_date: String,
    pub exit_date: String,
    #[validate(range(min = 1, max = 365, message = "El número de noches debe estar entre 1 y 365."))]
    pub nights: i64,
    #[validate(range(min = 1, message = "Debe haber al menos un huésped."))]
    pub guests: i64,
    pub total: Decimal,
    pub user_email: Option<String>,
    pub user_document: Option<String>,
    pub user_full_name: Option<String>,
    pub finca_image: Option<String>,
}

/// Resumo do pagamento mostrado no comprovante.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSummary {
    pub id: Option<String>,
    pub method_name: String,
    pub amount: Decimal,
    pub paid_at: String,
    pub reference: Option<String>,
    pub status: Option<String>,
}

/// Comprovante persistido após um checkout concluído.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResult {
    pub reservation: Reservation,
    pub payment: PaymentSummary,
    pub invoice: Option<Invoice>,
}
