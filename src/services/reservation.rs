// src/services/reservation.rs
//
// Serviço de reservas: mapeadores tolerantes sobre registros crus,
// cálculo das datas ocupadas de uma finca e o fluxo transacional
// reserva -> fatura -> pagamento com compensação de melhor esforço.
// A sequência é estritamente serial: a fatura só começa quando a
// reserva resolve, o pagamento só quando a fatura resolve.

use chrono::{DateTime, Duration, NaiveDate, SecondsFormat, Utc};
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::sync::Arc;
use validator::Validate;

use crate::api::gateway::{encode_path_segment, ApiGateway, RequestOptions};
use crate::common::error::AppError;
use crate::models::reservation::{
    CheckoutDraft, CreateWithPayment, Invoice, NewReservation, Payment, PaymentMethod,
    PaymentRequest, Reservation, ReservationWithPayment,
};
use crate::services::fields::{
    normalize_collection, pick_bool, pick_decimal, pick_i64, pick_number, pick_string,
};

const CLAVES_ID_RESERVA: [&str; 4] = ["IdReserva", "idReserva", "Id", "id"];
const CLAVES_ID_FACTURA: [&str; 4] = ["IdFactura", "idFactura", "Id", "id"];
const CLAVES_ID_PAGO: [&str; 4] = ["IdPago", "idPago", "Id", "id"];

/// Teto de expansão por reserva, para limitar o custo de uma faixa
/// corrompida.
const MAX_NOCHES_EXPANSION: i64 = 365;

#[derive(Debug, Clone, Default)]
pub struct ReservationFilter {
    pub email: Option<String>,
    pub document: Option<String>,
    pub user_id: Option<i64>,
    pub finca_id: Option<String>,
}

impl ReservationFilter {
    pub fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.document.is_none()
            && self.user_id.is_none()
            && self.finca_id.is_none()
    }
}

pub struct ReservationService {
    gateway: Arc<dyn ApiGateway>,
}

impl ReservationService {
    pub fn new(gateway: Arc<dyn ApiGateway>) -> Self {
        Self { gateway }
    }

    /// Métodos de pago disponíveis. Falha degrada para lista vazia.
    pub async fn payment_methods(&self) -> Vec<PaymentMethod> {
        match self.gateway.list("metododepago", None).await {
            Ok(respuesta) => normalize_collection(&respuesta)
                .iter()
                .map(map_payment_method)
                .collect(),
            Err(e) => {
                tracing::warn!("falha listando métodos de pago: {}", e.user_message());
                Vec::new()
            }
        }
    }

    /// Lista reservas, aplicando os filtros tanto na query quanto
    /// localmente (o backend nem sempre os honra). Registros com datas
    /// inanalisáveis são descartados com log, nunca abortam a lista.
    pub async fn list_reservations(&self, filtros: Option<&ReservationFilter>) -> Vec<Reservation> {
        let options = filtros.and_then(build_filter_options);

        match self.gateway.list("reserva", options).await {
            Ok(respuesta) => {
                let mapeadas: Vec<Reservation> = normalize_collection(&respuesta)
                    .iter()
                    .filter_map(|item| match map_reservation(item) {
                        Some(reserva) => Some(reserva),
                        None => {
                            tracing::warn!("reserva descartada: registro sem datas analisáveis");
                            None
                        }
                    })
                    .collect();
                apply_local_filters(mapeadas, filtros)
            }
            Err(e) => {
                tracing::warn!("falha listando reservas: {}", e.user_message());
                Vec::new()
            }
        }
    }

    /// Reservas de um usuário, mais recentes primeiro. Com documento há
    /// endpoint dedicado; senão cai na listagem filtrada.
    pub async fn reservations_for_user(
        &self,
        correo: Option<&str>,
        documento: Option<&str>,
        id_usuario: Option<i64>,
    ) -> Vec<Reservation> {
        let mut reservas = match documento.filter(|doc| !doc.trim().is_empty()) {
            Some(doc) => {
                let path = format!("reserva/usuario/{}", encode_path_segment(doc.trim()));
                match self.gateway.list(&path, None).await {
                    Ok(respuesta) => normalize_collection(&respuesta)
                        .iter()
                        .filter_map(map_reservation)
                        .collect(),
                    Err(e) => {
                        tracing::warn!("falha buscando reservas por documento: {}", e.user_message());
                        Vec::new()
                    }
                }
            }
            None => {
                let filtro = ReservationFilter {
                    email: correo.map(str::to_string),
                    user_id: id_usuario,
                    ..ReservationFilter::default()
                };
                if filtro.is_empty() {
                    return Vec::new();
                }
                self.list_reservations(Some(&filtro)).await
            }
        };

        reservas.sort_by_key(|reserva| {
            std::cmp::Reverse(
                reserva
                    .reserved_at
                    .as_deref()
                    .or(reserva.created_at.as_deref())
                    .and_then(parse_instant)
                    .unwrap_or(DateTime::<Utc>::MIN_UTC),
            )
        });
        reservas
    }

    /// União das noites `[entrada, salida)` de toda reserva não
    /// cancelada da finca, reconstruída por completo a cada consulta.
    pub async fn occupied_dates(&self, finca_id: &str) -> BTreeSet<NaiveDate> {
        let recortado = finca_id.trim();
        if recortado.is_empty() || recortado == "undefined" || recortado == "null" {
            return BTreeSet::new();
        }

        let filtro = ReservationFilter {
            finca_id: Some(recortado.to_string()),
            ..ReservationFilter::default()
        };

        let consulta = self.list_reservations(Some(&filtro));
        let reservas =
            match tokio::time::timeout(std::time::Duration::from_secs(10), consulta).await {
                Ok(reservas) => reservas,
                Err(_) => {
                    tracing::warn!(finca_id = recortado, "timeout consultando disponibilidade");
                    return BTreeSet::new();
                }
            };

        let mut fechas = BTreeSet::new();
        for reserva in &reservas {
            if reserva.is_cancelled() {
                continue;
            }
            fechas.extend(expand_range(reserva));
        }
        fechas
    }

    /// Passo 2 do fluxo: cria a reserva. Falha aqui é terminal — nada
    /// foi criado, nada há para compensar.
    pub async fn create_reservation(
        &self,
        payload: &NewReservation,
    ) -> Result<Reservation, AppError> {
        let entrada_dia = parse_day(&payload.entry_date)
            .ok_or_else(|| AppError::Form("Selecciona una fecha de entrada válida.".to_string()))?;
        let salida_dia = parse_day(&payload.exit_date).unwrap_or(entrada_dia);

        if salida_dia <= entrada_dia {
            return Err(AppError::Form(
                "La fecha de salida debe ser posterior a la fecha de entrada".to_string(),
            ));
        }

        let ahora = now_iso();
        let mut api_payload = Map::new();
        api_payload.insert("IdFinca".to_string(), number_or_null(&payload.finca_id));
        if let Some(documento) = &payload.user_document {
            api_payload.insert("NumeroDocumentoUsuario".to_string(), number_or_null(documento));
        }
        api_payload.insert("FechaReserva".to_string(), Value::String(ahora.clone()));
        api_payload.insert(
            "FechaEntrada".to_string(),
            Value::String(to_iso_instant(&payload.entry_date)),
        );
        api_payload.insert(
            "FechaSalida".to_string(),
            Value::String(to_iso_instant(&payload.exit_date)),
        );
        api_payload.insert("MontoReserva".to_string(), decimal_value(payload.amount));
        api_payload.insert("Estado".to_string(), Value::String("Activa".to_string()));

        let respuesta = self
            .gateway
            .create("reserva", &Value::Object(compact(api_payload)), None)
            .await?;

        let id_reserva = extract_id_from_response(&respuesta, &CLAVES_ID_RESERVA).ok_or_else(|| {
            AppError::Gateway(
                "El backend no devolvió un IdReserva válido. Verifica SP_RegistrarReserva."
                    .to_string(),
            )
        })?;

        Ok(Reservation {
            id: id_reserva.to_string(),
            finca_id: payload.finca_id.clone(),
            finca_name: payload.finca_name.clone(),
            municipality: payload.municipality.clone(),
            reserved_at: Some(ahora.clone()),
            entry_date: entrada_dia,
            exit_date: salida_dia,
            nights: Some(payload.nights),
            guests: Some(payload.guests),
            amount: Some(payload.amount),
            status: Some("Activa".to_string()),
            user_email: payload.user_email.clone(),
            user_name: payload.user_name.clone(),
            user_document: payload.user_document.clone(),
            user_id: payload.user_id,
            nightly_price: payload.nightly_price,
            created_at: Some(ahora),
            payment: None,
            invoice: None,
            meta: Some(respuesta),
        })
    }

    /// O fluxo completo: reserva -> fatura -> pagamento, com cancelamento
    /// compensatório da reserva se qualquer passo posterior falhar. Não
    /// há atomicidade de verdade — a correção depende da compensação
    /// dirigida pelo cliente.
    pub async fn create_with_payment(
        &self,
        input: &CreateWithPayment,
    ) -> Result<ReservationWithPayment, AppError> {
        // Validação local do método de pago, antes de qualquer rede.
        let metodo_id = input
            .payment
            .method_id
            .as_deref()
            .and_then(parse_positive_id)
            .ok_or_else(|| {
                AppError::Form(format!(
                    "ID de método de pago inválido: {}",
                    input.payment.method_id.as_deref().unwrap_or("(vacío)")
                ))
            })?;

        // Passo 1: reserva. Sem compensação em caso de falha.
        let reserva = self
            .create_reservation(&input.reservation)
            .await
            .map_err(|e| prefixed("Error al crear la reserva: ", e))?;
        let id_reserva: i64 = reserva.id.parse().map_err(|_| {
            AppError::Gateway(format!("ID de reserva inválido: {}", reserva.id))
        })?;

        // Passo 2: fatura. A partir daqui existe uma reserva que não
        // pode ficar órfã.
        let fecha_factura = now_iso();
        let mut factura_payload = Map::new();
        factura_payload.insert("IdReserva".to_string(), Value::from(id_reserva));
        factura_payload.insert("Total".to_string(), decimal_value(input.payment.amount));
        factura_payload.insert("FechaFactura".to_string(), Value::String(fecha_factura.clone()));

        let respuesta_factura = match self
            .gateway
            .create("factura", &Value::Object(compact(factura_payload)), None)
            .await
        {
            Ok(respuesta) => respuesta,
            Err(e) => {
                self.compensate(id_reserva).await;
                return Err(prefixed("Error al crear la factura: ", e));
            }
        };

        let id_factura = match extract_id_from_response(&respuesta_factura, &CLAVES_ID_FACTURA) {
            Some(id) => id,
            None => {
                self.compensate(id_reserva).await;
                return Err(AppError::Gateway(
                    "Error al crear la factura: El backend no devolvió un IdFactura válido. \
                     Verifica SP_RegistrarFactura."
                        .to_string(),
                ));
            }
        };

        let factura = Invoice {
            id: Some(id_factura.to_string()),
            reserva_id: Some(id_reserva.to_string()),
            total: Some(input.payment.amount),
            issued_at: Some(fecha_factura),
            reserva_status: None,
            finca_name: input.reservation.finca_name.clone(),
            municipality: input.reservation.municipality.clone(),
            nightly_price: input.reservation.nightly_price,
            meta: Some(respuesta_factura),
        };

        // Passo 3: pagamento. A fatura fica como está se falhar; só a
        // reserva é cancelada.
        let fecha_pago = now_iso();
        let mut pago_payload = Map::new();
        pago_payload.insert("IdFactura".to_string(), Value::from(id_factura));
        pago_payload.insert("IdMetodoDePago".to_string(), Value::from(metodo_id));
        pago_payload.insert("Monto".to_string(), decimal_value(input.payment.amount.round()));
        pago_payload.insert("FechaPago".to_string(), Value::String(fecha_pago.clone()));
        pago_payload.insert("EstadoPago".to_string(), Value::String("Pagado".to_string()));

        let respuesta_pago = match self
            .gateway
            .create("pago", &Value::Object(compact(pago_payload)), None)
            .await
        {
            Ok(respuesta) => respuesta,
            Err(e) => {
                self.compensate(id_reserva).await;
                return Err(prefixed("Error al registrar el pago: ", e));
            }
        };

        let id_pago = extract_id_from_response(&respuesta_pago, &CLAVES_ID_PAGO);
        let pago = Payment {
            id: id_pago.map(|id| id.to_string()),
            reserva_id: Some(id_reserva.to_string()),
            method_id: Some(metodo_id.to_string()),
            method_name: Some(input.payment.method_name.clone()),
            amount: Some(input.payment.amount),
            paid_at: Some(fecha_pago),
            status: Some("Pagado".to_string()),
            reference: input.payment.reference.clone(),
            mixed: input.payment.mixed,
            meta: Some(respuesta_pago),
        };

        Ok(ReservationWithPayment { reservation: reserva, invoice: factura, payment: pago })
    }

    /// Entrada do checkout: valida o rascunho por inteiro antes de
    /// qualquer chamada de rede e então dispara o fluxo transacional.
    pub async fn process_checkout(
        &self,
        draft: &CheckoutDraft,
        payment: &PaymentRequest,
        capacidad: Option<i64>,
    ) -> Result<ReservationWithPayment, AppError> {
        draft.validate()?;

        let entrada = parse_day(&draft.entry_date)
            .ok_or_else(|| AppError::Form("Selecciona una fecha de entrada válida.".to_string()))?;
        let salida = parse_day(&draft.exit_date)
            .unwrap_or_else(|| entrada + Duration::days(draft.nights.max(1)));

        if salida <= entrada {
            return Err(AppError::Form(
                "La fecha de salida debe ser posterior a la de entrada. Verifica el número de noches."
                    .to_string(),
            ));
        }

        if let Some(capacidad) = capacidad {
            if capacidad > 0 && draft.guests > capacidad {
                return Err(AppError::Form(format!(
                    "Esta finca tiene capacidad para máximo {capacidad} huéspedes."
                )));
            }
        }

        let input = CreateWithPayment {
            reservation: NewReservation {
                finca_id: draft.finca_id.clone(),
                finca_name: Some(draft.finca_name.clone()),
                municipality: draft.municipality.clone(),
                entry_date: draft.entry_date.clone(),
                exit_date: salida.format("%Y-%m-%d").to_string(),
                nights: draft.nights,
                guests: draft.guests,
                amount: draft.total,
                user_email: draft.user_email.clone(),
                user_name: draft.user_full_name.clone(),
                user_document: draft.user_document.clone(),
                user_id: None,
                nightly_price: draft.nightly_price,
            },
            payment: payment.clone(),
        };

        self.create_with_payment(&input).await
    }

    /// Cancela (apaga) uma reserva. Nunca propaga erro: devolve `false`
    /// e registra no log.
    pub async fn cancel_reservation(&self, reserva_id: &str) -> bool {
        if reserva_id.trim().is_empty() {
            return false;
        }

        let path = format!("reserva/{}", encode_path_segment(reserva_id.trim()));
        match self.gateway.delete(&path, None).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(reserva_id, "falha cancelando reserva: {}", e.user_message());
                false
            }
        }
    }

    /// Compensação de melhor esforço. O resultado não chega ao usuário:
    /// o erro mostrado é sempre o da falha original.
    async fn compensate(&self, id_reserva: i64) {
        if !self.cancel_reservation(&id_reserva.to_string()).await {
            tracing::warn!(id_reserva, "compensação falhou; reserva pode ter ficado órfã");
        }
    }
}

// --- mapeadores tolerantes ---

pub fn map_payment_method(raw: &Value) -> PaymentMethod {
    if !raw.is_object() {
        return PaymentMethod {
            id: String::new(),
            name: "Método de pago".to_string(),
            allows_mixed: false,
        };
    }

    PaymentMethod {
        id: pick_string(raw, &["IdMetodoDePago", "Id"]).unwrap_or_default(),
        name: pick_string(raw, &["NombreMetodoDePago", "Nombre"])
            .unwrap_or_else(|| "Método de pago".to_string()),
        allows_mixed: pick_bool(raw, &["PagoMixto"]).unwrap_or(false),
    }
}

pub fn map_payment(raw: &Value) -> Option<Payment> {
    if !raw.is_object() {
        return None;
    }

    Some(Payment {
        id: pick_string(raw, &["IdPago", "Id"]),
        reserva_id: pick_string(raw, &["IdReserva", "ReservaId"]),
        method_id: pick_string(raw, &["IdMetodoDePago"]),
        method_name: pick_string(raw, &["NombreMetodoDePago", "Metodo", "NombreMetodo"]),
        amount: pick_decimal(raw, &["Monto", "Valor", "Total"]),
        paid_at: pick_string(raw, &["FechaPago"]),
        status: pick_string(raw, &["EstadoPago", "Estado"]),
        reference: pick_string(raw, &["Referencia", "Codigo"]),
        mixed: pick_bool(raw, &["PagoMixto"]),
        meta: Some(raw.clone()),
    })
}

pub fn map_invoice(raw: &Value) -> Option<Invoice> {
    if !raw.is_object() {
        return None;
    }

    Some(Invoice {
        id: pick_string(raw, &["IdFactura", "Id"]),
        reserva_id: pick_string(raw, &["IdReserva", "ReservaId"]),
        total: pick_decimal(raw, &["Total", "TotalFactura"]),
        issued_at: pick_string(raw, &["FechaFactura", "FechaEmision"]),
        reserva_status: pick_string(raw, &["EstadoReserva"]),
        finca_name: pick_string(raw, &["NombreFinca"]),
        municipality: pick_string(raw, &["NombreMunicipio", "Municipio"]),
        nightly_price: pick_decimal(raw, &["PrecioFinca", "Precio"]),
        meta: Some(raw.clone()),
    })
}

/// Registro cru -> `Reservation`. Entrada sem data analisável não vira
/// reserva (o chamador loga e segue); a saída faltante cai na entrada.
pub fn map_reservation(raw: &Value) -> Option<Reservation> {
    if !raw.is_object() {
        return None;
    }

    let entrada = pick_string(raw, &["FechaEntrada"]).and_then(|texto| parse_day(&texto))?;
    let salida = pick_string(raw, &["FechaSalida"])
        .and_then(|texto| parse_day(&texto))
        .unwrap_or(entrada);

    let noches = pick_i64(raw, &["Noches", "CantidadNoches"])
        .or_else(|| derive_nights(entrada, salida));

    Some(Reservation {
        id: pick_string(raw, &["IdReserva", "Id", "ReservaId"]).unwrap_or_default(),
        finca_id: pick_string(raw, &["IdFinca", "FincaId"]).unwrap_or_default(),
        finca_name: pick_string(raw, &["NombreFinca", "Finca"]),
        municipality: pick_string(raw, &["NombreMunicipio", "Municipio"]),
        reserved_at: pick_string(raw, &["FechaReserva", "CreadoEn"]),
        entry_date: entrada,
        exit_date: salida,
        nights: noches,
        guests: pick_i64(raw, &["Huespedes", "NumeroPersonas"]),
        amount: pick_decimal(raw, &["MontoReserva", "Monto", "TotalReserva", "Total", "Valor"]),
        status: pick_string(raw, &["Estado", "EstadoReserva"]),
        user_email: pick_string(raw, &["Correo", "CorreoUsuario"]),
        user_name: pick_string(raw, &["NombreUsuario", "Usuario"]),
        user_document: pick_string(raw, &["NumeroDocumento", "Documento"])
            .or_else(|| pick_i64(raw, &["IdUsuario"]).map(|id| id.to_string())),
        user_id: pick_i64(raw, &["IdUsuario", "UsuarioId"]),
        nightly_price: pick_decimal(raw, &["PrecioFinca", "Precio", "ValorNoche"]),
        created_at: pick_string(raw, &["CreadoEn", "createdAt"]),
        payment: extract_nested(raw, &["Pago", "pago"], &["Pagos", "pagos"])
            .and_then(|valor| map_payment(&valor)),
        invoice: extract_nested(raw, &["Factura", "factura"], &["Facturas", "facturas"])
            .and_then(|valor| map_invoice(&valor)),
        meta: Some(raw.clone()),
    })
}

fn extract_nested(raw: &Value, singulares: &[&str], plurales: &[&str]) -> Option<Value> {
    let objeto = raw.as_object()?;

    for clave in singulares {
        if let Some(valor) = objeto.get(*clave) {
            if valor.is_object() {
                return Some(valor.clone());
            }
        }
    }

    for clave in plurales {
        if let Some(Value::Array(itens)) = objeto.get(*clave) {
            if let Some(primero) = itens.first() {
                return Some(primero.clone());
            }
        }
    }

    None
}

/// Noites da reserva: contagem armazenada positiva, senão
/// `max(1, salida - entrada)`. Datas iguais degradam para 1 noite
/// (comportamento herdado; ver DESIGN.md).
fn derive_nights(entrada: NaiveDate, salida: NaiveDate) -> Option<i64> {
    let diff = (salida - entrada).num_days();
    Some(diff.max(1))
}

/// Expande `[entrada, salida)` em datas de calendário consecutivas. A
/// data de saída nunca entra; o teto de 365 limita o custo.
pub fn expand_range(reserva: &Reservation) -> Vec<NaiveDate> {
    let noches = match reserva.nights {
        Some(n) if n > 0 => n,
        _ => (reserva.exit_date - reserva.entry_date).num_days().max(1),
    };

    let total = noches.min(MAX_NOCHES_EXPANSION);
    (0..total)
        .map(|i| reserva.entry_date + Duration::days(i))
        .collect()
}

// --- sondagem de resposta e utilitários de data/número ---

/// Extrai um id numérico positivo sondando as formas de resposta
/// conhecidas: campos diretos, `data`/`resultado`/`result` aninhados,
/// `recordset[0]`, `recordsets[0][0]` ou o primeiro elemento de uma
/// lista crua.
pub fn extract_id_from_response(respuesta: &Value, claves: &[&str]) -> Option<i64> {
    let positivo = |valor: Option<f64>| valor.filter(|n| *n > 0.0).map(|n| n as i64);

    if let Some(id) = positivo(pick_number(respuesta, claves)) {
        return Some(id);
    }

    for anidado in ["data", "resultado", "result"] {
        if let Some(interior) = respuesta.get(anidado) {
            if let Some(id) = positivo(pick_number(interior, claves)) {
                return Some(id);
            }
        }
    }

    if let Some(Value::Array(recordset)) = respuesta.get("recordset") {
        if let Some(primero) = recordset.first() {
            if let Some(id) = positivo(pick_number(primero, claves)) {
                return Some(id);
            }
        }
    }

    if let Some(Value::Array(recordsets)) = respuesta.get("recordsets") {
        if let Some(Value::Array(primero)) = recordsets.first() {
            if let Some(fila) = primero.first() {
                if let Some(id) = positivo(pick_number(fila, claves)) {
                    return Some(id);
                }
            }
        }
    }

    if let Value::Array(lista) = respuesta {
        if let Some(primero) = lista.first() {
            if let Some(id) = positivo(pick_number(primero, claves)) {
                return Some(id);
            }
        }
    }

    None
}

fn build_filter_options(filtros: &ReservationFilter) -> Option<RequestOptions> {
    let mut options = RequestOptions::default();

    let mut append = |clave: &str, valor: Option<String>| {
        if let Some(valor) = valor {
            let recortado = valor.trim().to_string();
            if !recortado.is_empty() {
                options.params.insert(clave.to_string(), Value::String(recortado));
            }
        }
    };

    append("Correo", filtros.email.clone());
    append("NumeroDocumento", filtros.document.clone());
    append("IdUsuario", filtros.user_id.map(|id| id.to_string()));
    append("IdFinca", filtros.finca_id.clone());

    if options.params.is_empty() {
        None
    } else {
        Some(options)
    }
}

fn apply_local_filters(
    reservas: Vec<Reservation>,
    filtros: Option<&ReservationFilter>,
) -> Vec<Reservation> {
    let Some(filtros) = filtros else {
        return reservas;
    };
    if filtros.is_empty() {
        return reservas;
    }

    reservas
        .into_iter()
        .filter(|reserva| {
            if let Some(correo) = &filtros.email {
                let propio = reserva
                    .user_email
                    .as_deref()
                    .unwrap_or("")
                    .to_lowercase();
                let buscado = correo.to_lowercase();
                let buscado = buscado.trim();
                if propio.trim() != buscado && !propio.contains(buscado) {
                    return false;
                }
            }

            if let Some(documento) = &filtros.document {
                let propio = reserva
                    .user_document
                    .clone()
                    .or_else(|| reserva.user_id.map(|id| id.to_string()))
                    .unwrap_or_default()
                    .to_lowercase();
                let buscado = documento.to_lowercase();
                let buscado = buscado.trim();
                if propio.trim() != buscado && !propio.contains(buscado) {
                    return false;
                }
            }

            if let Some(id_usuario) = filtros.user_id {
                if reserva.user_id != Some(id_usuario) {
                    return false;
                }
            }

            if let Some(finca_id) = &filtros.finca_id {
                let igual_texto = reserva.finca_id == *finca_id;
                let igual_numero = match (
                    reserva.finca_id.trim().parse::<f64>(),
                    finca_id.trim().parse::<f64>(),
                ) {
                    (Ok(a), Ok(b)) => a == b,
                    _ => false,
                };
                if !igual_texto && !igual_numero {
                    return false;
                }
            }

            true
        })
        .collect()
}

fn prefixed(prefijo: &str, e: AppError) -> AppError {
    match e {
        AppError::Gateway(mensaje) => AppError::Gateway(format!("{prefijo}{mensaje}")),
        otro => otro,
    }
}

fn parse_positive_id(texto: &str) -> Option<i64> {
    let numero: i64 = texto.trim().parse().ok()?;
    (numero > 0).then_some(numero)
}

/// `AAAA-MM-DD`, instante RFC 3339 ou datetime sem fuso.
pub fn parse_day(texto: &str) -> Option<NaiveDate> {
    let recortado = texto.trim();
    if recortado.is_empty() {
        return None;
    }

    if let Ok(fecha) = NaiveDate::parse_from_str(recortado, "%Y-%m-%d") {
        return Some(fecha);
    }

    if let Ok(instante) = DateTime::parse_from_rfc3339(recortado) {
        return Some(instante.date_naive());
    }

    if let Ok(instante) =
        chrono::NaiveDateTime::parse_from_str(recortado, "%Y-%m-%dT%H:%M:%S%.f")
    {
        return Some(instante.date());
    }

    None
}

fn parse_instant(texto: &str) -> Option<DateTime<Utc>> {
    if let Ok(instante) = DateTime::parse_from_rfc3339(texto.trim()) {
        return Some(instante.with_timezone(&Utc));
    }
    parse_day(texto).and_then(|fecha| {
        fecha
            .and_hms_opt(0, 0, 0)
            .map(|naive| naive.and_utc())
    })
}

/// Datas puras ganham meio-dia UTC para não escorregar de dia com o
/// fuso; instantes completos passam intactos.
pub fn to_iso_instant(fecha: &str) -> String {
    let recortado = fecha.trim();

    if recortado.contains('T') && recortado.ends_with('Z') {
        return recortado.to_string();
    }

    if NaiveDate::parse_from_str(recortado, "%Y-%m-%d").is_ok() {
        return format!("{recortado}T12:00:00.000Z");
    }

    if let Some(dia) = parse_day(recortado) {
        if let Some(instante) = dia.and_hms_opt(12, 0, 0) {
            return instante
                .and_utc()
                .to_rfc3339_opts(SecondsFormat::Millis, true);
        }
    }

    now_iso()
}

fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn decimal_value(valor: Decimal) -> Value {
    serde_json::to_value(valor).unwrap_or(Value::Null)
}

fn number_or_null(texto: &str) -> Value {
    match texto.trim().parse::<f64>() {
        Ok(numero) if numero.is_finite() => {
            if numero.fract() == 0.0 && numero.abs() < i64::MAX as f64 {
                Value::from(numero as i64)
            } else {
                Value::from(numero)
            }
        }
        _ => Value::Null,
    }
}

/// Remove entradas nulas ou de texto vazio antes da transmissão.
fn compact(payload: Map<String, Value>) -> Map<String, Value> {
    payload
        .into_iter()
        .filter(|(_, valor)| match valor {
            Value::Null => false,
            Value::String(texto) => !texto.is_empty(),
            _ => true,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeGateway;
    use serde_json::json;

    fn servicio(gateway: Arc<FakeGateway>) -> ReservationService {
        ReservationService::new(gateway)
    }

    #[test]
    fn extract_id_probes_every_known_shape() {
        let claves = CLAVES_ID_RESERVA;
        let formas = [
            json!({ "IdReserva": 42 }),
            json!({ "idReserva": 42 }),
            json!({ "data": { "IdReserva": 42 } }),
            json!({ "resultado": { "Id": 42 } }),
            json!({ "result": { "id": 42 } }),
            json!({ "recordset": [{ "IdReserva": 42 }] }),
            json!({ "recordsets": [[{ "IdReserva": 42 }]] }),
            json!([{ "IdReserva": 42 }]),
            json!({ "IdReserva": "42" }),
        ];

        for forma in formas {
            assert_eq!(extract_id_from_response(&forma, &claves), Some(42), "{forma}");
        }

        assert_eq!(extract_id_from_response(&json!({ "IdReserva": 0 }), &claves), None);
        assert_eq!(extract_id_from_response(&json!({ "otra": 1 }), &claves), None);
    }

    #[test]
    fn iso_conversion_pins_plain_dates_to_noon_utc() {
        assert_eq!(to_iso_instant("2025-01-15"), "2025-01-15T12:00:00.000Z");
        assert_eq!(
            to_iso_instant("2025-01-15T08:30:00.000Z"),
            "2025-01-15T08:30:00.000Z"
        );
    }

    #[test]
    fn three_night_range_excludes_the_exit_date() {
        let raw = json!({
            "IdReserva": 1,
            "IdFinca": 9,
            "FechaEntrada": "2025-01-15",
            "FechaSalida": "2025-01-18"
        });
        let reserva = map_reservation(&raw).unwrap();
        assert_eq!(reserva.nights, Some(3));

        let fechas = expand_range(&reserva);
        let esperadas: Vec<NaiveDate> = ["2025-01-15", "2025-01-16", "2025-01-17"]
            .iter()
            .map(|t| NaiveDate::parse_from_str(t, "%Y-%m-%d").unwrap())
            .collect();
        assert_eq!(fechas, esperadas);
    }

    #[test]
    fn stored_night_count_wins_over_derivation() {
        let raw = json!({
            "FechaEntrada": "2025-01-15",
            "FechaSalida": "2025-01-18",
            "Noches": 2
        });
        let reserva = map_reservation(&raw).unwrap();
        assert_eq!(expand_range(&reserva).len(), 2);
    }

    #[test]
    fn runaway_ranges_are_capped_at_365_dates() {
        let raw = json!({
            "FechaEntrada": "2025-01-15",
            "FechaSalida": "2025-01-16",
            "Noches": 40000
        });
        let reserva = map_reservation(&raw).unwrap();
        assert_eq!(expand_range(&reserva).len(), 365);
    }

    #[test]
    fn unparseable_entry_date_discards_the_record() {
        assert!(map_reservation(&json!({ "FechaSalida": "2025-01-18" })).is_none());
        assert!(map_reservation(&json!({ "FechaEntrada": "mañana" })).is_none());
        assert!(map_reservation(&json!("texto")).is_none());
    }

    #[tokio::test]
    async fn occupied_dates_skip_cancelled_and_broken_records() {
        let gateway = Arc::new(FakeGateway::new());
        gateway.on(
            "LIST reserva",
            Ok(json!([
                { "IdFinca": 9, "FechaEntrada": "2025-01-15", "FechaSalida": "2025-01-17" },
                { "IdFinca": 9, "FechaEntrada": "2025-02-01", "FechaSalida": "2025-02-03",
                  "Estado": "Cancelada" },
                { "IdFinca": 9, "FechaEntrada": "no es fecha" }
            ])),
        );

        let fechas = servicio(gateway).occupied_dates("9").await;
        let esperadas: BTreeSet<NaiveDate> = ["2025-01-15", "2025-01-16"]
            .iter()
            .map(|t| NaiveDate::parse_from_str(t, "%Y-%m-%d").unwrap())
            .collect();
        assert_eq!(fechas, esperadas);
    }

    #[tokio::test]
    async fn occupied_dates_guard_against_missing_finca_id() {
        let gateway = Arc::new(FakeGateway::new());
        let servicio = servicio(gateway.clone());

        assert!(servicio.occupied_dates("").await.is_empty());
        assert!(servicio.occupied_dates("undefined").await.is_empty());
        assert!(servicio.occupied_dates("null").await.is_empty());
        assert!(gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn reservation_payload_is_compacted_with_fixed_status() {
        let gateway = Arc::new(FakeGateway::new());
        gateway.on("CREATE reserva", Ok(json!({ "IdReserva": 42 })));

        let nueva = NewReservation {
            finca_id: "9".to_string(),
            finca_name: Some("El Paraíso".to_string()),
            municipality: None,
            entry_date: "2025-01-15".to_string(),
            exit_date: "2025-01-18".to_string(),
            nights: 3,
            guests: 2,
            amount: Decimal::new(1_500_000, 0),
            user_email: None,
            user_name: None,
            user_document: Some("123456789".to_string()),
            user_id: None,
            nightly_price: Some(Decimal::new(500_000, 0)),
        };

        let reserva = servicio(gateway.clone()).create_reservation(&nueva).await.unwrap();
        assert_eq!(reserva.id, "42");
        assert_eq!(reserva.status.as_deref(), Some("Activa"));

        let llamadas = gateway.calls();
        let payload = llamadas[0].payload.as_ref().unwrap();
        assert_eq!(payload["IdFinca"], 9);
        assert_eq!(payload["NumeroDocumentoUsuario"], 123456789);
        assert_eq!(payload["FechaEntrada"], "2025-01-15T12:00:00.000Z");
        assert_eq!(payload["Estado"], "Activa");
        // montos numéricos, sin envoltura de texto
        assert!(payload["MontoReserva"].is_number());
    }

    #[tokio::test]
    async fn exit_date_must_follow_entry_date() {
        let gateway = Arc::new(FakeGateway::new());
        let nueva = NewReservation {
            finca_id: "9".to_string(),
            finca_name: None,
            municipality: None,
            entry_date: "2025-01-18".to_string(),
            exit_date: "2025-01-15".to_string(),
            nights: 3,
            guests: 2,
            amount: Decimal::ZERO,
            user_email: None,
            user_name: None,
            user_document: None,
            user_id: None,
            nightly_price: None,
        };

        let err = servicio(gateway.clone())
            .create_reservation(&nueva)
            .await
            .unwrap_err();
        assert_eq!(
            err.user_message(),
            "La fecha de salida debe ser posterior a la fecha de entrada"
        );
        // validación local: ninguna llamada salió
        assert!(gateway.calls().is_empty());
    }
}
