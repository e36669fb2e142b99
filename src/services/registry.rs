// src/services/registry.rs
//
// Registro declarativo dos recursos administráveis do Renfi. Dado puro,
// somente leitura depois de construído: mudar o esquema é edição de
// deploy, não operação de runtime.

use serde_json::json;
use std::collections::BTreeMap;

use crate::models::resource::{
    FieldConfig, FieldType, Record, ReportConfig, ResourceConfig, SelectOption,
};

/// Consulta de recurso por id, na ordem de declaração (a navegação do
/// painel administrativo se monta a partir dela).
pub struct ResourceRegistry {
    resources: Vec<ResourceConfig>,
}

impl ResourceRegistry {
    pub fn new(resources: Vec<ResourceConfig>) -> Self {
        debug_assert!(
            {
                let mut ids: Vec<&str> = resources.iter().map(|r| r.id.as_str()).collect();
                ids.sort_unstable();
                ids.windows(2).all(|par| par[0] != par[1])
            },
            "ids de recurso devem ser únicos no registro"
        );
        Self { resources }
    }

    /// Os nove recursos de produção.
    pub fn builtin() -> Self {
        Self::new(vec![
            usuarios(),
            fincas(),
            reservas(),
            pagos(),
            facturas(),
            metodos_de_pago(),
            imagenes(),
            municipios(),
            roles(),
        ])
    }

    pub fn get(&self, id: &str) -> Option<&ResourceConfig> {
        self.resources.iter().find(|recurso| recurso.id == id)
    }

    pub fn ids(&self) -> Vec<&str> {
        self.resources.iter().map(|recurso| recurso.id.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResourceConfig> {
        self.resources.iter()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

// --- helpers de construção ---

fn field(key: &str, label: &str) -> FieldConfig {
    FieldConfig {
        key: key.to_string(),
        label: label.to_string(),
        ..FieldConfig::default()
    }
}

fn typed(key: &str, label: &str, field_type: FieldType) -> FieldConfig {
    FieldConfig {
        field_type,
        ..field(key, label)
    }
}

fn required(mut campo: FieldConfig) -> FieldConfig {
    campo.required = true;
    campo
}

fn report(label: &str, endpoint: &str, description: &str) -> ReportConfig {
    ReportConfig {
        label: label.to_string(),
        endpoint: endpoint.to_string(),
        description: Some(description.to_string()),
        columns: None,
    }
}

fn cols(nombres: &[&str]) -> Vec<String> {
    nombres.iter().map(|n| n.to_string()).collect()
}

fn aliases(entradas: &[(&str, &[&str])]) -> BTreeMap<String, Vec<String>> {
    entradas
        .iter()
        .map(|(canonico, lista)| {
            (
                canonico.to_string(),
                lista.iter().map(|a| a.to_string()).collect(),
            )
        })
        .collect()
}

fn sample(valor: serde_json::Value) -> Option<Record> {
    valor.as_object().cloned()
}

// --- recursos ---

fn usuarios() -> ResourceConfig {
    ResourceConfig {
        id: "usuarios".to_string(),
        title: "Usuarios".to_string(),
        endpoint: "usuario".to_string(),
        description: Some(
            "Crea, actualiza y administra los usuarios registrados en Renfi.".to_string(),
        ),
        id_field: Some("NumeroDocumento".to_string()),
        delete_path: Some("usuario/delete".to_string()),
        delete_query_param: Some("id".to_string()),
        columns: cols(&[
            "NumeroDocumento",
            "NombreUsuario",
            "ApellidoUsuario",
            "Telefono",
            "Correo",
            "Contrasena",
            "Estado",
            "IdRol",
            "NombreRol",
        ]),
        preferred_fields: vec![
            required(field("NombreUsuario", "Nombre")),
            required(field("ApellidoUsuario", "Apellido")),
            required(typed("Correo", "Correo", FieldType::Email)),
            required(typed("Contrasena", "Contraseña", FieldType::Password)),
            typed("Telefono", "Teléfono", FieldType::Text),
            FieldConfig {
                select_endpoint: Some("rol".to_string()),
                select_value_key: Some("IdRol".to_string()),
                select_label_key: Some("NombreRol".to_string()),
                ..required(typed("IdRol", "Rol", FieldType::Select))
            },
            FieldConfig {
                select_options: Some(vec![
                    SelectOption { value: json!("Activo"), label: "Activo".to_string() },
                    SelectOption { value: json!("Inactivo"), label: "Inactivo".to_string() },
                ]),
                ..required(typed("Estado", "Estado", FieldType::Select))
            },
        ],
        sample_payload: sample(json!({
            "NombreUsuario": "Nuevo",
            "ApellidoUsuario": "Usuario",
            "Telefono": "3001234567",
            "Correo": "correo@renfi.com",
            "Contrasena": "123456",
            "Estado": "Activo",
            "IdRol": 2
        })),
        ..ResourceConfig::default()
    }
}

fn fincas() -> ResourceConfig {
    ResourceConfig {
        id: "fincas".to_string(),
        title: "Fincas".to_string(),
        endpoint: "finca".to_string(),
        description: Some("Gestiona la información de las fincas disponibles.".to_string()),
        id_field: Some("IdFinca".to_string()),
        columns: cols(&[
            "IdFinca",
            "NombreFinca",
            "Direccion",
            "NombreMunicipio",
            "Precio",
            "Capacidad",
            "Estado",
            "Calificacion",
            "NombrePropietario",
            "ApellidoPropietario",
            "TelefonoPropietario",
            "CorreoPropietario",
        ]),
        preferred_fields: vec![
            required(field("NombreFinca", "Nombre de la finca")),
            required(field("Direccion", "Dirección")),
            field("NombreMunicipio", "Municipio"),
            typed("Precio", "Precio por noche", FieldType::Number),
            typed("Capacidad", "Capacidad", FieldType::Number),
            field("Estado", "Estado"),
            typed("InformacionAdicional", "Información adicional", FieldType::Textarea),
            typed("Calificacion", "Calificación", FieldType::Number),
            field("NombrePropietario", "Nombre del propietario"),
            field("ApellidoPropietario", "Apellido del propietario"),
            typed("TelefonoPropietario", "Teléfono del propietario", FieldType::Text),
            typed("CorreoPropietario", "Correo del propietario", FieldType::Email),
        ],
        sample_payload: sample(json!({
            "NombreFinca": "Finca de ejemplo",
            "Direccion": "Vereda el Paraíso",
            "NombreMunicipio": "Manizales",
            "Precio": 250000,
            "Capacidad": 12,
            "Estado": "Disponible",
            "InformacionAdicional": "Piscina climatizada y zona BBQ.",
            "Calificacion": 5,
            "NombrePropietario": "Laura",
            "ApellidoPropietario": "Gomez",
            "TelefonoPropietario": "3001234567",
            "CorreoPropietario": "laura@renfi.com"
        })),
        reports: vec![
            report(
                "Más reservadas",
                "finca/report/mas-reservadas",
                "Listado de las fincas con mayor número de reservas.",
            ),
            report(
                "Promedio de calificación",
                "finca/report/promedio-calificacion",
                "Calificación promedio por finca.",
            ),
            report(
                "Total ingresos",
                "finca/report/total-ingresos",
                "Acumulado de ingresos por finca.",
            ),
            report(
                "Más ingresos",
                "finca/report/mas-ingresos",
                "Fincas con mayores ingresos generados.",
            ),
        ],
        ..ResourceConfig::default()
    }
}

fn reservas() -> ResourceConfig {
    ResourceConfig {
        id: "reservas".to_string(),
        title: "Reservas".to_string(),
        endpoint: "reserva".to_string(),
        description: Some("Control y seguimiento de reservas realizadas.".to_string()),
        id_field: Some("IdReserva".to_string()),
        columns: cols(&[
            "IdReserva",
            "FechaReserva",
            "IdFinca",
            "NombreFinca",
            "PrecioFinca",
            "EstadoFinca",
            "NombreMunicipio",
            "FechaEntrada",
            "FechaSalida",
            "MontoReserva",
            "Estado",
            "IdPropietario",
            "NombrePropietario",
            "ApellidoPropietario",
        ]),
        preferred_fields: vec![
            required(typed("NumeroDocumento", "Usuario (Documento)", FieldType::Number)),
            required(typed("IdFinca", "Finca (ID)", FieldType::Number)),
            typed("NombreFinca", "Nombre de la finca", FieldType::Text),
            typed("PrecioFinca", "Precio por noche", FieldType::Number),
            typed("EstadoFinca", "Estado de la finca", FieldType::Text),
            typed("NombreMunicipio", "Municipio", FieldType::Text),
            typed("FechaReserva", "Fecha de reserva", FieldType::Date),
            required(typed("FechaEntrada", "Fecha de entrada", FieldType::Date)),
            required(typed("FechaSalida", "Fecha de salida", FieldType::Date)),
            typed("MontoReserva", "Monto de la reserva", FieldType::Number),
            typed("Estado", "Estado", FieldType::Text),
            typed("IdPropietario", "Propietario (ID)", FieldType::Number),
            typed("NombrePropietario", "Nombre del propietario", FieldType::Text),
            typed("ApellidoPropietario", "Apellido del propietario", FieldType::Text),
        ],
        field_aliases: aliases(&[(
            "NumeroDocumento",
            &[
                "IdUsuario",
                "UsuarioId",
                "usuarioId",
                "idUsuario",
                "UsuarioID",
                "numeroDocumento",
                "Numero_Documento",
            ],
        )]),
        hidden_columns: cols(&["NumeroDocumento"]),
        sample_payload: sample(json!({
            "NumeroDocumento": 123456789,
            "IdFinca": 1,
            "NombreFinca": "Finca El Paraíso",
            "PrecioFinca": 500000,
            "EstadoFinca": "Disponible",
            "NombreMunicipio": "Itagüí",
            "FechaReserva": "2025-01-10",
            "FechaEntrada": "2025-01-15",
            "FechaSalida": "2025-01-18",
            "MontoReserva": 1500000,
            "Estado": "Confirmada",
            "IdPropietario": 2,
            "NombrePropietario": "Laura",
            "ApellidoPropietario": "Gomez"
        })),
        ..ResourceConfig::default()
    }
}

fn pagos() -> ResourceConfig {
    ResourceConfig {
        id: "pagos".to_string(),
        title: "Pagos".to_string(),
        endpoint: "pago".to_string(),
        description: Some("Registro y estado de pagos realizados por reservas.".to_string()),
        id_field: Some("IdPago".to_string()),
        columns: cols(&[
            "Monto",
            "FechaPago",
            "EstadoPago",
            "NombreMetodoDePago",
            "PagoMixto",
            "IdReserva",
            "IdFactura",
            "TotalFactura",
        ]),
        preferred_fields: vec![
            required(typed("IdReserva", "Reserva (ID)", FieldType::Number)),
            required(typed("Monto", "Monto del pago", FieldType::Number)),
            required(typed("FechaPago", "Fecha de pago", FieldType::Date)),
            typed("EstadoPago", "Estado del pago", FieldType::Text),
            typed("NombreMetodoDePago", "Método de pago", FieldType::Text),
            typed("PagoMixto", "Pago mixto", FieldType::Text),
            typed("IdFactura", "Factura (ID)", FieldType::Number),
            typed("TotalFactura", "Total facturado", FieldType::Number),
        ],
        field_aliases: aliases(&[
            ("Monto", &["Valor", "valor", "Total", "total"]),
            ("EstadoPago", &["Estado", "estado"]),
            (
                "NombreMetodoDePago",
                &["Metodo", "metodo", "NombreMetodo", "nombreMetodo"],
            ),
        ]),
        sample_payload: sample(json!({
            "IdReserva": 1,
            "Monto": 1500000,
            "FechaPago": "2025-10-21T00:00:00.000Z",
            "EstadoPago": "Pagado",
            "NombreMetodoDePago": "Tarjeta de crédito",
            "PagoMixto": false,
            "IdFactura": 1,
            "TotalFactura": 1500000
        })),
        reports: vec![report(
            "Pagos pendientes",
            "pago/report/pendientes",
            "Pagos con estado pendiente por confirmar.",
        )],
        ..ResourceConfig::default()
    }
}

fn facturas() -> ResourceConfig {
    ResourceConfig {
        id: "facturas".to_string(),
        title: "Facturas".to_string(),
        endpoint: "factura".to_string(),
        description: Some("Generación de facturas asociadas a pagos.".to_string()),
        id_field: Some("IdFactura".to_string()),
        columns: cols(&[
            "FechaFactura",
            "Total",
            "IdReserva",
            "EstadoReserva",
            "NombreFinca",
            "PrecioFinca",
            "NombreMunicipio",
            "IdPropietario",
            "NombrePropietario",
            "ApellidoPropietario",
        ]),
        preferred_fields: vec![
            required(typed("FechaFactura", "Fecha de factura", FieldType::Date)),
            required(typed("Total", "Total facturado", FieldType::Number)),
            required(typed("IdReserva", "Reserva (ID)", FieldType::Number)),
            typed("EstadoReserva", "Estado de la reserva", FieldType::Text),
            typed("NombreFinca", "Nombre de la finca", FieldType::Text),
            typed("PrecioFinca", "Precio de la finca", FieldType::Number),
            typed("NombreMunicipio", "Municipio", FieldType::Text),
            typed("IdPropietario", "Propietario (ID)", FieldType::Number),
            typed("NombrePropietario", "Nombre del propietario", FieldType::Text),
            typed("ApellidoPropietario", "Apellido del propietario", FieldType::Text),
        ],
        field_aliases: aliases(&[
            ("FechaFactura", &["FechaEmision", "fechaEmision"]),
            ("Total", &["TotalFactura", "totalFactura"]),
        ]),
        sample_payload: sample(json!({
            "FechaFactura": "2025-10-20T00:00:00.000Z",
            "Total": 1500000,
            "IdReserva": 1,
            "EstadoReserva": "Activa",
            "NombreFinca": "Finca El Paraíso",
            "PrecioFinca": 500000,
            "NombreMunicipio": "Itagüí",
            "IdPropietario": 2,
            "NombrePropietario": "Laura",
            "ApellidoPropietario": "Gomez"
        })),
        ..ResourceConfig::default()
    }
}

fn metodos_de_pago() -> ResourceConfig {
    ResourceConfig {
        id: "metodos-de-pago".to_string(),
        title: "Métodos de pago".to_string(),
        endpoint: "metododepago".to_string(),
        description: Some("Configura y habilita los métodos de pago aceptados.".to_string()),
        id_field: Some("IdMetodoDePago".to_string()),
        columns: cols(&["NombreMetodoDePago", "PagoMixto"]),
        preferred_fields: vec![
            required(field("NombreMetodoDePago", "Nombre del método")),
            typed("PagoMixto", "Permite pago mixto", FieldType::Text),
        ],
        field_aliases: aliases(&[
            ("IdMetodoDePago", &["IdMetodoPago", "idMetodoPago"]),
            ("NombreMetodoDePago", &["Nombre", "nombre"]),
        ]),
        sample_payload: sample(json!({
            "NombreMetodoDePago": "Efectivo",
            "PagoMixto": false
        })),
        ..ResourceConfig::default()
    }
}

fn imagenes() -> ResourceConfig {
    ResourceConfig {
        id: "imagenes".to_string(),
        title: "Imágenes".to_string(),
        endpoint: "imagen".to_string(),
        description: Some("Administra las imágenes asignadas a cada finca.".to_string()),
        id_field: Some("IdImagen".to_string()),
        columns: cols(&["IdImagen", "UrlImagen", "IdFinca"]),
        preferred_fields: vec![
            required(typed("UrlImagen", "URL de la imagen", FieldType::Text)),
            required(typed("IdFinca", "Finca (ID)", FieldType::Number)),
        ],
        field_aliases: aliases(&[(
            "UrlImagen",
            &["Url", "url", "ImagenUrl", "imagenUrl"],
        )]),
        sample_payload: sample(json!({
            "UrlImagen": "https://renfi.com/img/paraiso1.jpg",
            "IdFinca": 1
        })),
        ..ResourceConfig::default()
    }
}

fn municipios() -> ResourceConfig {
    ResourceConfig {
        id: "municipios".to_string(),
        title: "Municipios".to_string(),
        endpoint: "municipio".to_string(),
        description: Some(
            "Cobertura geográfica y estadísticas de reservas por municipio.".to_string(),
        ),
        id_field: Some("IdMunicipio".to_string()),
        columns: cols(&["IdMunicipio", "NombreMunicipio"]),
        preferred_fields: vec![required(field("NombreMunicipio", "Nombre del municipio"))],
        sample_payload: sample(json!({ "NombreMunicipio": "Itagüí" })),
        reports: vec![report(
            "Municipios con más reservas",
            "municipio/report/mas-reservas",
            "Ranking de municipios con mayor número de reservas.",
        )],
        ..ResourceConfig::default()
    }
}

fn roles() -> ResourceConfig {
    ResourceConfig {
        id: "roles".to_string(),
        title: "Roles".to_string(),
        endpoint: "rol".to_string(),
        description: Some("Perfiles y permisos disponibles para los usuarios.".to_string()),
        id_field: Some("IdRol".to_string()),
        columns: cols(&["IdRol", "NombreRol"]),
        preferred_fields: vec![required(field("NombreRol", "Nombre del rol"))],
        sample_payload: sample(json!({ "NombreRol": "Administrador" })),
        ..ResourceConfig::default()
    }
}
