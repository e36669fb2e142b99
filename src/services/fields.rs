// src/services/fields.rs
//
// Resolução de campos sobre registros de grafia heterogênea. O backend
// devolve o mesmo campo como PascalCase, camelCase, snake_case ou um
// alias livre; aqui fica o pipeline determinístico de variantes e os
// `pick_*` tolerantes usados pelos mapeadores. Tudo função pura.

use rust_decimal::Decimal;
use serde_json::Value;

use crate::models::resource::{Record, ResourceConfig};

/// Primeira letra minúscula: `NombreFinca` -> `nombreFinca`.
pub fn lower_camel(texto: &str) -> String {
    let mut chars = texto.chars();
    match chars.next() {
        Some(primeiro) => primeiro.to_lowercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Insere `_` entre minúscula/dígito e maiúscula, preservando o caso:
/// `NombreFinca` -> `Nombre_Finca`.
pub fn to_snake(texto: &str) -> String {
    let mut saida = String::with_capacity(texto.len() + 4);
    let mut anterior_baixa = false;

    for c in texto.chars() {
        if c.is_ascii_uppercase() && anterior_baixa {
            saida.push('_');
        }
        anterior_baixa = c.is_ascii_lowercase() || c.is_ascii_digit();
        saida.push(c);
    }

    saida
}

/// Variantes mecânicas de um campo, na ordem de sondagem: aliases
/// declarados, lower-camel, snake_case (original e minúsculo),
/// tudo-minúsculo e tudo-maiúsculo. O próprio campo fica de fora.
pub fn field_variants(campo: &str, aliases: &[String]) -> Vec<String> {
    let mut variantes: Vec<String> = Vec::new();
    let mut push = |clave: String| {
        if clave != campo && !variantes.contains(&clave) {
            variantes.push(clave);
        }
    };

    for alias in aliases {
        push(alias.clone());
    }

    push(lower_camel(campo));

    let snake = to_snake(campo);
    push(snake.clone());
    push(snake.to_lowercase());

    push(campo.to_lowercase());
    push(campo.to_uppercase());

    variantes
}

/// O contrato `obtenerValorCampo`: valor na chave exata, senão a
/// primeira variante presente no registro; `None` se nenhuma bater.
pub fn resolve_field_value<'a>(
    registro: &'a Record,
    campo: &str,
    aliases: &[String],
) -> Option<&'a Value> {
    if let Some(valor) = registro.get(campo) {
        return Some(valor);
    }

    field_variants(campo, aliases)
        .iter()
        .find_map(|clave| registro.get(clave))
}

/// Só alfanumérico ASCII, minúsculo. Acentos caem fora, como no
/// comparador original.
pub fn normalize_key(valor: &str) -> String {
    valor
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect::<String>()
        .to_lowercase()
}

/// O campo é o identificador principal do recurso?
pub fn is_main_id_field(campo: &str, id_field: Option<&str>) -> bool {
    match id_field {
        Some(principal) => normalize_key(campo) == normalize_key(principal),
        None => false,
    }
}

/// Heurística de id externo: nome normalizado igual a `id`/
/// `identificador`, começando ou terminando em `id`, ou contendo
/// `_id`. Herdada como está; pode esconder colunas legítimas com `id`
/// no nome.
pub fn is_external_id_column(campo: &str, id_field: Option<&str>) -> bool {
    if is_main_id_field(campo, id_field) {
        return false;
    }

    let clave = normalize_key(campo);

    if clave == "id" || clave == "identificador" {
        return true;
    }

    if clave.starts_with("id") || clave.ends_with("id") {
        return true;
    }

    clave.contains("_id")
}

/// Rótulo de exibição: etiqueta preferida do esquema, senão o nome
/// humanizado (underscores viram espaço, camelCase se separa).
pub fn field_label(config: &ResourceConfig, campo: &str) -> String {
    if is_main_id_field(campo, config.id_field.as_deref()) {
        return "Número de identificación".to_string();
    }

    if let Some(preferido) = config
        .preferred_fields
        .iter()
        .find(|item| item.key == campo)
    {
        return preferido.label.clone();
    }

    let mut texto = String::with_capacity(campo.len() + 4);
    let mut anterior_baixa = false;
    for c in campo.chars() {
        if c == '_' {
            texto.push(' ');
            anterior_baixa = false;
            continue;
        }
        if c.is_ascii_uppercase() && anterior_baixa {
            texto.push(' ');
        }
        anterior_baixa = c.is_ascii_lowercase() || c.is_ascii_digit();
        texto.push(c);
    }

    let normalizado = texto.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut chars = normalizado.chars();
    match chars.next() {
        Some(primeiro) => primeiro.to_uppercase().collect::<String>() + chars.as_str(),
        None => normalizado,
    }
}

/// Envelope tolerante: lista crua, objeto solto (vira lista de um) ou
/// nada. O backend não garante formato uniforme.
pub fn normalize_collection(entrada: &Value) -> Vec<Value> {
    match entrada {
        Value::Null => Vec::new(),
        Value::Array(itens) => itens.clone(),
        unico => vec![unico.clone()],
    }
}

// --- pick_* : sondagem tolerante usada pelos mapeadores de reserva ---

/// Sonda uma lista de chaves candidatas, cada uma com suas variantes
/// mecânicas, e devolve o primeiro valor não nulo.
pub fn pick_value<'a>(origem: &'a Value, claves: &[&str]) -> Option<&'a Value> {
    let objeto = origem.as_object()?;

    for clave in claves {
        let variantes = [
            (*clave).to_string(),
            clave.to_lowercase(),
            lower_camel(clave),
            to_snake(clave).to_lowercase(),
            clave.to_uppercase(),
        ];

        for variante in &variantes {
            if let Some(valor) = objeto.get(variante) {
                if !valor.is_null() {
                    return Some(valor);
                }
            }
        }
    }

    None
}

pub fn pick_string(origem: &Value, claves: &[&str]) -> Option<String> {
    match pick_value(origem, claves)? {
        Value::String(texto) => Some(texto.clone()),
        Value::Number(numero) => Some(numero.to_string()),
        Value::Bool(valor) => Some(valor.to_string()),
        _ => None,
    }
}

/// Número tolerante: aceita número JSON finito ou texto com lixo de
/// formatação (`$ 1.500.000,00` etc.), vírgula tratada como decimal.
pub fn pick_number(origem: &Value, claves: &[&str]) -> Option<f64> {
    match pick_value(origem, claves)? {
        Value::Number(numero) => numero.as_f64().filter(|n| n.is_finite()),
        Value::String(texto) => parse_loose_number(texto),
        _ => None,
    }
}

pub fn pick_i64(origem: &Value, claves: &[&str]) -> Option<i64> {
    pick_number(origem, claves).map(|n| n as i64)
}

pub fn pick_decimal(origem: &Value, claves: &[&str]) -> Option<Decimal> {
    match pick_value(origem, claves)? {
        Value::Number(numero) => {
            let texto = numero.to_string();
            texto.parse::<Decimal>().ok()
        }
        Value::String(texto) => {
            let limpo: String = texto
                .chars()
                .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-'))
                .collect();
            limpo.replace(',', ".").parse::<Decimal>().ok()
        }
        _ => None,
    }
}

pub fn pick_bool(origem: &Value, claves: &[&str]) -> Option<bool> {
    match pick_value(origem, claves)? {
        Value::Bool(valor) => Some(*valor),
        Value::Number(numero) => numero.as_f64().map(|n| n != 0.0),
        Value::String(texto) => match texto.trim().to_lowercase().as_str() {
            "true" | "1" | "si" | "sí" | "yes" => Some(true),
            "false" | "0" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn parse_loose_number(texto: &str) -> Option<f64> {
    let limpo: String = texto
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-'))
        .collect();
    limpo.replace(',', ".").parse::<f64>().ok().filter(|n| n.is_finite())
}
