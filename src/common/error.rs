use thiserror::Error;

// Nosso tipo de erro, com `thiserror` para melhor ergonomia.
// Toda operação falível pública da biblioteca devolve `Result<_, AppError>`;
// nenhum erro escapa como panic.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    // Mensagem já normalizada pelo gateway (corpo de erro do backend ou
    // falha de transporte). É exibida ao usuário tal como está.
    #[error("Erro do backend: {0}")]
    Gateway(String),

    // Validação local de formulário (JSON inválido, campo numérico com
    // texto, etc.). Curto-circuita antes de qualquer chamada de rede.
    #[error("Erro de formulário: {0}")]
    Form(String),

    #[error("Identificador do registro não resolvido")]
    MissingIdentifier,

    // Variante genérica para qualquer outro erro inesperado
    // `anyhow::Error` é ótimo para capturar o contexto do erro.
    #[error("Erro interno")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Mensagem em espanhol exibida ao usuário final. O detalhe técnico
    /// fica no log, nunca na interface.
    pub fn user_message(&self) -> String {
        match self {
            AppError::ValidationError(errors) => {
                let mut campos: Vec<String> = Vec::new();
                for (campo, _) in errors.field_errors() {
                    campos.push(campo.to_string());
                }
                if campos.is_empty() {
                    "Uno o más campos son inválidos.".to_string()
                } else {
                    campos.sort();
                    format!("Uno o más campos son inválidos: {}.", campos.join(", "))
                }
            }
            AppError::Gateway(mensaje) | AppError::Form(mensaje) => mensaje.clone(),
            AppError::MissingIdentifier => {
                "No se pudo determinar el identificador del registro.".to_string()
            }
            AppError::Internal(e) => {
                tracing::error!("Erro interno: {e:#}");
                "Ocurrió un error inesperado.".to_string()
            }
        }
    }
}
