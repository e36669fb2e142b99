// src/services/crypto.rs

use sha2::{Digest, Sha512};

use crate::common::error::AppError;

/// Digest SHA-512 em hex minúsculo (128 caracteres). É o que viaja e o
/// que fica guardado; o texto plano nunca sai daqui. O hashing roda em
/// `spawn_blocking` para não prender o runtime.
pub async fn sha512_hex(texto: &str) -> Result<String, AppError> {
    let texto = texto.to_owned();
    let digest = tokio::task::spawn_blocking(move || {
        let mut hasher = Sha512::new();
        hasher.update(texto.as_bytes());
        hex::encode(hasher.finalize())
    })
    .await
    .map_err(|e| anyhow::anyhow!("Falha na task de digest: {e}"))?;

    Ok(digest)
}

/// Compara um texto com um digest já armazenado.
pub async fn verify_sha512(texto: &str, digest: &str) -> Result<bool, AppError> {
    Ok(sha512_hex(texto).await? == digest.to_lowercase())
}
