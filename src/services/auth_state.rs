// src/services/auth_state.rs

use std::sync::{Arc, Mutex};

use crate::common::storage::ClientStorage;
use crate::models::session::{SessionUser, StoredSession};

const SESSION_KEY: &str = "renfi_sesion";
const LOCAL_KEY: &str = "renfi_usuario";

#[derive(Default)]
struct Inner {
    usuario: Option<SessionUser>,
    token: Option<String>,
    recordar: bool,
}

/// Provedor de identidade da sessão: usuário atual, token e a bandeira
/// de administrador. Estado de processo explicitamente injetado (dois
/// storages: o de sessão e, com "recordar", o persistente), restaurado
/// uma vez na construção.
pub struct AuthState {
    session_storage: Arc<dyn ClientStorage>,
    local_storage: Arc<dyn ClientStorage>,
    inner: Mutex<Inner>,
}

impl AuthState {
    pub fn new(
        session_storage: Arc<dyn ClientStorage>,
        local_storage: Arc<dyn ClientStorage>,
    ) -> Self {
        let estado = Self {
            session_storage,
            local_storage,
            inner: Mutex::new(Inner::default()),
        };
        estado.restore_session();
        estado
    }

    pub fn set_session(
        &self,
        usuario: Option<SessionUser>,
        token: Option<String>,
        recordar: bool,
    ) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.usuario = usuario.clone();
            inner.token = token.clone();
            inner.recordar = recordar;
        }
        self.persist(&StoredSession { token, usuario }, recordar);
    }

    pub fn clear_session(&self) {
        if let Ok(mut inner) = self.inner.lock() {
            *inner = Inner::default();
        }
        self.session_storage.remove(SESSION_KEY);
        self.local_storage.remove(LOCAL_KEY);
    }

    /// Atualização de perfil mantendo o token e, por omissão, a escolha
    /// de "recordar" vigente.
    pub fn update_profile(&self, usuario: SessionUser, recordar: Option<bool>) {
        let (token, recordar) = match self.inner.lock() {
            Ok(mut inner) => {
                let recordar = recordar.unwrap_or(inner.recordar);
                inner.usuario = Some(usuario.clone());
                inner.recordar = recordar;
                (inner.token.clone(), recordar)
            }
            Err(_) => return,
        };

        self.persist(
            &StoredSession { token, usuario: Some(usuario) },
            recordar,
        );
    }

    pub fn current_user(&self) -> Option<SessionUser> {
        self.inner.lock().ok()?.usuario.clone()
    }

    pub fn token(&self) -> Option<String> {
        self.inner.lock().ok()?.token.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.current_user().is_some()
    }

    pub fn remember_active(&self) -> bool {
        self.inner.lock().map(|inner| inner.recordar).unwrap_or(false)
    }

    pub fn is_admin(&self) -> bool {
        self.current_user()
            .map(|usuario| Self::is_admin_user(&usuario))
            .unwrap_or(false)
    }

    /// Administrador: nome de rol contendo `admin`, senão rol 1 (o id
    /// pode chegar como número ou como texto numérico no campo `Rol`).
    pub fn is_admin_user(usuario: &SessionUser) -> bool {
        let rol_nombre = usuario
            .rol
            .as_deref()
            .unwrap_or("")
            .trim()
            .to_lowercase();

        let id_rol = usuario.id_rol.or_else(|| {
            usuario
                .rol
                .as_deref()
                .and_then(|texto| texto.trim().parse::<i64>().ok())
        });

        if rol_nombre.is_empty() && id_rol.is_none() {
            return false;
        }

        if rol_nombre.contains("admin") {
            return true;
        }

        id_rol == Some(1)
    }

    fn restore_session(&self) {
        let session_data = self.read_storage(&self.session_storage, SESSION_KEY);
        let local_data = self.read_storage(&self.local_storage, LOCAL_KEY);
        let recordar = local_data.is_some();

        let Some(data) = session_data.or(local_data) else {
            return;
        };

        if let Ok(mut inner) = self.inner.lock() {
            inner.usuario = data.usuario.clone();
            inner.token = data.token.clone();
            inner.recordar = recordar;
        }

        // Reescreve para normalizar os dois storages ao estado restaurado.
        self.persist(&data, recordar);
    }

    fn persist(&self, data: &StoredSession, recordar: bool) {
        let payload = match serde_json::to_string(data) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!("falha serializando a sessão: {e}");
                return;
            }
        };

        self.session_storage.set(SESSION_KEY, &payload);
        if recordar {
            self.local_storage.set(LOCAL_KEY, &payload);
        } else {
            self.local_storage.remove(LOCAL_KEY);
        }
    }

    fn read_storage(
        &self,
        storage: &Arc<dyn ClientStorage>,
        key: &str,
    ) -> Option<StoredSession> {
        let crudo = storage.get(key)?;
        match serde_json::from_str(&crudo) {
            Ok(data) => Some(data),
            Err(e) => {
                tracing::warn!(key, "sessão armazenada ilegível: {e}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::storage::MemoryStorage;

    fn usuario(rol: Option<&str>, id_rol: Option<i64>) -> SessionUser {
        SessionUser {
            correo: Some("laura@renfi.com".to_string()),
            rol: rol.map(str::to_string),
            id_rol,
            ..SessionUser::default()
        }
    }

    fn auth() -> (AuthState, Arc<MemoryStorage>, Arc<MemoryStorage>) {
        let session = Arc::new(MemoryStorage::new());
        let local = Arc::new(MemoryStorage::new());
        (AuthState::new(session.clone(), local.clone()), session, local)
    }

    #[test]
    fn admin_evaluation_by_name_or_role_id() {
        assert!(AuthState::is_admin_user(&usuario(Some("Administrador"), None)));
        assert!(AuthState::is_admin_user(&usuario(None, Some(1))));
        assert!(AuthState::is_admin_user(&usuario(Some("1"), None)));
        assert!(!AuthState::is_admin_user(&usuario(Some("Cliente"), Some(2))));
        assert!(!AuthState::is_admin_user(&usuario(None, None)));
    }

    #[test]
    fn session_restores_from_session_storage_first() {
        let session = Arc::new(MemoryStorage::new());
        let local = Arc::new(MemoryStorage::new());

        let en_sesion = StoredSession {
            token: Some("t-sesion".to_string()),
            usuario: Some(usuario(Some("Cliente"), Some(2))),
        };
        session.set(SESSION_KEY, &serde_json::to_string(&en_sesion).unwrap());

        let en_local = StoredSession {
            token: Some("t-local".to_string()),
            usuario: Some(usuario(Some("Administrador"), Some(1))),
        };
        local.set(LOCAL_KEY, &serde_json::to_string(&en_local).unwrap());

        let auth = AuthState::new(session, local);
        assert_eq!(auth.token().as_deref(), Some("t-sesion"));
        // havia blob local: a preferência "recordar" segue ativa
        assert!(auth.remember_active());
    }

    #[test]
    fn clear_session_wipes_both_storages() {
        let (auth, session, local) = auth();
        auth.set_session(Some(usuario(Some("Administrador"), Some(1))), Some("tok".into()), true);

        assert!(auth.is_authenticated());
        assert!(auth.is_admin());
        assert!(session.get(SESSION_KEY).is_some());
        assert!(local.get(LOCAL_KEY).is_some());

        auth.clear_session();
        assert!(!auth.is_authenticated());
        assert!(!auth.is_admin());
        assert!(session.get(SESSION_KEY).is_none());
        assert!(local.get(LOCAL_KEY).is_none());
    }

    #[test]
    fn remember_false_keeps_local_storage_clean() {
        let (auth, _session, local) = auth();
        auth.set_session(Some(usuario(None, Some(2))), Some("tok".into()), false);
        assert!(local.get(LOCAL_KEY).is_none());
        assert!(!auth.remember_active());
    }

    #[test]
    fn update_profile_keeps_token_and_remember_choice() {
        let (auth, _session, local) = auth();
        auth.set_session(Some(usuario(Some("Cliente"), Some(2))), Some("tok".into()), true);

        auth.update_profile(usuario(Some("Administrador"), Some(1)), None);
        assert!(auth.is_admin());
        assert_eq!(auth.token().as_deref(), Some("tok"));
        assert!(local.get(LOCAL_KEY).is_some());
    }
}
