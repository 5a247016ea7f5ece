//! Estado de sesión del cliente
//!
//! Se crea al arrancar el cliente en `SignedOut`, se actualiza en cada
//! sign-in, sign-out o expiración, y notifica a los observadores por un
//! canal `watch`. Al hacer drop los receptores ven el canal cerrado.

use chrono::Utc;
use tokio::sync::watch;
use tracing::debug;

use crate::models::auth::Session;

#[derive(Debug, Clone, PartialEq)]
pub enum AuthState {
    SignedOut,
    SignedIn(Box<Session>),
}

impl AuthState {
    pub fn is_signed_in(&self) -> bool {
        matches!(self, AuthState::SignedIn(_))
    }
}

pub struct SessionState {
    tx: watch::Sender<AuthState>,
}

impl SessionState {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(AuthState::SignedOut);
        Self { tx }
    }

    pub fn signed_in(&self, session: Session) {
        debug!("🔑 Sesión iniciada para {}", session.user.email);
        self.tx.send_replace(AuthState::SignedIn(Box::new(session)));
    }

    pub fn signed_out(&self) {
        let previous = self.tx.send_replace(AuthState::SignedOut);
        if previous.is_signed_in() {
            debug!("🔒 Sesión cerrada");
        }
    }

    /// Estado actual; una sesión vencida pasa a `SignedOut`
    pub fn current(&self) -> AuthState {
        let state = self.tx.borrow().clone();
        match state {
            AuthState::SignedIn(session) if session.expires_at <= Utc::now() => {
                self.signed_out();
                AuthState::SignedOut
            }
            other => other,
        }
    }

    pub fn access_token(&self) -> Option<String> {
        match self.current() {
            AuthState::SignedIn(session) => Some(session.access_token),
            AuthState::SignedOut => None,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.tx.subscribe()
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}
