//! Clients - consumidores tipados de la API
//!
//! Cliente HTTP, estado de sesión observable y tablero de pendientes
//! del driver alimentado por el feed en tiempo real.

pub mod api_client;
pub mod dispatch_board;
pub mod session_state;

pub use api_client::{ApiClient, ClientError, ClientResult};
pub use dispatch_board::DispatchBoard;
pub use session_state::{AuthState, SessionState};
