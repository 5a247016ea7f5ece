//! Utilidades del sistema
//!
//! Manejo de errores y validaciones compartidas por los DTOs.

pub mod errors;
pub mod validation;
