//! ALD Transport - backend de solicitudes de transporte
//!
//! Empresas y pasajeros crean solicitudes, los drivers las reclaman y
//! ejecutan, y los controladores supervisan todo con alertas de pendientes.

pub mod cache;
pub mod clients;
pub mod config;
pub mod controllers;
pub mod database;
pub mod dto;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod state;
pub mod storage;
pub mod utils;

pub use routes::create_router;
pub use state::AppState;
