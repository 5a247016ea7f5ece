//! Tablero de solicitudes pendientes de un driver
//!
//! Lista sin duplicados, la más reciente primero. Las entregas del feed
//! pueden llegar repetidas o desordenadas: se ignoran las copias con
//! `updated_at` más viejo, y una solicitud que dejó `pending` no vuelve.
//! Se recuerdan hasta `RETIRED_CAPACITY` solicitudes retiradas; al pasar
//! el límite se olvida la más antigua.

use serde::Deserialize;
use std::collections::{HashSet, VecDeque};
use tracing::debug;
use uuid::Uuid;

use crate::dto::request_dto::ClaimOutcome;
use crate::models::transport_request::{RequestStatus, TransportRequest};
use crate::services::realtime_service::{ChangeEvent, Entity};

#[derive(Debug, Deserialize)]
struct RetiredRecord {
    id: Uuid,
    status: RequestStatus,
}

pub const RETIRED_CAPACITY: usize = 1024;

#[derive(Debug)]
pub struct DispatchBoard {
    requests: Vec<TransportRequest>,
    retired: HashSet<Uuid>,
    retired_order: VecDeque<Uuid>,
    retired_capacity: usize,
}

impl Default for DispatchBoard {
    fn default() -> Self {
        Self::with_retired_capacity(RETIRED_CAPACITY)
    }
}

impl DispatchBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retired_capacity(capacity: usize) -> Self {
        Self {
            requests: Vec::new(),
            retired: HashSet::new(),
            retired_order: VecDeque::new(),
            retired_capacity: capacity.max(1),
        }
    }

    /// Cargar el listado inicial (`GET /api/requests/pending`)
    pub fn from_snapshot(snapshot: Vec<TransportRequest>) -> Self {
        let mut board = Self::new();
        for request in snapshot {
            board.upsert(request);
        }
        board
    }

    pub fn requests(&self) -> &[TransportRequest] {
        &self.requests
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.requests.iter().any(|r| r.id == id)
    }

    /// Aplicar una entrega del feed. Devuelve si el tablero cambió.
    pub fn apply(&mut self, event: &ChangeEvent) -> bool {
        if event.entity != Entity::TransportRequests {
            return false;
        }

        if let Ok(request) = serde_json::from_value::<TransportRequest>(event.record.clone()) {
            return self.upsert(request);
        }

        // Registro reducido: la solicitud salió de pending para otro driver
        match serde_json::from_value::<RetiredRecord>(event.record.clone()) {
            Ok(stub) if stub.status != RequestStatus::Pending => self.retire(stub.id),
            Ok(_) => false,
            Err(e) => {
                debug!("Evento ignorado, registro inválido: {}", e);
                false
            }
        }
    }

    /// Insertar o actualizar; fuera de `pending` se quita del tablero
    pub fn upsert(&mut self, request: TransportRequest) -> bool {
        if self.retired.contains(&request.id) {
            return false;
        }

        if request.status != RequestStatus::Pending {
            return self.retire(request.id);
        }

        match self.requests.iter().position(|r| r.id == request.id) {
            Some(index) if self.requests[index].updated_at > request.updated_at => false,
            Some(index) => {
                self.requests[index] = request;
                true
            }
            None => {
                // Más reciente primero
                let index = self
                    .requests
                    .iter()
                    .position(|r| r.created_at < request.created_at)
                    .unwrap_or(self.requests.len());
                self.requests.insert(index, request);
                true
            }
        }
    }

    /// Tras un claim, gane o pierda, la solicitud deja el tablero
    pub fn record_claim(&mut self, id: Uuid, outcome: &ClaimOutcome) -> bool {
        if let ClaimOutcome::Unavailable = outcome {
            debug!("Solicitud {} ya no está disponible", id);
        }
        self.retire(id)
    }

    fn retire(&mut self, id: Uuid) -> bool {
        if self.retired.insert(id) {
            self.retired_order.push_back(id);
            while self.retired_order.len() > self.retired_capacity {
                if let Some(oldest) = self.retired_order.pop_front() {
                    self.retired.remove(&oldest);
                }
            }
        }
        let before = self.requests.len();
        self.requests.retain(|r| r.id != id);
        before != self.requests.len()
    }
}
