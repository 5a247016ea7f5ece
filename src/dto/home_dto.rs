use serde::{Deserialize, Serialize};

use crate::models::alert::Alert;
use crate::models::driver::DriverDetails;
use crate::models::profile::Profile;
use crate::models::transport_request::TransportRequest;

/// Vista inicial según el rol del perfil
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum HomeView {
    Requester {
        profile: Profile,
        requests: Vec<TransportRequest>,
    },
    Driver {
        profile: Profile,
        pending: Vec<TransportRequest>,
        active: Vec<TransportRequest>,
        details: Option<DriverDetails>,
    },
    Controller {
        profile: Profile,
        alerts: Vec<Alert>,
        active: Vec<TransportRequest>,
    },
}
