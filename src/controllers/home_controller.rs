//! Vista inicial por rol
//!
//! Se carga el perfil y se despacha una sola vez sobre `Role`.

use crate::controllers::alert_controller::AlertController;
use crate::controllers::driver_controller::DriverController;
use crate::controllers::profile_controller::ProfileController;
use crate::controllers::transport_request_controller::TransportRequestController;
use crate::dto::home_dto::HomeView;
use crate::models::alert::AlertFilters;
use crate::models::auth::Actor;
use crate::models::profile::Role;
use crate::state::AppState;
use crate::utils::errors::AppResult;

const BOARD_LIMIT: i64 = 50;

pub struct HomeController {
    profiles: ProfileController,
    requests: TransportRequestController,
    drivers: DriverController,
    alerts: AlertController,
}

impl HomeController {
    pub fn new(state: &AppState) -> Self {
        Self {
            profiles: ProfileController::new(state),
            requests: TransportRequestController::new(state),
            drivers: DriverController::new(state),
            alerts: AlertController::new(state),
        }
    }

    pub async fn view(&self, actor: &Actor) -> AppResult<HomeView> {
        let profile = self.profiles.get(actor).await?;
        // El rol del perfil es la fuente de verdad, no el del token
        let actor = Actor {
            id: profile.id,
            role: profile.role,
        };

        let view = match profile.role {
            Role::Company | Role::Passenger => HomeView::Requester {
                requests: self.requests.list_mine(&actor, BOARD_LIMIT).await?,
                profile,
            },
            Role::Driver => HomeView::Driver {
                pending: self.requests.list_pending(&actor, BOARD_LIMIT).await?,
                active: self.requests.list_driver_active(actor.id).await?,
                details: self.drivers.find(&actor).await?,
                profile,
            },
            Role::Controller => HomeView::Controller {
                alerts: self
                    .alerts
                    .list(&AlertFilters {
                        unresolved_only: Some(true),
                        request_id: None,
                    })
                    .await?,
                active: self.requests.list_active(BOARD_LIMIT * 2).await?,
                profile,
            },
        };

        Ok(view)
    }
}
