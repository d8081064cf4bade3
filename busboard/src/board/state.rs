//! Session state
//!
//! The one mutable structure of a board session. It is owned by the
//! `Session`, updated only by `reconcile` and the connection callbacks, and
//! read by the presenter.

use crate::link::proto::{Ident, Route, Status};

/// Name shown for a user without a resolved route.
pub static UNASSIGNED_ROUTE_NAME: &str = "Unassigned";

#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub(crate) routes: Vec<Route>,
    /// Identifier of the resolved user route. Always refers to a route in
    /// `routes` when set.
    pub(crate) user_route: Option<Ident>,
    /// Name supplied by the server for alert matching.
    pub(crate) user_route_name: Option<String>,
    pub(crate) announcement: Option<String>,
    pub(crate) alert: bool,
    pub(crate) admin: bool,
    pub(crate) connected: bool,
}

impl SessionState {
    pub fn new(admin: bool) -> SessionState {
        SessionState {
            admin,
            ..Default::default()
        }
    }

    /// All routes of the latest snapshot, in server order.
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn route(&self, id: &Ident) -> Option<&Route> {
        self.routes.iter().find(|r| r.id == *id)
    }

    pub fn routes_with(&self, status: Status) -> impl Iterator<Item = &Route> {
        self.routes.iter().filter(move |r| r.status == status)
    }

    /// Route occupying a seat-map space.
    pub fn route_at(&self, space: &Ident) -> Option<&Route> {
        self.routes
            .iter()
            .find(|r| r.space.as_ref() == Some(space))
    }

    pub fn user_route(&self) -> Option<&Route> {
        self.user_route.as_ref().and_then(|id| self.route(id))
    }

    /// The resolved user route, or a placeholder that is never stored.
    pub fn user_route_or_placeholder(&self) -> Route {
        match self.user_route() {
            Some(route) => route.clone(),
            None => Route {
                id: Ident::Text(String::new()),
                status: Status::OnTime,
                bus_number: None,
                route_name: UNASSIGNED_ROUTE_NAME.to_string(),
                space: None,
            },
        }
    }

    pub fn user_route_name(&self) -> Option<&str> {
        self.user_route_name.as_deref()
    }

    pub fn announcement(&self) -> Option<&str> {
        self.announcement.as_deref()
    }

    /// True when the current announcement mentions the user's route.
    pub fn alert(&self) -> bool {
        self.alert
    }

    pub fn is_admin(&self) -> bool {
        self.admin
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub(crate) fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }
}
