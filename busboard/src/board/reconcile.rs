//! Reconciliation
//!
//! Folds one snapshot into the session state. The route collection is
//! always replaced as a whole, never patched field by field. The user
//! route is resolved again on every replacement: an explicit identifier
//! from the server is used as given (unassigned if it names no route),
//! otherwise the previously resolved identifier is kept while its route
//! is still present.

use super::alert::AlertPolicy;
use super::state::SessionState;
use crate::link::proto::{Ident, Route, Snapshot, Status};

/// A route whose status differs from the previous snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub id: Ident,
    pub route_name: String,
    /// `None` for a route not present in the previous snapshot.
    pub from: Option<Status>,
    pub to: Status,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Reconciled {
    /// The snapshot was applied; the board must be redrawn.
    Applied {
        transitions: Vec<Transition>,
        user_route_changed: bool,
    },
    /// The server reported an error; nothing was applied.
    Rejected(String),
}

fn transitions(old: &[Route], new: &[Route]) -> Vec<Transition> {
    new.iter()
        .filter_map(|route| {
            let from = old.iter().find(|r| r.id == route.id).map(|r| r.status);
            if from == Some(route.status) {
                None
            } else {
                Some(Transition {
                    id: route.id.clone(),
                    route_name: route.route_name.clone(),
                    from,
                    to: route.status,
                })
            }
        })
        .collect()
}

fn non_empty(text: Option<String>) -> Option<String> {
    text.filter(|t| !t.trim().is_empty())
}

pub fn reconcile(state: &mut SessionState, snapshot: Snapshot, policy: &AlertPolicy) -> Reconciled {
    if let Some(error) = snapshot.error {
        return Reconciled::Rejected(error);
    }

    let previous_user = state.user_route.clone();
    let mut changes = Vec::new();
    let replaced = snapshot.all_routes.is_some();
    if let Some(routes) = snapshot.all_routes {
        changes = transitions(&state.routes, &routes);
        state.routes = routes;
    }

    match (snapshot.user_route_name, &snapshot.user_route_id) {
        (Some(name), _) => state.user_route_name = non_empty(Some(name)),
        // a new assignment without a name invalidates the old one
        (None, Some(_)) => state.user_route_name = None,
        (None, None) => {}
    }

    if replaced || snapshot.user_route_id.is_some() {
        state.user_route = match snapshot.user_route_id {
            Some(id) => state.route(&id).map(|_| id),
            None => previous_user.clone().filter(|id| state.route(id).is_some()),
        };
    }

    match non_empty(snapshot.announcement) {
        Some(text) => {
            let name = match state.user_route_name() {
                Some(name) => Some(name.to_string()),
                None => state.user_route().map(|r| r.route_name.clone()),
            };
            state.alert = match name {
                Some(name) => policy.matches(&text, &name),
                None => false,
            };
            state.announcement = Some(text);
        }
        None => {
            state.announcement = None;
            state.alert = false;
        }
    }

    Reconciled::Applied {
        transitions: changes,
        user_route_changed: state.user_route != previous_user,
    }
}
