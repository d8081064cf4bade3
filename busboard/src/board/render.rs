//! Presentation
//!
//! Turns the session state into a `Frame`, a complete description of what
//! the board shows. Every redraw builds a new frame from scratch and hands
//! it to a `Surface`, which replaces whatever it displayed before; nothing
//! is patched in place.
//!
//! Two layouts exist:
//! - the morning board, read-only: three status columns of route names;
//! - the afternoon board, interactive: the same columns plus the user's
//!   personal status, the seat-map and the action offered for the
//!   current seat selection.

use super::seatmap::{Affordance, SeatMap};
use super::state::SessionState;
use super::status::Vocabulary;
use crate::link::proto::{Ident, Route, Status};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoardKind {
    #[default]
    Morning,
    Afternoon,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RouteEntry {
    pub id: Ident,
    pub name: String,
    pub bus_number: Option<String>,
    pub is_user: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub status: Status,
    pub title: String,
    pub icon: String,
    pub color: String,
    pub routes: Vec<RouteEntry>,
    /// Set when `routes` is empty.
    pub empty: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Banner {
    pub text: String,
    /// The announcement mentions the user's route.
    pub alert: bool,
    /// The viewer may author announcements.
    pub editable: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PersonalPanel {
    pub assigned: bool,
    pub route_name: String,
    pub bus_number: Option<String>,
    pub status: Status,
    pub text: String,
    pub icon: String,
    pub color: String,
    pub alert: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeatCell {
    pub space: Ident,
    pub occupant: Option<RouteEntry>,
    pub selected: bool,
}

impl SeatCell {
    pub fn is_filled(&self) -> bool {
        self.occupant.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MorningFrame {
    pub columns: Vec<Column>,
    pub announcement: Option<Banner>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AfternoonFrame {
    pub columns: Vec<Column>,
    pub announcement: Option<Banner>,
    pub personal: PersonalPanel,
    pub action: Affordance,
    pub seats: Vec<SeatCell>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Morning(MorningFrame),
    Afternoon(AfternoonFrame),
}

impl Frame {
    pub fn columns(&self) -> &[Column] {
        match self {
            Frame::Morning(f) => &f.columns,
            Frame::Afternoon(f) => &f.columns,
        }
    }

    pub fn column(&self, status: Status) -> Option<&Column> {
        self.columns().iter().find(|c| c.status == status)
    }

    pub fn announcement(&self) -> Option<&Banner> {
        match self {
            Frame::Morning(f) => f.announcement.as_ref(),
            Frame::Afternoon(f) => f.announcement.as_ref(),
        }
    }
}

/// Where frames end up.
pub trait Surface {
    fn present(&mut self, frame: &Frame);
}

pub struct Presenter {
    kind: BoardKind,
}

impl Presenter {
    pub fn new(kind: BoardKind) -> Presenter {
        Presenter { kind }
    }

    pub fn kind(&self) -> BoardKind {
        self.kind
    }

    pub fn render(&self, state: &SessionState, vocab: &Vocabulary, seats: &SeatMap) -> Frame {
        let columns = Status::ALL
            .iter()
            .map(|status| column(*status, state, vocab))
            .collect();
        let announcement = banner(state);
        match self.kind {
            BoardKind::Morning => Frame::Morning(MorningFrame {
                columns,
                announcement,
            }),
            BoardKind::Afternoon => Frame::Afternoon(AfternoonFrame {
                columns,
                announcement,
                personal: personal(state, vocab),
                action: seats.affordance(state),
                seats: seat_cells(state, seats),
            }),
        }
    }
}

fn entry(route: &Route, state: &SessionState) -> RouteEntry {
    RouteEntry {
        id: route.id.clone(),
        name: route.route_name.clone(),
        bus_number: route.bus_number.clone(),
        is_user: state.user_route.as_ref() == Some(&route.id),
    }
}

fn column(status: Status, state: &SessionState, vocab: &Vocabulary) -> Column {
    let info = vocab.get(status);
    let routes: Vec<RouteEntry> = state
        .routes_with(status)
        .map(|r| entry(r, state))
        .collect();
    let empty = if routes.is_empty() {
        Some(info.empty.clone())
    } else {
        None
    };
    Column {
        status,
        title: info.name.clone(),
        icon: info.icon.clone(),
        color: info.color.clone(),
        routes,
        empty,
    }
}

fn banner(state: &SessionState) -> Option<Banner> {
    match (state.announcement(), state.is_admin()) {
        (None, false) => None,
        (text, editable) => Some(Banner {
            text: text.unwrap_or("").to_string(),
            alert: state.alert(),
            editable,
        }),
    }
}

fn personal(state: &SessionState, vocab: &Vocabulary) -> PersonalPanel {
    let route = state.user_route_or_placeholder();
    let info = vocab.get(route.status);
    PersonalPanel {
        assigned: state.user_route().is_some(),
        route_name: route.route_name,
        bus_number: route.bus_number,
        status: route.status,
        text: info.personal.clone(),
        icon: info.icon.clone(),
        color: info.color.clone(),
        alert: state.alert(),
    }
}

fn seat_cells(state: &SessionState, seats: &SeatMap) -> Vec<SeatCell> {
    seats
        .cells(state)
        .into_iter()
        .map(|space| SeatCell {
            occupant: state.route_at(&space).map(|r| entry(r, state)),
            selected: seats.selected() == Some(&space),
            space,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::alert::AlertPolicy;
    use crate::board::reconcile::reconcile;
    use crate::link::proto::Inbound;
    use std::collections::HashSet;

    fn apply(state: &mut SessionState, json: &str) {
        match Inbound::parse(json).unwrap() {
            Inbound::Snapshot(s) => {
                reconcile(state, s, &AlertPolicy::default());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    fn render(kind: BoardKind, state: &SessionState, seats: &SeatMap) -> Frame {
        Presenter::new(kind).render(state, &Vocabulary::standard(), seats)
    }

    #[test]
    fn columns_partition_latest_snapshot() {
        let snapshots = [
            r#"{"allRoutes": [{"id": 1, "status": "a", "route_name": "A"},
                              {"id": 2, "status": "o", "route_name": "B"},
                              {"id": 3, "status": "d", "route_name": "C"},
                              {"id": 4, "status": "a", "route_name": "D"}]}"#,
            r#"{"allRoutes": [{"id": 2, "status": "a", "route_name": "B"},
                              {"id": 5, "status": "o", "route_name": "E"}]}"#,
            r#"{"allRoutes": []}"#,
        ];
        let mut state = SessionState::new(false);
        for json in snapshots {
            apply(&mut state, json);
            let frame = render(BoardKind::Morning, &state, &SeatMap::default());
            assert_eq!(frame.columns().len(), 3);
            let mut seen = HashSet::new();
            for col in frame.columns() {
                for entry in &col.routes {
                    let route = state.route(&entry.id).expect("rendered unknown route");
                    assert_eq!(route.status, col.status);
                    assert!(seen.insert(entry.id.clone()), "route in two columns");
                }
                assert_eq!(col.empty.is_some(), col.routes.is_empty());
            }
            assert_eq!(seen.len(), state.routes().len());
        }
    }

    #[test]
    fn morning_board_is_names_only() {
        let mut state = SessionState::new(false);
        apply(
            &mut state,
            r#"{"allRoutes": [{"id": 1, "status": "a", "route_name": "West-JT"}]}"#,
        );
        let frame = render(BoardKind::Morning, &state, &SeatMap::default());
        let arrived = frame.column(Status::Arrived).unwrap();
        assert_eq!(arrived.routes[0].name, "West-JT");
        assert_eq!(
            frame.column(Status::Delayed).unwrap().empty.as_deref(),
            Some("There are no delayed buses.")
        );
        assert!(matches!(frame, Frame::Morning(_)));
        assert!(frame.announcement().is_none());
    }

    #[test]
    fn afternoon_board_personal_and_seats() {
        let mut state = SessionState::new(false);
        apply(
            &mut state,
            r#"{"allRoutes": [{"id": 1, "status": "d", "route_name": "Oak",
                               "bus_number": "7", "space": "S1"}],
                "userRouteId": 1, "announcement": "Oak is late"}"#,
        );
        let mut seats = SeatMap::new(vec!["S1".into(), "S2".into()]);
        seats.click(Some(&Ident::from("S2")), &state);
        let frame = match render(BoardKind::Afternoon, &state, &seats) {
            Frame::Afternoon(f) => f,
            other => panic!("unexpected {:?}", other),
        };
        assert!(frame.personal.assigned);
        assert_eq!(frame.personal.text, "Your bus is delayed.");
        assert_eq!(frame.personal.bus_number.as_deref(), Some("7"));
        assert!(frame.personal.alert);
        assert_eq!(frame.action, Affordance::Assign);
        assert_eq!(frame.seats.len(), 2);
        assert!(frame.seats[0].is_filled());
        assert!(!frame.seats[1].is_filled());
        assert!(frame.seats[1].selected);
        let banner = frame.announcement.unwrap();
        assert!(banner.alert);
        assert!(!banner.editable);
    }

    #[test]
    fn unassigned_user_gets_placeholder() {
        let mut state = SessionState::new(true);
        apply(&mut state, r#"{"allRoutes": []}"#);
        let frame = match render(BoardKind::Afternoon, &state, &SeatMap::default()) {
            Frame::Afternoon(f) => f,
            other => panic!("unexpected {:?}", other),
        };
        assert!(!frame.personal.assigned);
        assert_eq!(frame.personal.route_name, "Unassigned");
        assert_eq!(frame.action, Affordance::Idle);
        // admins always get the authoring banner
        let banner = frame.announcement.unwrap();
        assert!(banner.editable);
        assert_eq!(banner.text, "");
    }
}
