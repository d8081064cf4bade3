//! Board session
//!
//! A `Session` is the single owner of the board state for one page load.
//! It consumes link `Event`s one at a time, in delivery order:
//! - `Connected`, `Disconnected` and `ConnectFailed` update connectivity
//!   and notices,
//! - `Message` snapshots are reconciled and trigger a full redraw,
//! - everything else is diagnostics and left to the caller.
//!
//! User actions go the other way, straight to the server. The session
//! never changes a route locally; the next snapshot is the only truth.

use super::alert::AlertPolicy;
use super::config::BoardConfig;
use super::notice::{Notice, Notifier};
use super::reconcile::{reconcile, Reconciled};
use super::render::{BoardKind, Presenter, Surface};
use super::seatmap::{SeatEvent, SeatMap};
use super::state::SessionState;
use super::status::Vocabulary;
use crate::link::client::{Event, Outlet};
use crate::link::proto::{Ident, Outbound, Status};

use chrono::NaiveDateTime;
use serde_json::{Map, Value};

/// Context tag sent with assignment changes.
pub static ASSIGNMENT_TIME: &str = "afternoon";

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SessionError {
    #[error("the morning board is read-only")]
    ReadOnlyBoard,

    #[error("no space is selected")]
    NothingSelected,

    #[error("the selected space is already taken")]
    SpaceTaken,

    #[error("the selected space is empty")]
    SpaceEmpty,

    #[error("only administrators can post announcements")]
    NotPermitted,

    #[error("the link to the server is gone")]
    LinkDown,
}

pub struct Session<S: Surface, O: Outlet> {
    state: SessionState,
    vocab: Vocabulary,
    alerts: AlertPolicy,
    seats: SeatMap,
    presenter: Presenter,
    surface: S,
    notifier: Option<Box<dyn Notifier>>,
    outlet: O,
    disconnect_shown: bool,
}

impl<S: Surface, O: Outlet> Session<S, O> {
    /// `now` fixes the status vocabulary for the whole session.
    pub fn new(config: &BoardConfig, now: NaiveDateTime, surface: S, outlet: O) -> Session<S, O> {
        Session {
            state: SessionState::new(config.admin),
            vocab: config.vocabulary(now),
            alerts: config.alert_policy(),
            seats: SeatMap::new(config.spaces.clone()),
            presenter: Presenter::new(config.board),
            surface,
            notifier: None,
            outlet,
            disconnect_shown: false,
        }
    }

    pub fn with_notifier(mut self, notifier: Box<dyn Notifier>) -> Session<S, O> {
        self.notifier = Some(notifier);
        self
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocab
    }

    pub fn seat_map(&self) -> &SeatMap {
        &self.seats
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn kind(&self) -> BoardKind {
        self.presenter.kind()
    }

    /// Dispatches one link event. Returns the reconciliation outcome for
    /// snapshot messages.
    pub fn handle(&mut self, event: Event) -> Option<Reconciled> {
        match event {
            Event::Connected => {
                self.connected();
                None
            }
            Event::Disconnected | Event::ConnectFailed(_) => {
                self.disconnected();
                None
            }
            Event::Message(snapshot) => {
                let outcome = reconcile(&mut self.state, snapshot, &self.alerts);
                match &outcome {
                    Reconciled::Applied { .. } => self.redraw(),
                    Reconciled::Rejected(error) => {
                        self.notify(Notice::error(error));
                    }
                }
                Some(outcome)
            }
            _ => None,
        }
    }

    fn notify(&mut self, notice: Notice) -> bool {
        match self.notifier.as_mut() {
            Some(notifier) => {
                notifier.notify(notice);
                true
            }
            None => false,
        }
    }

    fn connected(&mut self) {
        self.state.set_connected(true);
        if self.disconnect_shown {
            self.notify(Notice::restored());
            self.disconnect_shown = false;
        }
    }

    fn disconnected(&mut self) {
        self.state.set_connected(false);
        if !self.disconnect_shown {
            self.disconnect_shown = self.notify(Notice::disconnected());
        }
    }

    /// Builds a new frame from the current state and presents it.
    pub fn redraw(&mut self) {
        let frame = self.presenter.render(&self.state, &self.vocab, &self.seats);
        self.surface.present(&frame);
    }

    fn interactive(&self) -> Result<(), SessionError> {
        match self.presenter.kind() {
            BoardKind::Afternoon => Ok(()),
            BoardKind::Morning => Err(SessionError::ReadOnlyBoard),
        }
    }

    fn send(&self, msg: Outbound) -> Result<(), SessionError> {
        self.outlet.send(msg).map_err(|_| SessionError::LinkDown)
    }

    /// Seat-map click; `None` is a click outside every cell.
    pub fn click_seat(&mut self, target: Option<&Ident>) -> Result<SeatEvent, SessionError> {
        self.interactive()?;
        let event = self.seats.click(target, &self.state);
        self.redraw();
        Ok(event)
    }

    pub fn set_status(&self, id: Ident, status: Status) -> Result<(), SessionError> {
        self.interactive()?;
        self.send(Outbound::SetStatus { id, status })
    }

    /// Generic assignment change with caller supplied fields.
    pub fn assign(&self, id: Ident, extra: Map<String, Value>) -> Result<(), SessionError> {
        self.interactive()?;
        self.send(Outbound::Assign {
            id,
            time: ASSIGNMENT_TIME.to_string(),
            extra,
        })
    }

    /// Puts `route` into the selected (empty) space.
    pub fn assign_selected(&self, route: Ident) -> Result<(), SessionError> {
        self.interactive()?;
        let space = self.seats.selected().ok_or(SessionError::NothingSelected)?;
        if self.state.route_at(space).is_some() {
            return Err(SessionError::SpaceTaken);
        }
        let mut extra = Map::new();
        extra.insert("space".to_string(), serde_json::json!(space));
        self.assign(route, extra)
    }

    /// Takes the occupying route out of the selected space.
    pub fn clear_selected(&self) -> Result<(), SessionError> {
        self.interactive()?;
        let space = self.seats.selected().ok_or(SessionError::NothingSelected)?;
        let occupant = self
            .state
            .route_at(space)
            .ok_or(SessionError::SpaceEmpty)?;
        let mut extra = Map::new();
        extra.insert("space".to_string(), Value::Null);
        self.assign(occupant.id.clone(), extra)
    }

    pub fn announce(&self, text: &str) -> Result<(), SessionError> {
        if !self.state.is_admin() {
            return Err(SessionError::NotPermitted);
        }
        self.send(Outbound::Announce(text.to_string()))
    }
}
