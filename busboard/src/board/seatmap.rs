//! Seat-map
//!
//! The afternoon board shows the bus loading area as a set of cells
//! ("spaces"). A cell is filled when a route of the current snapshot
//! occupies it. Selecting cells is purely local and only decides which
//! action the board offers; assignments are changed by the server.

use super::state::SessionState;
use crate::link::proto::Ident;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeatEvent {
    SelectFilled(Ident),
    SelectEmpty(Ident),
    Deselect,
}

/// Action offered next to the seat-map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Affordance {
    /// Nothing selected.
    Idle,
    /// An empty cell is selected: a route can be put there.
    Assign,
    /// A filled cell is selected: its route can be taken out.
    Clear,
}

impl Affordance {
    pub fn icon(&self) -> &'static str {
        match self {
            Affordance::Idle => "bus",
            Affordance::Assign => "plus",
            Affordance::Clear => "times",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Affordance::Idle => "Select a space",
            Affordance::Assign => "Assign a route to this space",
            Affordance::Clear => "Remove the route from this space",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SeatMap {
    configured: Vec<Ident>,
    selected: Option<Ident>,
}

impl SeatMap {
    pub fn new(spaces: Vec<Ident>) -> SeatMap {
        let mut configured: Vec<Ident> = Vec::with_capacity(spaces.len());
        for space in spaces {
            if !configured.contains(&space) {
                configured.push(space);
            }
        }
        SeatMap {
            configured,
            selected: None,
        }
    }

    /// Configured cells, then cells only known from the snapshot.
    pub fn cells(&self, state: &SessionState) -> Vec<Ident> {
        let mut cells = self.configured.clone();
        for route in state.routes() {
            if let Some(space) = &route.space {
                if !cells.contains(space) {
                    cells.push(space.clone());
                }
            }
        }
        cells
    }

    pub fn selected(&self) -> Option<&Ident> {
        self.selected.as_ref()
    }

    /// `target` is the cell under the click, `None` for a click outside
    /// every cell.
    pub fn click(&mut self, target: Option<&Ident>, state: &SessionState) -> SeatEvent {
        let cell = match target {
            Some(cell) if self.cells(state).contains(cell) => cell,
            _ => {
                self.selected = None;
                return SeatEvent::Deselect;
            }
        };
        if self.selected.as_ref() == Some(cell) {
            self.selected = None;
            return SeatEvent::Deselect;
        }
        self.selected = Some(cell.clone());
        if state.route_at(cell).is_some() {
            SeatEvent::SelectFilled(cell.clone())
        } else {
            SeatEvent::SelectEmpty(cell.clone())
        }
    }

    /// Derived from the current snapshot, so a selected cell that gets
    /// filled or emptied by the server changes the offered action.
    pub fn affordance(&self, state: &SessionState) -> Affordance {
        match &self.selected {
            None => Affordance::Idle,
            Some(cell) => {
                if state.route_at(cell).is_some() {
                    Affordance::Clear
                } else {
                    Affordance::Assign
                }
            }
        }
    }
}
