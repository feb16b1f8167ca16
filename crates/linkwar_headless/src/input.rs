//! Pointer gestures to game commands.
//!
//! Press on one of your towers to select it, release over another tower to
//! connect them. A click on a connection line (and not on a tower) removes
//! that connection. Coordinates are canvas units, the same space the world
//! generator places towers in.

use linkwar_core::components::{Owner, TowerId};
use linkwar_core::game::{Command, Game};
use linkwar_core::geometry::{point_in_circle, point_segment_distance_squared};
use linkwar_core::map_generation::GameMode;
use linkwar_core::math::{Fixed, Vec2Fixed};

/// Distance from a connection line that still counts as a click on it.
pub const LINE_HIT_TOLERANCE: i32 = 6;

/// What a pointer event turned into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerAction {
    /// Nothing to do.
    None,
    /// A tower is now selected as the source of a drag.
    Selected(TowerId),
    /// A command ready for [`Game::apply_command`].
    Command(Command),
}

/// Turns press/move/release events into [`Command`]s.
#[derive(Debug, Clone, Default)]
pub struct PointerTranslator {
    selected: Option<TowerId>,
    hovered: Option<TowerId>,
}

impl PointerTranslator {
    /// Create a translator with nothing selected.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Tower picked as a drag source, if any.
    #[must_use]
    pub const fn selected(&self) -> Option<TowerId> {
        self.selected
    }

    /// Tower under the pointer after the last move.
    #[must_use]
    pub const fn hovered(&self) -> Option<TowerId> {
        self.hovered
    }

    /// Drop any selection, e.g. after a restart.
    pub fn reset(&mut self) {
        self.selected = None;
        self.hovered = None;
    }

    /// Pointer pressed at `point`.
    pub fn pointer_down(&mut self, game: &Game, point: Vec2Fixed) -> PointerAction {
        let actor = acting_player(game);
        self.selected = None;

        if let Some(tower) = tower_at(game, point) {
            let owned = game.simulation().tower(tower).map(|t| t.owner) == Some(actor);
            if owned {
                self.selected = Some(tower);
                return PointerAction::Selected(tower);
            }
            return PointerAction::None;
        }

        match connection_at(game, point, actor) {
            Some(index) => PointerAction::Command(Command::Disconnect { actor, index }),
            None => PointerAction::None,
        }
    }

    /// Pointer released at `point`.
    pub fn pointer_up(&mut self, game: &Game, point: Vec2Fixed) -> PointerAction {
        let Some(from) = self.selected.take() else {
            return PointerAction::None;
        };
        match tower_at(game, point) {
            Some(to) if to != from => PointerAction::Command(Command::Connect {
                actor: acting_player(game),
                from,
                to,
            }),
            _ => PointerAction::None,
        }
    }

    /// Pointer moved to `point`. Returns the hovered tower.
    pub fn pointer_move(&mut self, game: &Game, point: Vec2Fixed) -> Option<TowerId> {
        self.hovered = tower_at(game, point);
        self.hovered
    }
}

/// Player whose gestures are being translated.
#[must_use]
pub fn acting_player(game: &Game) -> Owner {
    match game.mode() {
        GameMode::Singleplayer => Owner::Player1,
        GameMode::Multiplayer => game.current_player(),
    }
}

/// First tower whose hit circle contains `point`.
#[must_use]
pub fn tower_at(game: &Game, point: Vec2Fixed) -> Option<TowerId> {
    let radius = game.simulation().rules().tower_radius;
    game.simulation()
        .towers()
        .iter()
        .position(|tower| point_in_circle(point, tower.position, radius))
}

/// First connection owned by `actor` whose line passes within
/// [`LINE_HIT_TOLERANCE`] of `point`.
#[must_use]
pub fn connection_at(game: &Game, point: Vec2Fixed, actor: Owner) -> Option<usize> {
    let sim = game.simulation();
    let tolerance = Fixed::from_num(LINE_HIT_TOLERANCE);
    let tolerance_sq = tolerance * tolerance;

    sim.connections().iter().position(|connection| {
        let (Some(from), Some(to)) = (sim.tower(connection.from), sim.tower(connection.to)) else {
            return false;
        };
        from.owner == actor
            && point_segment_distance_squared(point, from.position, to.position) <= tolerance_sq
    })
}
