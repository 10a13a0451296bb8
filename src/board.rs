//! Pure board rules for tic-tac-toe.
//!
//! No side effects and no knowledge of players or storage; the match state
//! machine owns all of that. A cell is `None` while empty, which keeps the
//! serialized form a 9-element array of `null | "X" | "O"`.

use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};

/// Number of cells on the board.
pub const BOARD_CELLS: usize = 9;

/// The eight winning lines: three rows, three columns, two diagonals.
pub const WIN_LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

/// Turn marker. X always moves first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
pub enum Mark {
    /// First player's marker.
    X,
    /// Second player's marker.
    O,
}

impl Mark {
    /// Returns the other marker.
    pub fn opponent(self) -> Self {
        match self {
            Mark::X => Mark::O,
            Mark::O => Mark::X,
        }
    }
}

/// Rejected board mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Error)]
pub enum IllegalMove {
    /// The target cell already holds a mark.
    #[display("cell is already occupied")]
    CellOccupied,
    /// The cell index is outside `0..9`.
    #[display("cell index out of bounds (must be 0-8)")]
    OutOfBounds,
}

/// 3x3 board, cells in row-major order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Board {
    cells: [Option<Mark>; BOARD_CELLS],
}

impl Board {
    /// Creates an empty board.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cell at `index`, or `None` if out of bounds.
    pub fn get(&self, index: usize) -> Option<Option<Mark>> {
        self.cells.get(index).copied()
    }

    /// Checks whether the cell at `index` is on the board and empty.
    pub fn is_empty_cell(&self, index: usize) -> bool {
        matches!(self.get(index), Some(None))
    }

    /// Places `mark` at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`IllegalMove`] if the index is out of bounds or the cell is
    /// already occupied.
    pub fn apply(&mut self, index: usize, mark: Mark) -> Result<(), IllegalMove> {
        if index >= BOARD_CELLS {
            return Err(IllegalMove::OutOfBounds);
        }
        if self.cells[index].is_some() {
            return Err(IllegalMove::CellOccupied);
        }
        self.cells[index] = Some(mark);
        Ok(())
    }

    /// Returns a new board with `mark` placed at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`IllegalMove`] under the same conditions as [`Board::apply`].
    pub fn with_move(&self, index: usize, mark: Mark) -> Result<Self, IllegalMove> {
        let mut next = *self;
        next.apply(index, mark)?;
        Ok(next)
    }

    /// Checks whether `mark` occupies any full winning line.
    ///
    /// Callers evaluate this only for the symbol that just moved; a single
    /// move cannot complete a line for the opponent.
    pub fn has_win(&self, mark: Mark) -> bool {
        WIN_LINES
            .iter()
            .any(|line| line.iter().all(|&i| self.cells[i] == Some(mark)))
    }

    /// Returns the winning mark, if any line is complete.
    pub fn winner(&self) -> Option<Mark> {
        [Mark::X, Mark::O].into_iter().find(|&m| self.has_win(m))
    }

    /// Checks whether every cell is occupied.
    pub fn is_full(&self) -> bool {
        self.cells.iter().all(|c| c.is_some())
    }

    /// Checks for a draw: every cell occupied and no winner.
    pub fn is_draw(&self) -> bool {
        self.is_full() && self.winner().is_none()
    }

    /// Returns the cells as a slice.
    pub fn cells(&self) -> &[Option<Mark>; BOARD_CELLS] {
        &self.cells
    }

    /// Formats the board as a three-line grid for logs.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for row in 0..3 {
            for col in 0..3 {
                let cell = match self.cells[row * 3 + col] {
                    None => '.',
                    Some(Mark::X) => 'X',
                    Some(Mark::O) => 'O',
                };
                out.push(cell);
                if col < 2 {
                    out.push('|');
                }
            }
            if row < 2 {
                out.push('\n');
            }
        }
        out
    }
}
