//! Tests for the pure board rules.

use gridmatch::{Board, IllegalMove, Mark, WIN_LINES};

/// Builds a board with `mark` at the given cells.
fn board_with(cells: &[usize], mark: Mark) -> Board {
    let mut board = Board::new();
    for &cell in cells {
        board.apply(cell, mark).expect("Cell should be placeable");
    }
    board
}

#[test]
fn test_empty_board_has_no_winner() {
    let board = Board::new();
    assert!(!board.has_win(Mark::X));
    assert!(!board.has_win(Mark::O));
    assert_eq!(board.winner(), None);
    assert!(!board.is_full());
    assert!(!board.is_draw());
}

#[test]
fn test_every_winning_line_is_detected() {
    for line in WIN_LINES {
        let board = board_with(&line, Mark::X);
        assert!(board.has_win(Mark::X), "Line {line:?} should win for X");
        assert!(!board.has_win(Mark::O), "Line {line:?} should not win for O");
        assert_eq!(board.winner(), Some(Mark::X));
    }
}

#[test]
fn test_two_of_three_is_not_a_win() {
    let board = board_with(&[0, 1], Mark::X);
    assert!(!board.has_win(Mark::X));
    assert_eq!(board.winner(), None);
}

#[test]
fn test_mixed_line_is_not_a_win() {
    let mut board = board_with(&[0, 2], Mark::X);
    board.apply(1, Mark::O).expect("Cell 1 is empty");
    assert!(!board.has_win(Mark::X));
    assert!(!board.has_win(Mark::O));
}

#[test]
fn test_apply_occupied_cell_fails() {
    let mut board = board_with(&[4], Mark::X);
    let result = board.apply(4, Mark::O);
    assert_eq!(result, Err(IllegalMove::CellOccupied));
    // The occupant is untouched.
    assert_eq!(board.get(4), Some(Some(Mark::X)));
}

#[test]
fn test_apply_out_of_bounds_fails() {
    let mut board = Board::new();
    assert_eq!(board.apply(9, Mark::X), Err(IllegalMove::OutOfBounds));
}

#[test]
fn test_with_move_leaves_original_unchanged() {
    let board = Board::new();
    let next = board.with_move(0, Mark::X).expect("Cell 0 is empty");
    assert!(board.is_empty_cell(0));
    assert_eq!(next.get(0), Some(Some(Mark::X)));
}

#[test]
fn test_full_board_without_line_is_a_draw() {
    // X: 0 2 3 7 8, O: 1 4 5 6 - no complete line.
    let mut board = board_with(&[0, 2, 3, 7, 8], Mark::X);
    for cell in [1, 4, 5, 6] {
        board.apply(cell, Mark::O).expect("Cell should be empty");
    }
    assert!(board.is_full());
    assert_eq!(board.winner(), None);
    assert!(board.is_draw());
}

#[test]
fn test_full_board_with_line_is_not_a_draw() {
    let mut board = board_with(&[0, 1, 2, 7, 8], Mark::X);
    for cell in [3, 4, 5, 6] {
        board.apply(cell, Mark::O).expect("Cell should be empty");
    }
    assert!(board.is_full());
    assert_eq!(board.winner(), Some(Mark::X));
    assert!(!board.is_draw());
}

#[test]
fn test_opponent_alternates() {
    assert_eq!(Mark::X.opponent(), Mark::O);
    assert_eq!(Mark::O.opponent(), Mark::X);
}

#[test]
fn test_board_serializes_as_nullable_array() {
    let board = board_with(&[0], Mark::X);
    let json = serde_json::to_value(board).expect("Board should serialize");
    assert_eq!(
        json,
        serde_json::json!(["X", null, null, null, null, null, null, null, null])
    );
}
