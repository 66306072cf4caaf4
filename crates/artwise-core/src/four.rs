//! Four-in-a-row detection.
//!
//! Scans the board in row-major order and, per index, tries the diagonal
//! (down-right), vertical and horizontal group starting there. The first
//! eligible group wins. Detection is a pure function of the figures; only
//! [`mark`] writes, and only the `four` annotation.

use crate::domain::{Direction, Figure, FourMark, Grid};

/// Number of aligned figures needed.
pub const NUM_TO_WIN: usize = 4;

/// A detected group, indices in scan order (first is the starter).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FourInARow {
    pub direction: Direction,
    pub indices: [usize; NUM_TO_WIN],
}

/// Find the first eligible group of four.
pub fn detect(figures: &[Figure], grid: Grid) -> Option<FourInARow> {
    let scanned = figures.len().min(grid.capacity());
    (0..scanned).find_map(|index| {
        [Direction::Diagonal, Direction::Vertical, Direction::Horizontal]
            .into_iter()
            .filter_map(|direction| candidate(index, direction, grid))
            .find(|group| is_eligible(figures, group))
    })
}

/// Annotate every member of `group`; the first member is the starter.
pub fn mark(figures: &mut [Figure], group: &FourInARow) {
    for (position, &index) in group.indices.iter().enumerate() {
        if let Some(figure) = figures.get_mut(index) {
            figure.four = Some(FourMark {
                direction: group.direction,
                starter: position == 0,
            });
        }
    }
}

/// Detect and annotate in one go.
pub fn apply(figures: &mut [Figure], grid: Grid) -> Option<FourInARow> {
    let group = detect(figures, grid)?;
    mark(figures, &group);
    Some(group)
}

/// Indices of the group starting at `index`, if it fits on the grid.
fn candidate(index: usize, direction: Direction, grid: Grid) -> Option<FourInARow> {
    let (row, col) = grid.position(index);
    let fits_right = col + NUM_TO_WIN <= grid.cols;
    let fits_down = row + NUM_TO_WIN <= grid.rows;

    let step = match direction {
        Direction::Diagonal if fits_right && fits_down => grid.cols + 1,
        Direction::Vertical if fits_down => grid.cols,
        Direction::Horizontal if fits_right => 1,
        _ => return None,
    };

    let mut indices = [0; NUM_TO_WIN];
    for (n, slot) in indices.iter_mut().enumerate() {
        *slot = index + n * step;
    }
    Some(FourInARow { direction, indices })
}

fn is_eligible(figures: &[Figure], group: &FourInARow) -> bool {
    let members: Vec<&Figure> = group
        .indices
        .iter()
        .filter_map(|&i| figures.get(i))
        .collect();
    if members.len() < NUM_TO_WIN {
        return false;
    }

    let all_dotted = members.iter().all(|f| f.is_dotted());
    let initials = members[0].initials.as_deref();
    let same_author = initials.is_some() && members.iter().all(|f| f.initials.as_deref() == initials);
    let all_successful = members.iter().all(|f| f.figure_type.is_successful());

    !all_dotted && same_author && all_successful
}
