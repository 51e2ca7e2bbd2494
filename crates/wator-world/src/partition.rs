//! Grid partitioning and boundary locks.
//!
//! The grid is cut into `columns x rows` equal rectangles. Every edge two
//! partitions share gets one lock, including the edges created by
//! wrap-around. When both `columns` and `rows` exceed one, each point where
//! four partitions meet also gets one lock per diagonal pair, so that two
//! diagonal neighbours cannot both move into the same cell of a third
//! partition at once.
//!
//! Every lock carries an id fixed at construction. Workers always acquire
//! boundary locks sorted by that id, before any cell lock.

use parking_lot::{Mutex, MutexGuard};
use std::fmt;
use std::sync::Arc;
use wator_core::{Direction, Error, Position, Result, SplitStrategy};

/// Position of a boundary lock in the global acquisition order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LockId(pub u32);

impl fmt::Display for LockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryKind {
    /// Shared vertical edge between horizontally adjacent partitions
    Vertical,
    /// Shared horizontal edge between vertically adjacent partitions
    Horizontal,
    /// Shared corner between diagonally adjacent partitions
    Corner,
}

/// One mutex per shared edge or corner, referenced by both sides.
#[derive(Debug)]
pub struct BoundaryLock {
    id: LockId,
    kind: BoundaryKind,
    mutex: Mutex<()>,
}

impl BoundaryLock {
    fn new(id: LockId, kind: BoundaryKind) -> Self {
        Self {
            id,
            kind,
            mutex: Mutex::new(()),
        }
    }

    pub fn id(&self) -> LockId {
        self.id
    }

    pub fn kind(&self) -> BoundaryKind {
        self.kind
    }
}

/// Boundary locks held for a single move. Released in reverse acquisition
/// order on drop.
pub(crate) struct BoundaryGuards<'a> {
    guards: Vec<MutexGuard<'a, ()>>,
}

impl<'a> BoundaryGuards<'a> {
    /// Lock `locks`, which must already be sorted by id and free of
    /// duplicates.
    pub(crate) fn acquire(locks: &[&'a BoundaryLock]) -> Self {
        debug_assert!(locks.windows(2).all(|pair| pair[0].id < pair[1].id));
        Self {
            guards: locks.iter().map(|&lock| lock.mutex.lock()).collect(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.guards.len()
    }
}

impl Drop for BoundaryGuards<'_> {
    fn drop(&mut self) {
        while let Some(guard) = self.guards.pop() {
            drop(guard);
        }
    }
}

#[derive(Debug, Clone, Default)]
struct EdgeLocks {
    north: Option<Arc<BoundaryLock>>,
    south: Option<Arc<BoundaryLock>>,
    east: Option<Arc<BoundaryLock>>,
    west: Option<Arc<BoundaryLock>>,
}

#[derive(Debug, Clone, Default)]
struct CornerLocks {
    north_east: Option<Arc<BoundaryLock>>,
    north_west: Option<Arc<BoundaryLock>>,
    south_east: Option<Arc<BoundaryLock>>,
    south_west: Option<Arc<BoundaryLock>>,
}

/// A rectangular region owned by one worker for a tick.
/// Ranges are half-open: `x_start..x_end`, `y_start..y_end`.
#[derive(Debug, Clone)]
pub struct Partition {
    pub index: usize,
    pub column: usize,
    pub row: usize,
    pub x_start: i32,
    pub x_end: i32,
    pub y_start: i32,
    pub y_end: i32,
    edges: EdgeLocks,
    corners: CornerLocks,
}

impl Partition {
    pub fn contains(&self, pos: Position) -> bool {
        pos.x >= self.x_start && pos.x < self.x_end && pos.y >= self.y_start && pos.y < self.y_end
    }

    /// Every boundary lock this partition shares with a neighbour
    pub fn boundary_locks(&self) -> impl Iterator<Item = &BoundaryLock> + '_ {
        [
            &self.edges.north,
            &self.edges.south,
            &self.edges.east,
            &self.edges.west,
            &self.corners.north_east,
            &self.corners.north_west,
            &self.corners.south_east,
            &self.corners.south_west,
        ]
        .into_iter()
        .filter_map(|lock| lock.as_deref())
    }

    /// Locks guarding a move from `from` to `to` in `direction`, sorted by
    /// id. Empty when `to` lies in this partition. A move out of a corner
    /// cell across that corner's edge also takes the corner lock.
    ///
    /// In a tile one cell thick across the direction of the move, the source
    /// is a corner cell on both sides, and the destination borders both
    /// diagonal neighbours. Such a crossing takes the edge lock and both
    /// corner locks, three in all.
    pub fn crossing_locks(&self, from: Position, to: Position, direction: Direction) -> Vec<&BoundaryLock> {
        if self.contains(to) {
            return Vec::new();
        }

        let first_col = from.x == self.x_start;
        let last_col = from.x == self.x_end - 1;
        let first_row = from.y == self.y_start;
        let last_row = from.y == self.y_end - 1;

        let (edge, corners) = match direction {
            Direction::North => (
                &self.edges.north,
                [(first_col, &self.corners.north_west), (last_col, &self.corners.north_east)],
            ),
            Direction::South => (
                &self.edges.south,
                [(first_col, &self.corners.south_west), (last_col, &self.corners.south_east)],
            ),
            Direction::East => (
                &self.edges.east,
                [(first_row, &self.corners.north_east), (last_row, &self.corners.south_east)],
            ),
            Direction::West => (
                &self.edges.west,
                [(first_row, &self.corners.north_west), (last_row, &self.corners.south_west)],
            ),
        };

        let mut locks: Vec<&BoundaryLock> = edge.as_deref().into_iter().collect();
        for (at_corner, corner) in corners {
            if at_corner {
                locks.extend(corner.as_deref());
            }
        }

        locks.sort_by_key(|lock| lock.id);
        locks.dedup_by_key(|lock| lock.id);
        locks
    }
}

/// The full tiling of a grid plus every boundary lock it allocated.
#[derive(Debug, Clone)]
pub struct PartitionLayout {
    pub columns: usize,
    pub rows: usize,
    tile_width: i32,
    tile_height: i32,
    partitions: Vec<Partition>,
    lock_count: usize,
}

impl PartitionLayout {
    /// Tile a `width` x `height` grid for `workers` workers.
    ///
    /// Fails with [`Error::Configuration`] if the chosen `columns x rows`
    /// split does not divide the grid evenly.
    pub fn new(width: i32, height: i32, workers: usize, strategy: SplitStrategy) -> Result<Self> {
        if width <= 0 || height <= 0 {
            return Err(Error::Configuration(format!(
                "cannot partition a {}x{} grid",
                width, height
            )));
        }
        if workers == 0 {
            return Err(Error::Configuration(
                "worker count must be at least 1".to_string(),
            ));
        }

        let (columns, rows) = strategy.layout(workers);
        let untileable = || {
            Error::Configuration(format!(
                "{} workers split {}x{} do not evenly tile a {}x{} grid",
                workers, columns, rows, width, height
            ))
        };
        let split_x = i32::try_from(columns).map_err(|_| untileable())?;
        let split_y = i32::try_from(rows).map_err(|_| untileable())?;
        if width % split_x != 0 || height % split_y != 0 {
            return Err(untileable());
        }

        let tile_width = width / split_x;
        let tile_height = height / split_y;
        let mut allocator = LockAllocator::default();

        // vertical[r * columns + c]: edge east of column c in row r
        // horizontal[r * columns + c]: edge south of row r in column c
        let vertical = allocator.grid(columns, rows, columns > 1, BoundaryKind::Vertical);
        let horizontal = allocator.grid(columns, rows, rows > 1, BoundaryKind::Horizontal);

        // Corner point (c, r) sits south-east of tile (c, r). `main` joins
        // tiles (c, r) and (c+1, r+1); `anti` joins (c+1, r) and (c, r+1).
        let corners = columns > 1 && rows > 1;
        let main = allocator.grid(columns, rows, corners, BoundaryKind::Corner);
        let anti = allocator.grid(columns, rows, corners, BoundaryKind::Corner);

        let at = |locks: &[Option<Arc<BoundaryLock>>], c: usize, r: usize| locks[r * columns + c].clone();
        let prev_col = |c: usize| (c + columns - 1) % columns;
        let prev_row = |r: usize| (r + rows - 1) % rows;

        let mut partitions = Vec::with_capacity(workers);
        for row in 0..rows {
            for column in 0..columns {
                let x_start = column as i32 * tile_width;
                let y_start = row as i32 * tile_height;

                partitions.push(Partition {
                    index: partitions.len(),
                    column,
                    row,
                    x_start,
                    x_end: x_start + tile_width,
                    y_start,
                    y_end: y_start + tile_height,
                    edges: EdgeLocks {
                        north: at(&horizontal, column, prev_row(row)),
                        south: at(&horizontal, column, row),
                        east: at(&vertical, column, row),
                        west: at(&vertical, prev_col(column), row),
                    },
                    corners: CornerLocks {
                        north_east: at(&anti, column, prev_row(row)),
                        north_west: at(&main, prev_col(column), prev_row(row)),
                        south_east: at(&main, column, row),
                        south_west: at(&anti, prev_col(column), row),
                    },
                });
            }
        }

        Ok(Self {
            columns,
            rows,
            tile_width,
            tile_height,
            partitions,
            lock_count: allocator.next as usize,
        })
    }

    pub fn partitions(&self) -> &[Partition] {
        &self.partitions
    }

    pub fn len(&self) -> usize {
        self.partitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }

    /// Index of the partition owning a wrapped position
    pub fn partition_of(&self, pos: Position) -> usize {
        let column = (pos.x / self.tile_width) as usize;
        let row = (pos.y / self.tile_height) as usize;
        row * self.columns + column
    }

    /// Number of distinct boundary locks allocated
    pub fn boundary_lock_count(&self) -> usize {
        self.lock_count
    }
}

#[derive(Default)]
struct LockAllocator {
    next: u32,
}

impl LockAllocator {
    fn grid(
        &mut self,
        columns: usize,
        rows: usize,
        enabled: bool,
        kind: BoundaryKind,
    ) -> Vec<Option<Arc<BoundaryLock>>> {
        (0..columns * rows)
            .map(|_| {
                enabled.then(|| {
                    let lock = Arc::new(BoundaryLock::new(LockId(self.next), kind));
                    self.next += 1;
                    lock
                })
            })
            .collect()
    }
}
