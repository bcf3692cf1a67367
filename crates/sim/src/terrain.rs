//! Terrain probes consumed by the motion state machines.
//!
//! The simulation never touches level geometry directly. It asks a
//! [`Terrain`] the same questions the level scripts asked the physics engine:
//! is there ground below this point, is there a ladder beside it, is this
//! point inside a wall, is there an exit pad below it.

use crate::Vec2;

/// Host-provided spatial queries.
pub trait Terrain {
    /// Whether a solid surface lies within `distance` below `origin`.
    fn ground_within(&self, origin: Vec2, distance: f64) -> bool;

    /// Whether a climbable surface lies within `reach` to the left or right
    /// of `origin`.
    fn ladder_within(&self, origin: Vec2, reach: f64) -> bool;

    /// Whether `point` lies inside something a step must not enter.
    fn blocked(&self, _point: Vec2) -> bool {
        false
    }

    /// Whether an exit pad lies within `distance` below `origin`.
    fn exit_within(&self, _origin: Vec2, _distance: f64) -> bool {
        false
    }
}

impl<T: Terrain + ?Sized> Terrain for &T {
    fn ground_within(&self, origin: Vec2, distance: f64) -> bool {
        (**self).ground_within(origin, distance)
    }

    fn ladder_within(&self, origin: Vec2, reach: f64) -> bool {
        (**self).ladder_within(origin, reach)
    }

    fn blocked(&self, point: Vec2) -> bool {
        (**self).blocked(point)
    }

    fn exit_within(&self, origin: Vec2, distance: f64) -> bool {
        (**self).exit_within(origin, distance)
    }
}

// ============================================================================
// Block Terrain
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    Ground,
    Ladder,
    Wall,
    /// Standable like ground; also answers exit probes.
    Exit,
}

/// Axis-aligned block, bounds inclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Block {
    pub kind: BlockKind,
    pub min: Vec2,
    pub max: Vec2,
}

impl Block {
    pub fn new(kind: BlockKind, min: Vec2, max: Vec2) -> Self {
        Self { kind, min, max }
    }

    fn spans_x(&self, x: f64) -> bool {
        self.min[0] <= x && x <= self.max[0]
    }

    fn spans_y(&self, y: f64) -> bool {
        self.min[1] <= y && y <= self.max[1]
    }

    fn contains(&self, point: Vec2) -> bool {
        self.spans_x(point[0]) && self.spans_y(point[1])
    }

    /// Downward probe: the segment from `origin` to `origin - distance`
    /// overlaps the block.
    fn hit_below(&self, origin: Vec2, distance: f64) -> bool {
        self.spans_x(origin[0]) && origin[1] - distance <= self.max[1] && origin[1] >= self.min[1]
    }

    /// Lateral probe on both sides of `origin`.
    fn hit_beside(&self, origin: Vec2, reach: f64) -> bool {
        self.spans_y(origin[1]) && origin[0] - reach <= self.max[0] && origin[0] + reach >= self.min[0]
    }
}

/// Level geometry as a flat list of axis-aligned blocks.
///
/// Enough for headless runs and tests; a real host answers the probes from
/// its own physics scene.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockTerrain {
    blocks: Vec<Block>,
}

impl BlockTerrain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, kind: BlockKind, min: Vec2, max: Vec2) -> Self {
        self.push(Block::new(kind, min, max));
        self
    }

    pub fn push(&mut self, block: Block) {
        self.blocks.push(block);
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    fn any(&self, kinds: &[BlockKind], hit: impl Fn(&Block) -> bool) -> bool {
        self.blocks
            .iter()
            .any(|block| kinds.contains(&block.kind) && hit(block))
    }
}

impl Terrain for BlockTerrain {
    fn ground_within(&self, origin: Vec2, distance: f64) -> bool {
        self.any(&[BlockKind::Ground, BlockKind::Exit], |b| {
            b.hit_below(origin, distance)
        })
    }

    fn ladder_within(&self, origin: Vec2, reach: f64) -> bool {
        self.any(&[BlockKind::Ladder], |b| b.hit_beside(origin, reach))
    }

    fn blocked(&self, point: Vec2) -> bool {
        self.any(&[BlockKind::Wall], |b| b.contains(point))
    }

    fn exit_within(&self, origin: Vec2, distance: f64) -> bool {
        self.any(&[BlockKind::Exit], |b| b.hit_below(origin, distance))
    }
}
