//! Discrete motion state machine shared by the player and the shadow.
//!
//! A body is always in exactly one [`MotionState`]. Steps and climbs are
//! linear interpolations carried inside the state variant and advanced by
//! [`Body::update`]; falling carries its vertical velocity and is advanced
//! by [`Body::apply_gravity`]. Nothing blocks: a request made while the
//! body is busy is refused and reported, never queued.

use crate::config::MotionConfig;
use crate::terrain::Terrain;
use crate::{ActionCode, Vec2};

/// Which way the body last stepped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Facing {
    Left,
    #[default]
    Right,
}

/// Linear interpolation from `from` to `to` over `duration` seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    pub from: Vec2,
    pub to: Vec2,
    pub elapsed: f64,
    pub duration: f64,
}

impl Transition {
    fn new(from: Vec2, to: Vec2, duration: f64) -> Self {
        Self {
            from,
            to,
            elapsed: 0.0,
            duration,
        }
    }

    /// Completed fraction in `[0, 1]`.
    pub fn progress(&self) -> f64 {
        (self.elapsed / self.duration).min(1.0)
    }

    /// Advance by `dt`; returns the interpolated position and whether the
    /// transition finished. A finished transition lands exactly on `to`.
    fn advance(&mut self, dt: f64) -> (Vec2, bool) {
        self.elapsed += dt;
        let t = self.elapsed / self.duration;
        if t >= 1.0 {
            (self.to, true)
        } else {
            (lerp(self.from, self.to, t), false)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MotionState {
    Idle,
    Moving(Transition),
    ClimbingUp(Transition),
    ClimbingDown(Transition),
    Falling { vertical_velocity: f64 },
}

/// Tag of a [`MotionState`] without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MotionKind {
    Idle,
    Moving,
    ClimbingUp,
    ClimbingDown,
    Falling,
}

impl MotionKind {
    pub(crate) fn tag(self) -> u64 {
        match self {
            Self::Idle => 1,
            Self::Moving => 2,
            Self::ClimbingUp => 3,
            Self::ClimbingDown => 4,
            Self::Falling => 5,
        }
    }
}

impl MotionState {
    pub fn kind(&self) -> MotionKind {
        match self {
            Self::Idle => MotionKind::Idle,
            Self::Moving(_) => MotionKind::Moving,
            Self::ClimbingUp(_) => MotionKind::ClimbingUp,
            Self::ClimbingDown(_) => MotionKind::ClimbingDown,
            Self::Falling { .. } => MotionKind::Falling,
        }
    }
}

/// Why a requested action did not start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DropReason {
    /// Another step, climb or fall is in progress.
    Busy,
    /// Steps need ground underfoot.
    NotGrounded,
    /// Climbs need a ladder within reach.
    NoLadder,
    /// The step target lies inside a wall.
    Blocked,
}

impl DropReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Busy => "busy",
            Self::NotGrounded => "not_grounded",
            Self::NoLadder => "no_ladder",
            Self::Blocked => "blocked",
        }
    }
}

/// Result of asking a body to perform an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Execution {
    Executed,
    Dropped(DropReason),
}

impl Execution {
    pub fn executed(self) -> bool {
        matches!(self, Self::Executed)
    }
}

/// Observable state of a body after a tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodySnapshot {
    pub position: Vec2,
    pub facing: Facing,
    pub motion: MotionKind,
    pub grounded: bool,
    pub vertical_velocity: f64,
}

#[derive(Debug, Clone)]
pub struct Body {
    config: MotionConfig,
    position: Vec2,
    facing: Facing,
    state: MotionState,
    grounded: bool,
}

impl Body {
    pub fn new(config: MotionConfig, position: Vec2) -> Self {
        Self {
            config,
            position,
            facing: Facing::default(),
            state: MotionState::Idle,
            grounded: false,
        }
    }

    pub fn config(&self) -> &MotionConfig {
        &self.config
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn facing(&self) -> Facing {
        self.facing
    }

    pub fn state(&self) -> &MotionState {
        &self.state
    }

    /// Result of the latest grounding check.
    pub fn is_grounded(&self) -> bool {
        self.grounded
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, MotionState::Idle)
    }

    /// Vertical velocity; zero unless falling.
    pub fn vertical_velocity(&self) -> f64 {
        match self.state {
            MotionState::Falling { vertical_velocity } => vertical_velocity,
            _ => 0.0,
        }
    }

    pub fn snapshot(&self) -> BodySnapshot {
        BodySnapshot {
            position: self.position,
            facing: self.facing,
            motion: self.state.kind(),
            grounded: self.grounded,
            vertical_velocity: self.vertical_velocity(),
        }
    }

    /// Teleport to `position`, cancelling any step, climb or fall.
    pub fn place(&mut self, position: Vec2) {
        self.position = position;
        self.state = MotionState::Idle;
        self.grounded = false;
    }

    /// Re-run the ground probe. A falling body that finds ground lands here.
    pub fn sense<T: Terrain>(&mut self, terrain: &T) -> bool {
        let origin = add(self.position, self.config.ground_probe_offset);
        self.grounded = terrain.ground_within(origin, self.config.ground_probe_distance);
        if self.grounded && matches!(self.state, MotionState::Falling { .. }) {
            tracing::debug!(position = ?self.position, "body landed");
            self.state = MotionState::Idle;
        }
        self.grounded
    }

    /// Try to start `action`. Only an idle body accepts anything.
    pub fn request<T: Terrain>(&mut self, action: ActionCode, terrain: &T) -> Execution {
        if !self.is_idle() {
            return Execution::Dropped(DropReason::Busy);
        }

        match action {
            ActionCode::ClimbUp | ActionCode::ClimbDown => {
                if !terrain.ladder_within(self.position, self.config.ladder_reach) {
                    return Execution::Dropped(DropReason::NoLadder);
                }
                self.state = if action == ActionCode::ClimbUp {
                    let to = add(
                        self.position,
                        add([0.0, self.config.climb_distance], self.config.climb_offset),
                    );
                    MotionState::ClimbingUp(Transition::new(
                        self.position,
                        to,
                        self.config.climb_duration,
                    ))
                } else {
                    let to = [self.position[0], self.position[1] - self.config.descend_distance];
                    MotionState::ClimbingDown(Transition::new(
                        self.position,
                        to,
                        self.config.descend_duration,
                    ))
                };
                Execution::Executed
            }
            ActionCode::MoveLeft | ActionCode::MoveRight => {
                if !self.grounded {
                    return Execution::Dropped(DropReason::NotGrounded);
                }
                let direction = if action == ActionCode::MoveLeft { -1.0 } else { 1.0 };
                let to = [
                    self.position[0] + direction * self.config.step_distance,
                    self.position[1],
                ];
                if self.config.wall_check && terrain.blocked(to) {
                    return Execution::Dropped(DropReason::Blocked);
                }
                self.facing = if direction < 0.0 {
                    Facing::Left
                } else {
                    Facing::Right
                };
                self.state = MotionState::Moving(Transition::new(
                    self.position,
                    to,
                    self.config.step_duration,
                ));
                Execution::Executed
            }
        }
    }

    /// Advance an in-flight step or climb. On completion the body snaps to
    /// the target, re-checks ground and starts falling if there is none.
    pub fn update<T: Terrain>(&mut self, dt: f64, terrain: &T) {
        let transition = match &mut self.state {
            MotionState::Moving(t) | MotionState::ClimbingUp(t) | MotionState::ClimbingDown(t) => t,
            MotionState::Idle | MotionState::Falling { .. } => return,
        };

        let (position, done) = transition.advance(dt);
        self.position = position;
        if done {
            self.state = MotionState::Idle;
            if !self.sense(terrain) {
                tracing::debug!(position = ?self.position, "no ground after transition, falling");
                self.state = MotionState::Falling {
                    vertical_velocity: 0.0,
                };
            }
        }
    }

    /// Integrate gravity for a falling body. An idle body with no ground
    /// under it starts falling here.
    pub fn apply_gravity(&mut self, dt: f64) {
        if self.is_idle() && !self.grounded {
            self.state = MotionState::Falling {
                vertical_velocity: 0.0,
            };
        }

        if let MotionState::Falling { vertical_velocity } = &mut self.state {
            *vertical_velocity =
                (*vertical_velocity - self.config.gravity * dt).max(-self.config.max_fall_speed);
            self.position[1] += *vertical_velocity * dt;
        }
    }
}

fn add(a: Vec2, b: Vec2) -> Vec2 {
    [a[0] + b[0], a[1] + b[1]]
}

fn lerp(a: Vec2, b: Vec2, t: f64) -> Vec2 {
    [a[0] + (b[0] - a[0]) * t, a[1] + (b[1] - a[1]) * t]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::{BlockKind, BlockTerrain};

    const DT: f64 = 1.0 / 60.0;

    fn floor() -> BlockTerrain {
        BlockTerrain::new().with(BlockKind::Ground, [-20.0, -1.0], [20.0, 0.0])
    }

    fn grounded_body(terrain: &BlockTerrain) -> Body {
        let mut body = Body::new(MotionConfig::default(), [0.0, 0.5]);
        assert!(body.sense(terrain));
        body
    }

    fn run_until_idle(body: &mut Body, terrain: &BlockTerrain, max_ticks: usize) -> usize {
        for tick in 0..max_ticks {
            body.sense(terrain);
            body.update(DT, terrain);
            body.apply_gravity(DT);
            if body.is_idle() {
                return tick + 1;
            }
        }
        panic!("body did not settle within {max_ticks} ticks");
    }

    #[test]
    fn test_step_interpolates_linearly() {
        let terrain = floor();
        let mut body = grounded_body(&terrain);

        assert_eq!(body.request(ActionCode::MoveRight, &terrain), Execution::Executed);
        assert_eq!(body.state().kind(), MotionKind::Moving);

        body.update(0.1, &terrain);
        // Halfway through a 0.2s, 4.0 unit step.
        assert!((body.position()[0] - 2.0).abs() < 1e-9);
        assert_eq!(body.position()[1], 0.5);

        body.update(0.1, &terrain);
        assert_eq!(body.position(), [4.0, 0.5]);
        assert!(body.is_idle());
        assert_eq!(body.facing(), Facing::Right);
    }

    #[test]
    fn test_step_left_faces_left() {
        let terrain = floor();
        let mut body = grounded_body(&terrain);

        body.request(ActionCode::MoveLeft, &terrain);
        run_until_idle(&mut body, &terrain, 60);
        assert_eq!(body.position(), [-4.0, 0.5]);
        assert_eq!(body.facing(), Facing::Left);
    }

    #[test]
    fn test_busy_body_drops_requests() {
        let terrain = floor().with(BlockKind::Ladder, [0.5, 0.0], [1.0, 5.0]);
        let mut body = grounded_body(&terrain);

        assert!(body.request(ActionCode::MoveRight, &terrain).executed());
        for action in ActionCode::ALL {
            assert_eq!(
                body.request(action, &terrain),
                Execution::Dropped(DropReason::Busy)
            );
        }
        // The in-flight step is unaffected.
        run_until_idle(&mut body, &terrain, 60);
        assert_eq!(body.position(), [4.0, 0.5]);
    }

    #[test]
    fn test_step_requires_ground() {
        let terrain = floor();
        let mut body = Body::new(MotionConfig::default(), [0.0, 5.0]);
        body.sense(&terrain);

        assert_eq!(
            body.request(ActionCode::MoveRight, &terrain),
            Execution::Dropped(DropReason::NotGrounded)
        );
        assert_eq!(body.position(), [0.0, 5.0]);
    }

    #[test]
    fn test_climb_requires_ladder() {
        let terrain = floor();
        let mut body = grounded_body(&terrain);

        for action in [ActionCode::ClimbUp, ActionCode::ClimbDown] {
            assert_eq!(
                body.request(action, &terrain),
                Execution::Dropped(DropReason::NoLadder)
            );
            assert_eq!(body.position(), [0.0, 0.5]);
            assert!(body.is_idle());
        }
    }

    #[test]
    fn test_climb_up_onto_platform() {
        let terrain = floor()
            .with(BlockKind::Ladder, [0.5, 0.0], [1.0, 3.0])
            .with(BlockKind::Ground, [-2.0, 1.5], [0.4, 2.0]);
        let mut body = grounded_body(&terrain);

        assert!(body.request(ActionCode::ClimbUp, &terrain).executed());
        assert_eq!(body.state().kind(), MotionKind::ClimbingUp);

        body.update(0.25, &terrain);
        assert!((body.position()[1] - 1.5).abs() < 1e-9);

        body.update(0.25, &terrain);
        assert_eq!(body.position(), [0.0, 2.5]);
        assert!(body.is_idle());
        assert!(body.is_grounded());
    }

    #[test]
    fn test_climb_up_applies_offset() {
        let terrain = floor().with(BlockKind::Ladder, [0.5, 0.0], [1.0, 3.0]);
        let config = MotionConfig {
            climb_offset: [0.5, 0.25],
            ..MotionConfig::default()
        };
        let mut body = Body::new(config, [0.0, 0.5]);
        body.sense(&terrain);

        body.request(ActionCode::ClimbUp, &terrain);
        body.update(1.0, &terrain);
        assert_eq!(body.position(), [0.5, 2.75]);
    }

    #[test]
    fn test_climb_down() {
        let terrain = floor()
            .with(BlockKind::Ladder, [0.5, -5.0], [1.0, 1.0])
            .with(BlockKind::Ground, [-2.0, -3.0], [0.4, -2.0]);
        let mut body = grounded_body(&terrain);

        assert!(body.request(ActionCode::ClimbDown, &terrain).executed());
        body.update(0.5, &terrain);
        assert_eq!(body.position(), [0.0, -1.5]);
        assert!(body.is_grounded());
        assert!(body.is_idle());
    }

    #[test]
    fn test_wall_check_blocks_step() {
        let terrain = floor().with(BlockKind::Wall, [3.5, 0.0], [4.5, 3.0]);

        let mut player = Body::new(MotionConfig::player(), [0.0, 0.5]);
        player.sense(&terrain);
        assert_eq!(
            player.request(ActionCode::MoveRight, &terrain),
            Execution::Dropped(DropReason::Blocked)
        );
        assert_eq!(player.facing(), Facing::Right);

        let mut shadow = Body::new(MotionConfig::default(), [0.0, 0.5]);
        shadow.sense(&terrain);
        assert!(shadow.request(ActionCode::MoveRight, &terrain).executed());
    }

    /// Step off a ledge: Moving → Falling, velocity grows to the cap, then
    /// Falling → Idle on landing with velocity zeroed.
    #[test]
    fn test_step_off_ledge_falls_and_lands() {
        let terrain = BlockTerrain::new()
            .with(BlockKind::Ground, [-10.0, -1.0], [2.0, 0.0])
            .with(BlockKind::Ground, [2.5, -6.0], [20.0, -5.0]);
        let config = MotionConfig {
            max_fall_speed: 1.0,
            ..MotionConfig::default()
        };
        let mut body = Body::new(config, [0.0, 0.5]);
        body.sense(&terrain);

        body.request(ActionCode::MoveRight, &terrain);
        let mut ticks = 0;
        while body.state().kind() == MotionKind::Moving {
            body.sense(&terrain);
            body.update(DT, &terrain);
            body.apply_gravity(DT);
            ticks += 1;
            assert!(ticks < 60);
        }
        assert_eq!(body.state().kind(), MotionKind::Falling);

        let mut previous = body.vertical_velocity();
        let mut reached_cap = false;
        while body.state().kind() == MotionKind::Falling {
            body.sense(&terrain);
            body.update(DT, &terrain);
            body.apply_gravity(DT);
            if body.state().kind() != MotionKind::Falling {
                break;
            }
            let velocity = body.vertical_velocity();
            assert!(velocity <= previous, "fall speed must not decrease");
            assert!(velocity >= -1.0, "fall speed exceeds cap: {velocity}");
            reached_cap |= velocity == -1.0;
            previous = velocity;
            ticks += 1;
            assert!(ticks < 2000, "never landed");
        }

        assert!(reached_cap);
        assert!(body.is_idle());
        assert!(body.is_grounded());
        assert_eq!(body.vertical_velocity(), 0.0);
        assert_eq!(body.position()[0], 4.0);
        assert!(body.position()[1] <= -4.2 && body.position()[1] > -4.5);
    }

    #[test]
    fn test_idle_in_air_starts_falling() {
        let terrain = floor();
        let mut body = Body::new(MotionConfig::default(), [0.0, 3.0]);

        body.sense(&terrain);
        body.apply_gravity(DT);
        assert_eq!(body.state().kind(), MotionKind::Falling);
        assert!(body.position()[1] < 3.0);

        let ticks = run_until_idle(&mut body, &terrain, 600);
        assert!(ticks > 1);
        assert!(body.is_grounded());
    }

    #[test]
    fn test_place_cancels_motion() {
        let terrain = floor();
        let mut body = grounded_body(&terrain);
        body.request(ActionCode::MoveRight, &terrain);
        body.update(0.05, &terrain);

        body.place([1.0, 0.5]);
        assert!(body.is_idle());
        assert_eq!(body.position(), [1.0, 0.5]);
        body.update(1.0, &terrain);
        assert_eq!(body.position(), [1.0, 0.5]);
    }

    #[test]
    fn test_transition_progress_clamped() {
        let mut t = Transition::new([0.0, 0.0], [1.0, 0.0], 0.5);
        assert_eq!(t.progress(), 0.0);
        t.advance(0.25);
        assert_eq!(t.progress(), 0.5);
        t.advance(1.0);
        assert_eq!(t.progress(), 1.0);
    }
}
