//! Bouncing-ball minigame used to exercise the ECS and loop headlessly.

use glam::Vec2;
use minigame_ecs::{ComponentType, EntityId, System, SystemResult, World};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::settings::ArenaSettings;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position(pub Vec2);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Velocity(pub Vec2);

/// Seconds until the ball is recycled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lifetime(pub f64);

/// Component types used by the demo.
#[derive(Debug, Clone, Copy)]
pub struct BallTypes {
    pub position: ComponentType<Position>,
    pub velocity: ComponentType<Velocity>,
    pub lifetime: ComponentType<Lifetime>,
}

impl BallTypes {
    pub fn define() -> Self {
        Self {
            position: ComponentType::new("Position"),
            velocity: ComponentType::new("Velocity"),
            lifetime: ComponentType::new("Lifetime"),
        }
    }
}

/// Spawns balls at seeded random positions inside the arena.
pub struct BallSpawner {
    types: BallTypes,
    arena: ArenaSettings,
    rng: StdRng,
}

impl BallSpawner {
    pub fn new(types: BallTypes, arena: ArenaSettings) -> Self {
        let rng = StdRng::seed_from_u64(arena.seed);
        Self { types, arena, rng }
    }

    pub fn spawn(&mut self, world: &mut World) -> anyhow::Result<EntityId> {
        let position = Vec2::new(
            self.rng.gen::<f32>() * self.arena.width,
            self.rng.gen::<f32>() * self.arena.height,
        );
        let direction = Vec2::new(
            self.rng.gen::<f32>() * 2.0 - 1.0,
            self.rng.gen::<f32>() * 2.0 - 1.0,
        );
        let velocity = direction.clamp_length_max(1.0) * self.arena.max_speed;
        // Stagger lifetimes so balls are not all recycled on the same tick.
        let lifetime = self.arena.ball_lifetime_secs * (0.5 + self.rng.gen::<f64>());

        let ball = world.spawn();
        world.add(self.types.position, ball, Position(position))?;
        world.add(self.types.velocity, ball, Velocity(velocity))?;
        world.add(self.types.lifetime, ball, Lifetime(lifetime))?;
        Ok(ball)
    }
}

/// Integrate positions from velocities.
pub fn movement(types: BallTypes) -> impl System {
    move |world: &mut World, dt: f64| -> SystemResult {
        let moved: Vec<(EntityId, Vec2)> = world
            .query2(types.position, types.velocity)
            .into_iter()
            .map(|(ball, (pos, vel))| (ball, pos.0 + vel.0 * dt as f32))
            .collect();

        for (ball, next) in moved {
            if let Some(pos) = world.get_mut(types.position, ball) {
                pos.0 = next;
            }
        }
        Ok(())
    }
}

/// Reflect balls off the arena walls.
pub fn bounce(types: BallTypes, arena: &ArenaSettings) -> impl System {
    let max = Vec2::new(arena.width, arena.height);
    move |world: &mut World, _dt: f64| -> SystemResult {
        let hits: Vec<(EntityId, Vec2, Vec2)> = world
            .query2(types.position, types.velocity)
            .into_iter()
            .filter_map(|(ball, (pos, vel))| {
                let clamped = pos.0.clamp(Vec2::ZERO, max);
                if clamped == pos.0 {
                    return None;
                }
                let mut reflected = vel.0;
                if clamped.x != pos.0.x {
                    reflected.x = -reflected.x;
                }
                if clamped.y != pos.0.y {
                    reflected.y = -reflected.y;
                }
                Some((ball, clamped, reflected))
            })
            .collect();

        for (ball, pos, vel) in hits {
            world.add(types.position, ball, Position(pos))?;
            world.add(types.velocity, ball, Velocity(vel))?;
        }
        Ok(())
    }
}

/// Ages balls and replaces expired ones with fresh spawns.
pub struct Recycler {
    types: BallTypes,
    spawner: BallSpawner,
    recycled: u64,
}

impl Recycler {
    pub fn new(types: BallTypes, spawner: BallSpawner) -> Self {
        Self {
            types,
            spawner,
            recycled: 0,
        }
    }
}

impl System for Recycler {
    fn run(&mut self, world: &mut World, dt: f64) -> SystemResult {
        let mut expired = Vec::new();
        for (ball, lifetime) in world.query_mut(self.types.lifetime) {
            lifetime.0 -= dt;
            if lifetime.0 <= 0.0 {
                expired.push(ball);
            }
        }

        if expired.is_empty() {
            return Ok(());
        }
        for &ball in &expired {
            world.despawn(ball);
            self.spawner.spawn(world)?;
        }
        self.recycled += expired.len() as u64;
        debug!(count = expired.len(), total = self.recycled, "balls recycled");
        Ok(())
    }

    fn name(&self) -> &str {
        "recycler"
    }
}
