// Scripted stand-in for the game's local simulation.
//
// `PatrolBot` implements `LocalSimulation` without any rendering or level
// geometry: it walks back and forth around its spawn point, dashes on a fixed
// cadence, and fires at the remote player's last reported position whenever
// ammo allows. Incoming fire is judged the same way the real client judges
// it: the remote player's bullets are trusted as reported and tested as
// `BULLET_SIZE` boxes against the local player's box. Three hits end the
// match in the opponent's favour.
//
// The bot is deterministic (no RNG, no wall clock), so two bots against a real
// relay make a reproducible end-to-end exercise of the exchange loop. It is
// used by the `bot` binary and by the multiplayer integration tests.

use duel_protocol::snapshot::{BULLET_SIZE, BulletSnapshot, PlayerSnapshot, Point, Rect};
use duel_protocol::types::SlotId;
use tracing::debug;

use crate::exchange::{LocalSimulation, MatchView};
use crate::roster::SlotProfile;

pub const SCREEN_WIDTH: i32 = 1280;
pub const SCREEN_HEIGHT: i32 = 720;
pub const FPS: i32 = 60;

pub const PLAYER_WIDTH: i32 = 50;
pub const PLAYER_HEIGHT: i32 = 75;
pub const START_LIVES: i32 = 3;
pub const MAX_AMMO: i32 = 3;
/// Frames to regain one round.
pub const AMMO_COOLDOWN: i32 = 180;
pub const RESPAWN_FRAMES: i32 = FPS * 2;
pub const DASH_COOLDOWN: i32 = FPS * 2;
pub const DASH_DISTANCE: i32 = 100;

const WALK_SPEED: i32 = 5;
const PATROL_RADIUS: i32 = 200;
const BULLET_SPEED: f32 = 10.0;
const WALK_FRAMES: f32 = 4.0;
const ANIMATION_SPEED: f32 = 0.2;
const DASH_EVERY: u64 = 150;

/// Tunables for a bot.
#[derive(Clone, Copy, Debug)]
pub struct BotConfig {
    /// Frames between shots while a target is known.
    pub fire_every: u64,
    /// Walk around the spawn point; a stationary bot is an easy target.
    pub patrol: bool,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            fire_every: 45,
            patrol: true,
        }
    }
}

#[derive(Clone, Debug)]
struct Bullet {
    x: f32,
    y: f32,
    vx: f32,
    vy: f32,
    target: Point,
}

impl Bullet {
    fn top_left(&self) -> Point {
        Point::new(
            self.x.round() as i32 - BULLET_SIZE / 2,
            self.y.round() as i32 - BULLET_SIZE / 2,
        )
    }

    fn off_screen(&self) -> bool {
        let p = self.top_left();
        p.x + BULLET_SIZE < 0
            || p.x > SCREEN_WIDTH
            || p.y + BULLET_SIZE < 0
            || p.y > SCREEN_HEIGHT
    }
}

/// Deterministic patrol-and-shoot player.
pub struct PatrolBot {
    slot: SlotId,
    profile: SlotProfile,
    opponent_name: &'static str,
    config: BotConfig,
    frame: u64,

    position: Point,
    direction: i32,
    animation_frame: f32,
    gun_angle: f32,

    lives: i32,
    alive: bool,
    respawn_timer: i32,
    ammo: i32,
    ammo_timer: i32,
    can_dash: bool,
    dash_cooldown: i32,

    bullets: Vec<Bullet>,
    winner: Option<String>,
}

impl PatrolBot {
    pub fn new(slot: SlotId, config: BotConfig) -> Self {
        let (profile, opponent) = SlotProfile::local_and_remote(slot);
        Self {
            slot,
            profile,
            opponent_name: opponent.display_name,
            config,
            frame: 0,
            position: profile.spawn,
            // Start walking toward the middle of the arena.
            direction: if profile.spawn.x < SCREEN_WIDTH / 2 { 1 } else { -1 },
            animation_frame: 0.0,
            gun_angle: 0.0,
            lives: START_LIVES,
            alive: true,
            respawn_timer: 0,
            ammo: MAX_AMMO,
            ammo_timer: 0,
            can_dash: true,
            dash_cooldown: 0,
            bullets: Vec::new(),
            winner: None,
        }
    }

    pub fn lives(&self) -> i32 {
        self.lives
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn bullets_in_flight(&self) -> usize {
        self.bullets.len()
    }

    fn body(&self) -> Rect {
        Rect::new(
            self.position.x,
            self.position.y,
            PLAYER_WIDTH,
            PLAYER_HEIGHT,
        )
    }

    fn center(&self) -> (f32, f32) {
        (
            (self.position.x + PLAYER_WIDTH / 2) as f32,
            (self.position.y + PLAYER_HEIGHT / 2) as f32,
        )
    }

    fn patrol_bounds(&self) -> (i32, i32) {
        let min = (self.profile.spawn.x - PATROL_RADIUS).max(0);
        let max = (self.profile.spawn.x + PATROL_RADIUS).min(SCREEN_WIDTH - PLAYER_WIDTH);
        (min, max)
    }

    fn walk(&mut self) {
        if !self.config.patrol {
            return;
        }
        let (min, max) = self.patrol_bounds();
        if self.can_dash && self.frame % DASH_EVERY == 0 {
            self.position.x = (self.position.x + self.direction * DASH_DISTANCE).clamp(min, max);
            self.can_dash = false;
            self.dash_cooldown = DASH_COOLDOWN;
        }
        self.position.x += self.direction * WALK_SPEED;
        if self.position.x <= min || self.position.x >= max {
            self.position.x = self.position.x.clamp(min, max);
            self.direction = -self.direction;
        }
        self.animation_frame += ANIMATION_SPEED;
        if self.animation_frame >= WALK_FRAMES {
            self.animation_frame = 0.0;
        }
    }

    fn regain_ammo(&mut self) {
        if self.ammo >= MAX_AMMO {
            return;
        }
        self.ammo_timer -= 1;
        if self.ammo_timer <= 0 {
            self.ammo += 1;
            if self.ammo < MAX_AMMO {
                self.ammo_timer = AMMO_COOLDOWN;
            }
        }
    }

    fn aim_and_fire(&mut self, view: &MatchView) {
        let Some(target) = view.remote().filter(|r| r.alive) else {
            return;
        };
        let (cx, cy) = self.center();
        let tx = (target.position.x + PLAYER_WIDTH / 2) as f32;
        let ty = (target.position.y + PLAYER_HEIGHT / 2) as f32;
        let (dx, dy) = (tx - cx, ty - cy);
        self.gun_angle = -dy.atan2(dx).to_degrees();

        if self.frame % self.config.fire_every.max(1) != 0 || self.ammo == 0 {
            return;
        }
        let len = (dx * dx + dy * dy).sqrt();
        let (vx, vy) = if len > 0.0 {
            (dx / len * BULLET_SPEED, dy / len * BULLET_SPEED)
        } else {
            (0.0, 0.0)
        };
        self.ammo -= 1;
        self.ammo_timer = AMMO_COOLDOWN;
        self.bullets.push(Bullet {
            x: cx,
            y: cy,
            vx,
            vy,
            target: Point::new(tx as i32, ty as i32),
        });
    }

    fn take_fire(&mut self, view: &MatchView) {
        if !self.alive {
            return;
        }
        let body = self.body();
        if !view
            .remote_bullet_hitboxes()
            .iter()
            .any(|hitbox| hitbox.intersects(&body))
        {
            return;
        }
        self.lives -= 1;
        self.alive = false;
        self.respawn_timer = RESPAWN_FRAMES;
        debug!(slot = %self.slot, lives = self.lives, "hit");
        if self.lives <= 0 && self.winner.is_none() {
            self.winner = Some(self.opponent_name.to_owned());
        }
    }

    fn respawn(&mut self) {
        self.position = self.profile.spawn;
        self.alive = true;
    }
}

impl LocalSimulation for PatrolBot {
    fn step(&mut self, view: &MatchView) {
        self.frame += 1;
        if view.is_over() {
            return;
        }

        if self.dash_cooldown > 0 {
            self.dash_cooldown -= 1;
        } else {
            self.can_dash = true;
        }

        for bullet in &mut self.bullets {
            bullet.x += bullet.vx;
            bullet.y += bullet.vy;
        }
        self.bullets.retain(|b| !b.off_screen());

        if self.alive {
            self.walk();
            self.regain_ammo();
            self.aim_and_fire(view);
        } else {
            self.respawn_timer -= 1;
            if self.respawn_timer <= 0 {
                self.respawn();
            }
        }

        self.take_fire(view);
    }

    fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            position: self.position,
            lives: self.lives,
            ammo: self.ammo,
            animation_frame: self.animation_frame,
            facing_right: self.direction > 0,
            gun_angle: self.gun_angle,
            alive: self.alive,
            respawn_timer: self.respawn_timer,
            can_dash: self.can_dash,
            bullets: self
                .bullets
                .iter()
                .map(|b| BulletSnapshot {
                    position: b.top_left(),
                    target: b.target,
                    source: self.slot,
                })
                .collect(),
            game_over: None,
        }
    }

    fn local_winner(&self) -> Option<String> {
        self.winner.clone()
    }
}
