// Player and bullet snapshots: the steady-state payload of the relay.
//
// A `PlayerSnapshot` is everything the peer needs to draw and collide against
// one player for one frame. Each snapshot fully replaces the previous one;
// nothing is accumulated. Bullets travel inside their owner's snapshot and are
// reconstructed on the far side as read-only boxes: only their position (and
// the fixed `BULLET_SIZE` hitbox) is trusted, they are never re-simulated.
//
// Wire schema: serde JSON with the field names below. `game_over` is omitted
// unless the sender has recorded a winner. Encoding is size-checked against
// the framing bound so an oversized snapshot is reported here, with a typed
// error, instead of surfacing as a framing failure mid-send.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::framing::MAX_PAYLOAD_LEN;
use crate::types::SlotId;

/// Side length of a bullet's square hitbox, in pixels.
pub const BULLET_SIZE: i32 = 20;

/// Integer pixel coordinates (top-left of the sprite box).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned box used for collision against remote bullets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    /// Strict overlap; boxes that only share an edge do not collide.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.x + other.w
            && other.x < self.x + self.w
            && self.y < other.y + other.h
            && other.y < self.y + self.h
    }
}

/// A bullet in flight, owned by the client that fired it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BulletSnapshot {
    pub position: Point,
    /// Aim point at the moment the bullet was fired.
    pub target: Point,
    pub source: SlotId,
}

impl BulletSnapshot {
    pub fn hitbox(&self) -> Rect {
        Rect::new(self.position.x, self.position.y, BULLET_SIZE, BULLET_SIZE)
    }
}

/// One player's self-reported state for one frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub position: Point,
    pub lives: i32,
    pub ammo: i32,
    /// Fractional walk-cycle index; the renderer truncates it.
    pub animation_frame: f32,
    pub facing_right: bool,
    /// Degrees, counter-clockwise from the +x axis.
    pub gun_angle: f32,
    pub alive: bool,
    pub respawn_timer: i32,
    pub can_dash: bool,
    #[serde(default)]
    pub bullets: Vec<BulletSnapshot>,
    /// Display name of the winner, once the sender considers the match over.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_over: Option<String>,
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("encoded snapshot is {len} bytes (max {MAX_PAYLOAD_LEN})")]
    TooLarge { len: usize },
    #[error("malformed snapshot: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl PlayerSnapshot {
    /// Serialize to the wire schema, refusing anything a frame cannot carry.
    pub fn encode(&self) -> Result<Vec<u8>, SnapshotError> {
        let bytes = serde_json::to_vec(self)?;
        if bytes.len() > MAX_PAYLOAD_LEN {
            return Err(SnapshotError::TooLarge { len: bytes.len() });
        }
        Ok(bytes)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_snapshot() -> PlayerSnapshot {
        PlayerSnapshot {
            position: Point::new(10, 20),
            lives: 3,
            ammo: 2,
            animation_frame: 1.4,
            facing_right: false,
            gun_angle: -35.5,
            alive: true,
            respawn_timer: 0,
            can_dash: true,
            bullets: vec![BulletSnapshot {
                position: Point::new(40, 60),
                target: Point::new(900, 20),
                source: SlotId::FIRST,
            }],
            game_over: None,
        }
    }

    #[test]
    fn encode_decode_preserves_every_field() {
        let snap = sample_snapshot();
        let bytes = snap.encode().unwrap();
        assert_eq!(PlayerSnapshot::decode(&bytes).unwrap(), snap);
    }

    #[test]
    fn game_over_is_omitted_until_set() {
        let mut snap = sample_snapshot();
        let json = String::from_utf8(snap.encode().unwrap()).unwrap();
        assert!(!json.contains("game_over"));

        snap.game_over = Some("Player 2".into());
        let json = String::from_utf8(snap.encode().unwrap()).unwrap();
        assert!(json.contains(r#""game_over":"Player 2""#));
    }

    #[test]
    fn missing_bullets_default_to_empty() {
        let json = r#"{"position":{"x":1,"y":2},"lives":3,"ammo":3,
            "animation_frame":0.0,"facing_right":true,"gun_angle":0.0,
            "alive":true,"respawn_timer":0,"can_dash":true}"#;
        let snap = PlayerSnapshot::decode(json.as_bytes()).unwrap();
        assert!(snap.bullets.is_empty());
        assert_eq!(snap.game_over, None);
    }

    #[test]
    fn empty_object_is_not_a_snapshot() {
        assert!(matches!(
            PlayerSnapshot::decode(b"{}"),
            Err(SnapshotError::Malformed(_))
        ));
    }

    #[test]
    fn encode_refuses_oversized_snapshot() {
        let mut snap = sample_snapshot();
        let bullet = snap.bullets[0].clone();
        snap.bullets = vec![bullet; 500];
        assert!(matches!(
            snap.encode(),
            Err(SnapshotError::TooLarge { .. })
        ));
    }

    #[test]
    fn bullet_hitbox_overlap() {
        let bullet = &sample_snapshot().bullets[0];
        let player = Rect::new(50, 70, 50, 75);
        assert!(bullet.hitbox().intersects(&player));

        let touching = Rect::new(60, 60, 50, 75);
        assert!(!bullet.hitbox().intersects(&touching));
    }
}
