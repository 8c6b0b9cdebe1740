//! Per-time scene evaluation.
//!
//! Everything here is a pure function of [`SceneTime`] in the 1080x1920 design space. The
//! rasterizer consumes a [`SceneState`] and never looks at time itself.

use crate::foundation::core::{DESIGN_HEIGHT, DESIGN_WIDTH, Point, Rect, SceneTime, Vec2};
use crate::scene::phase::{BLACKOUT_START_SECS, DISTORTION_START_SECS, Phase};

/// Horizon line of the corridor perspective.
pub const HORIZON_Y: f64 = DESIGN_HEIGHT * 0.35;

/// Seconds over which the door grows from far to near.
pub const DOOR_APPROACH_SECS: f64 = 16.0;
/// Seconds over which the silhouette crosses the room.
pub const CREEP_SECS: f64 = 14.0;
/// Period of the shadow band sweep.
pub const SHADOW_PERIOD_SECS: f64 = 9.0;

/// Door footprint at `progress == 0`.
pub const DOOR_FAR_SIZE: (f64, f64) = (220.0, 440.0);
/// Footprint shrink at `progress == 1`.
pub const DOOR_NEAR_DELTA: (f64, f64) = (60.0, 100.0);
/// Number plate size.
pub const PLATE_SIZE: (f64, f64) = (96.0, 40.0);

/// Strobe weight when `sin(13.7t) * sin(7.9t)` exceeds the threshold.
pub const STROBE_WEIGHT: f64 = 0.65;
/// Weight of the forced window between 48 s and 50 s.
pub const FLICKER_WINDOW_WEIGHT: f64 = 0.9;
/// Weight of the sustained blackout flicker.
pub const BLACKOUT_WEIGHT: f64 = 1.0;
/// Wash opacity per unit of flicker.
pub const FLICKER_WASH_SCALE: f64 = 0.08;

const STROBE_OMEGA_A: f64 = 13.7;
const STROBE_OMEGA_B: f64 = 7.9;
const STROBE_THRESHOLD: f64 = 0.8;
const FLICKER_WINDOW: (f64, f64) = (48.0, 50.0);

const SWAY_AMPLITUDE: (f64, f64) = (6.0, 4.0);
const SWAY_OMEGA: (f64, f64) = (0.6, 0.7);

/// Bed base.
pub const BED_BASE: Rect = Rect::new(
    DESIGN_WIDTH * 0.2,
    DESIGN_HEIGHT * 0.58,
    DESIGN_WIDTH * 0.8,
    DESIGN_HEIGHT * 0.58 + 36.0,
);
/// Bed headboard.
pub const BED_HEADBOARD: Rect = Rect::new(
    DESIGN_WIDTH * 0.2 + 12.0,
    DESIGN_HEIGHT * 0.58 - 70.0,
    DESIGN_WIDTH * 0.8 - 12.0,
    DESIGN_HEIGHT * 0.58,
);
/// Lamp stem.
pub const LAMP_STEM: Rect = Rect::new(
    DESIGN_WIDTH * 0.72,
    DESIGN_HEIGHT * 0.5,
    DESIGN_WIDTH * 0.72 + 16.0,
    DESIGN_HEIGHT * 0.5 + 100.0,
);
/// Lamp shade triangle.
pub const LAMP_SHADE: [Point; 3] = [
    Point::new(DESIGN_WIDTH * 0.69, DESIGN_HEIGHT * 0.5),
    Point::new(DESIGN_WIDTH * 0.81, DESIGN_HEIGHT * 0.5),
    Point::new(DESIGN_WIDTH * 0.75, DESIGN_HEIGHT * 0.45),
];
/// Centre of the lamp light falloff.
pub const LAMP_LIGHT_CENTER: Point = Point::new(DESIGN_WIDTH * 0.75, DESIGN_HEIGHT * 0.49);
/// Inner and outer radius of the lamp light falloff.
pub const LAMP_LIGHT_RADII: (f64, f64) = (10.0, 420.0);

/// Door and plate placement for one instant.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DoorGeometry {
    /// Approach progress in `[0, 1]`.
    pub progress: f64,
    /// Door face.
    pub rect: Rect,
    /// Number plate.
    pub plate: Rect,
    /// Centre of the "213" label.
    pub label_center: Point,
}

/// Lamp light for one instant.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LampState {
    /// Opacity at the centre of the light falloff.
    pub light_alpha: f64,
}

/// Creeping figure for one instant.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SilhouetteState {
    /// Crossing progress in `[0, 1]`.
    pub creep: f64,
    /// Origin the figure's local geometry is drawn around.
    pub anchor: Point,
}

/// Full visual state of the scene at one time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SceneState {
    /// Time this state was evaluated at.
    pub time: SceneTime,
    /// Derived phase.
    pub phase: Phase,
    /// Draw offset applied to all geometric layers.
    pub sway: Vec2,
    /// Focal door.
    pub door: DoorGeometry,
    /// Summed flicker weight (0 when no trigger is active).
    pub flicker: f64,
    /// Translucent band sweeping under the door.
    pub shadow_band: Rect,
    /// Present once the interior phase begins.
    pub lamp: Option<LampState>,
    /// Present once the distortion phase begins.
    pub silhouette: Option<SilhouetteState>,
}

impl SceneState {
    /// Evaluate the scene at `time`.
    pub fn at(time: SceneTime) -> Self {
        let t = time.secs();
        let phase = Phase::at(time);
        let door = door_geometry(door_progress(t));

        let lamp = phase.shows_bed_and_lamp().then(|| LampState {
            light_alpha: lamp_light_alpha(t),
        });
        let silhouette = phase.shows_silhouette().then(|| {
            let creep = creep_progress(t);
            SilhouetteState {
                creep,
                anchor: Point::new(
                    DESIGN_WIDTH * (0.2 + 0.6 * creep),
                    DESIGN_HEIGHT * (0.7 - 0.25 * creep),
                ),
            }
        });

        Self {
            time,
            phase,
            sway: camera_sway(t),
            door,
            flicker: flicker_intensity(t),
            shadow_band: shadow_band(t, door.rect),
            lamp,
            silhouette,
        }
    }

    /// Opacity of the near-white flicker wash.
    pub fn flicker_wash_alpha(&self) -> f64 {
        (FLICKER_WASH_SCALE * self.flicker).clamp(0.0, 1.0)
    }
}

/// `min(1, t / 16)`.
pub fn door_progress(t: f64) -> f64 {
    (t / DOOR_APPROACH_SECS).clamp(0.0, 1.0)
}

/// Door and plate for a given approach progress.
pub fn door_geometry(progress: f64) -> DoorGeometry {
    let w = DOOR_FAR_SIZE.0 - progress * DOOR_NEAR_DELTA.0;
    let h = DOOR_FAR_SIZE.1 - progress * DOOR_NEAR_DELTA.1;
    let x = DESIGN_WIDTH / 2.0 - w / 2.0;
    let y = HORIZON_Y - h + 40.0;
    let rect = Rect::new(x, y, x + w, y + h);

    let (pw, ph) = PLATE_SIZE;
    let px = x + w / 2.0 - pw / 2.0;
    let py = y + h * 0.2;
    let plate = Rect::new(px, py, px + pw, py + ph);

    DoorGeometry {
        progress,
        rect,
        plate,
        label_center: Point::new(px + pw / 2.0, py + ph / 2.0 + 2.0),
    }
}

/// Sum of the three flicker triggers.
pub fn flicker_intensity(t: f64) -> f64 {
    let strobe = if (t * STROBE_OMEGA_A).sin() * (t * STROBE_OMEGA_B).sin() > STROBE_THRESHOLD {
        STROBE_WEIGHT
    } else {
        0.0
    };
    let window = if t > FLICKER_WINDOW.0 && t < FLICKER_WINDOW.1 {
        FLICKER_WINDOW_WEIGHT
    } else {
        0.0
    };
    let blackout = if t > BLACKOUT_START_SECS {
        BLACKOUT_WEIGHT
    } else {
        0.0
    };
    strobe + window + blackout
}

/// Camera sway offset in design pixels.
pub fn camera_sway(t: f64) -> Vec2 {
    Vec2::new(
        SWAY_AMPLITUDE.0 * (t * SWAY_OMEGA.0).sin(),
        SWAY_AMPLITUDE.1 * (t * SWAY_OMEGA.1).cos(),
    )
}

/// Shadow band under `door` at time `t`.
pub fn shadow_band(t: f64, door: Rect) -> Rect {
    let phase = t.rem_euclid(SHADOW_PERIOD_SECS) / SHADOW_PERIOD_SECS;
    let y = door.y1 - 30.0 + (phase * std::f64::consts::TAU).sin() * 18.0;
    let x = door.x0 - 40.0;
    Rect::new(x, y, x + door.width() + 80.0, y + 20.0)
}

/// Lamp light opacity, pulsing independently of the flicker wash.
pub fn lamp_light_alpha(t: f64) -> f64 {
    let pulse = 0.2 + 0.1 * (t * 12.3).sin();
    (0.08 + pulse).clamp(0.0, 1.0)
}

/// `min(1, (t - 32) / 14)`, zero before the distortion phase.
pub fn creep_progress(t: f64) -> f64 {
    ((t - DISTORTION_START_SECS) / CREEP_SECS).clamp(0.0, 1.0)
}

#[cfg(test)]
#[path = "../../tests/unit/scene/state.rs"]
mod tests;
