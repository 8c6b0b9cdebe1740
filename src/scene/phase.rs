use crate::foundation::core::SceneTime;

/// Bed and lamp appear strictly after this time.
pub const INTERIOR_START_SECS: f64 = 18.0;
/// The silhouette starts creeping strictly after this time.
pub const DISTORTION_START_SECS: f64 = 32.0;
/// Sustained full flicker strictly after this time.
pub const BLACKOUT_START_SECS: f64 = 58.0;

/// Named interval of scene time.
///
/// Derived from time on demand; it only decides which optional set pieces are drawn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    /// Hallway approach, `[0, 18]`.
    Approach,
    /// Inside the room, `(18, 32]`.
    Interior,
    /// Silhouette creeping, `(32, 58]`.
    Distortion,
    /// Forced flicker to the end, `(58, duration]`.
    Blackout,
}

impl Phase {
    /// Classify a scene time.
    pub fn at(time: SceneTime) -> Self {
        let t = time.secs();
        if t > BLACKOUT_START_SECS {
            Self::Blackout
        } else if t > DISTORTION_START_SECS {
            Self::Distortion
        } else if t > INTERIOR_START_SECS {
            Self::Interior
        } else {
            Self::Approach
        }
    }

    /// Lowercase name, used in logs.
    pub fn name(self) -> &'static str {
        match self {
            Self::Approach => "approach",
            Self::Interior => "interior",
            Self::Distortion => "distortion",
            Self::Blackout => "blackout",
        }
    }

    /// Whether the bed and lamp are drawn.
    pub fn shows_bed_and_lamp(self) -> bool {
        self >= Self::Interior
    }

    /// Whether the silhouette is drawn.
    pub fn shows_silhouette(self) -> bool {
        self >= Self::Distortion
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/phase.rs"]
mod tests;
