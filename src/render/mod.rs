//! Scene rasterization.
//!
//! [`compose::FrameCompositor`] is the entry point: it renders the scene with
//! [`cpu::SceneRenderer`], adds noise, then overlays captions.

/// Frame compositor.
pub mod compose;
/// `vello_cpu` scene renderer.
pub mod cpu;
/// Frame buffer type.
pub mod frame;
/// Luminance noise layer.
pub mod noise;
/// Fonts and text layout.
pub mod text;
