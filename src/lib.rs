//! prism-rt: spectral dispersion through a rotating faceted crystal
//!
//! This library implements the simulation core of an interactive "prism"
//! visual. A faceted convex solid is generated once, rotated and projected to
//! 2D every frame, reduced to its convex outline, and a ray cast from the
//! smoothed pointer is traced per wavelength through the outline and the
//! scene bounds.
//!
//! Drawing is left to the host: each frame produces a [`FrameOutput`] with
//! projected vertices, the hull and an ordered list of beam segments.

pub mod config;
pub mod engine;
pub mod geometry;
pub mod hash;
pub mod hull;
pub mod projector;
pub mod spectrum;
pub mod spring;
pub mod tracer;

pub use config::PrismConfig;
pub use engine::{Engine, EngineState, FrameInput, FrameOutput, FrameScheduler, Viewport};
pub use geometry::{generate_mesh, Mesh};
pub use hull::{convex_hull, Hull};
pub use spectrum::{spectral_bands, SpectralBand};
pub use tracer::{trace, BeamSegment, Bounds, Ray, TraceParams};

/// Fixed simulation step (60 Hz)
pub const FRAME_DT: f64 = 1.0 / 60.0;

/// Default number of spectral samples
pub const DEFAULT_SPECTRAL_SAMPLES: usize = 15;

/// Default number of ray bounces
pub const DEFAULT_BOUNCES: u32 = 5;
