//! Per-frame pipeline
//!
//! [`Engine::step`] is a pure function from the previous [`EngineState`] and
//! this frame's input to the next state and a [`FrameOutput`]. Hosts that
//! prefer a stateful handle can drive a [`FrameScheduler`] instead.

use crate::config::PrismConfig;
use crate::geometry::{generate_mesh, Mesh, Vertex3};
use crate::hull::{convex_hull, Hull};
use crate::projector::{project, RotationAccumulator};
use crate::spectrum::{spectral_bands, SpectralBand};
use crate::spring::PointerSpring;
use crate::tracer::{trace, BeamSegment, Bounds, Ray};
use nalgebra::{Point2, Vector2};
use serde::Serialize;

/// Pointer positions are kept at least this far from the viewport edge
pub const POINTER_PADDING: f64 = 24.0;

/// Crystal radius in pixels per unit of `crystal_scale`, relative to the
/// smaller viewport dimension
const SCALE_FACTOR: f64 = 0.3;

/// Viewport size in pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn center(&self) -> Point2<f64> {
        Point2::new(self.width * 0.5, self.height * 0.5)
    }

    /// Clamp `p` into the viewport inset by `padding` on every side
    pub fn clamp_padded(&self, p: Point2<f64>, padding: f64) -> Point2<f64> {
        let c = self.center();
        let axis = |v: f64, size: f64, centre: f64| -> f64 {
            if !v.is_finite() || size < 2.0 * padding {
                centre
            } else {
                v.clamp(padding, size - padding)
            }
        };
        Point2::new(axis(p.x, self.width, c.x), axis(p.y, self.height, c.y))
    }
}

/// Values carried from one frame to the next
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct EngineState {
    pub spring: PointerSpring,
    pub rotation: RotationAccumulator,
}

impl EngineState {
    /// Spring at rest on `pointer`, no rotation yet
    pub fn at_rest(pointer: Point2<f64>) -> Self {
        Self {
            spring: PointerSpring::at(pointer),
            rotation: RotationAccumulator::default(),
        }
    }
}

/// Per-frame input sampled by the host
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInput {
    /// Latest raw pointer position in viewport pixels
    pub pointer: Point2<f64>,
    pub viewport: Viewport,
}

/// Everything the presentation layer needs for one frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameOutput {
    pub projected: Vec<Point2<f64>>,
    pub rotated: Vec<Vertex3>,
    pub hull: Hull,
    pub bands: Vec<SpectralBand>,
    pub segments: Vec<BeamSegment>,
    /// Light position used for this frame
    pub light: Point2<f64>,
    pub spring: PointerSpring,
    pub rotation: RotationAccumulator,
}

impl FrameOutput {
    /// Smoothed light position, kept inside the padded viewport
    pub fn light_position(&self) -> Point2<f64> {
        self.light
    }
}

/// Immutable per-session data: the crystal and its configuration
#[derive(Debug, Clone)]
pub struct Engine {
    mesh: Mesh,
    config: PrismConfig,
}

impl Engine {
    /// Generate the crystal for `config`. The config is assumed validated.
    pub fn new(config: PrismConfig) -> Self {
        let mesh = generate_mesh(&config.geometry.params());
        tracing::info!(
            vertices = mesh.vertex_count(),
            faces = mesh.face_count(),
            "Crystal ready"
        );
        Self { mesh, config }
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    pub fn config(&self) -> &PrismConfig {
        &self.config
    }

    /// Projection scale in pixels for `viewport`
    pub fn scale_for(&self, viewport: &Viewport) -> f64 {
        self.config.geometry.crystal_scale * SCALE_FACTOR * viewport.width.min(viewport.height)
    }

    /// Run one frame
    pub fn step(&self, state: &EngineState, input: &FrameInput, dt: f64) -> (EngineState, FrameOutput) {
        let viewport = input.viewport;
        let center = viewport.center();
        let motion = &self.config.motion;

        let target = viewport.clamp_padded(input.pointer, POINTER_PADDING);
        let spring = state.spring.update(target, &motion.spring(), dt);
        // an underdamped spring can overshoot past the viewport edge
        let light = viewport.clamp_padded(spring.position(), POINTER_PADDING);

        let half = Vector2::new(viewport.width * 0.5, viewport.height * 0.5);
        let offset = if half.x > 0.0 && half.y > 0.0 {
            (light - center).component_div(&half)
        } else {
            Vector2::zeros()
        };
        let rotation = state.rotation.advance(motion.rotation_speed, offset);

        let projection = project(&self.mesh, &rotation, self.scale_for(&viewport), center);
        let hull = convex_hull(&projection.points);
        let bands = spectral_bands(&self.config.optics.dispersion());

        let segments = match Ray::toward(light, center) {
            Some(ray) => trace(
                &hull,
                &Bounds::new(viewport.width, viewport.height),
                &ray,
                &bands,
                &self.config.optics.trace_params(),
            ),
            None => Vec::new(),
        };

        tracing::debug!(
            hull_points = hull.len(),
            segments = segments.len(),
            light_x = light.x,
            light_y = light.y,
            "Frame traced"
        );

        let next = EngineState { spring, rotation };
        let output = FrameOutput {
            projected: projection.points,
            rotated: projection.rotated,
            hull,
            bands,
            segments,
            light,
            spring,
            rotation,
        };

        (next, output)
    }
}

/// Owns the engine and its carried state, advancing both once per tick
#[derive(Debug, Clone)]
pub struct FrameScheduler {
    engine: Engine,
    state: EngineState,
    frame: u64,
}

impl FrameScheduler {
    pub fn new(engine: Engine, initial: EngineState) -> Self {
        Self {
            engine,
            state: initial,
            frame: 0,
        }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    /// Number of ticks run so far
    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn tick(&mut self, input: &FrameInput, dt: f64) -> FrameOutput {
        let (next, output) = self.engine.step(&self.state, input, dt);
        self.state = next;
        self.frame += 1;
        output
    }
}
