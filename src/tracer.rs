//! Recursive 2D spectral ray tracer
//!
//! One incoming ray is traced once per spectral band through the crystal
//! outline and the rectangular scene bounds. Each band refracts by its own
//! index, so a single external ray fans out into a dispersion pattern.

use crate::hull::Hull;
use crate::spectrum::SpectralBand;
use nalgebra::{Point2, Vector2};
use serde::Serialize;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Index of refraction outside the crystal
pub const N_AIR: f64 = 1.0;

/// Ray/segment determinants below this are treated as parallel
const PARALLEL_EPSILON: f64 = 1e-12;

/// Hits closer than this along the ray are self-intersections
const T_EPSILON: f64 = 1e-9;

/// A ray in 2D screen space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Point2<f64>,
    pub direction: Vector2<f64>,
}

impl Ray {
    /// Build a ray, normalising `direction`. Returns `None` for a zero or
    /// non-finite direction.
    pub fn new(origin: Point2<f64>, direction: Vector2<f64>) -> Option<Self> {
        let direction = direction.try_normalize(f64::EPSILON)?;
        if !(direction.x.is_finite() && direction.y.is_finite()) {
            return None;
        }
        Some(Self { origin, direction })
    }

    /// Ray from `origin` aimed at `target`
    pub fn toward(origin: Point2<f64>, target: Point2<f64>) -> Option<Self> {
        Self::new(origin, target - origin)
    }

    pub fn at(&self, t: f64) -> Point2<f64> {
        self.origin + self.direction * t
    }
}

/// Hit record for a ray/edge intersection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intersection {
    pub point: Point2<f64>,
    /// Unit normal pointing out of the crystal, or out of the scene for bounds
    pub normal: Vector2<f64>,
    pub edge_index: usize,
    pub t: f64,
}

/// Rectangular scene bounds with the origin at the top-left corner
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bounds {
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// True when `p` lies inside the rectangle or on its border
    pub fn contains(&self, p: &Point2<f64>) -> bool {
        (0.0..=self.width).contains(&p.x) && (0.0..=self.height).contains(&p.y)
    }

    fn corners(&self) -> [Point2<f64>; 4] {
        [
            Point2::new(0.0, 0.0),
            Point2::new(self.width, 0.0),
            Point2::new(self.width, self.height),
            Point2::new(0.0, self.height),
        ]
    }

    /// Nearest wall hit along `ray`
    pub fn intersect(&self, ray: &Ray) -> Option<Intersection> {
        let corners = self.corners();
        let mut closest: Option<Intersection> = None;

        for i in 0..4 {
            let a = corners[i];
            let b = corners[(i + 1) % 4];
            if let Some(t) = intersect_segment(ray, a, b) {
                if closest.map_or(true, |c| t < c.t) {
                    let d = b - a;
                    let Some(normal) = Vector2::new(d.y, -d.x).try_normalize(f64::EPSILON) else {
                        continue;
                    };
                    closest = Some(Intersection {
                        point: ray.at(t),
                        normal,
                        edge_index: i,
                        t,
                    });
                }
            }
        }

        closest
    }
}

/// Tracer tunables
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraceParams {
    pub max_bounces: u32,
    /// Fraction of intensity lost per pass through the crystal, in [0, 0.8]
    pub absorption: f64,
    /// Intensity kept after bouncing off a scene wall
    pub wall_reflectance: f64,
    /// Intensity kept when total internal reflection turns a ray away
    pub tir_reflectance: f64,
    /// Branches below this intensity are dropped
    pub min_intensity: f64,
}

impl Default for TraceParams {
    fn default() -> Self {
        Self {
            max_bounces: crate::DEFAULT_BOUNCES,
            absorption: 0.1,
            wall_reflectance: 0.7,
            tir_reflectance: 0.5,
            min_intensity: 0.01,
        }
    }
}

/// One straight piece of a traced beam
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BeamSegment {
    pub start: Point2<f64>,
    pub end: Point2<f64>,
    /// Index into the band list passed to [`trace`]
    pub band: usize,
    pub wavelength_nm: f64,
    pub intensity: f64,
    pub bounce_index: u32,
    /// Outside the crystal (true) or inside it (false)
    pub is_external: bool,
}

impl BeamSegment {
    /// The incoming light before it first reaches anything
    pub fn is_first_external(&self) -> bool {
        self.bounce_index == 0 && self.is_external
    }

    pub fn length(&self) -> f64 {
        (self.end - self.start).norm()
    }
}

/// Mirror `incident` about `normal`
pub fn reflect(incident: &Vector2<f64>, normal: &Vector2<f64>) -> Vector2<f64> {
    *incident - 2.0 * incident.dot(normal) * *normal
}

/// Refract `incident` through a surface with unit `normal` facing against
/// it, where `eta` is n1 / n2. Returns `None` on total internal reflection.
pub fn refract(incident: &Vector2<f64>, normal: &Vector2<f64>, eta: f64) -> Option<Vector2<f64>> {
    let cos_i = -normal.dot(incident);
    let sin_t2 = eta * eta * (1.0 - cos_i * cos_i);
    if sin_t2 > 1.0 {
        return None;
    }
    let cos_t = (1.0 - sin_t2).sqrt();
    let refracted = eta * *incident + (eta * cos_i - cos_t) * *normal;
    refracted.try_normalize(f64::EPSILON)
}

/// Distance along `ray` to segment `a`-`b`, or `None` when it misses, runs
/// parallel, or only touches behind the origin.
pub fn intersect_segment(ray: &Ray, a: Point2<f64>, b: Point2<f64>) -> Option<f64> {
    let e = b - a;
    let det = ray.direction.perp(&e);
    if det.abs() < PARALLEL_EPSILON {
        return None;
    }
    let w = a - ray.origin;
    let t = w.perp(&e) / det;
    let u = w.perp(&ray.direction) / det;

    if t > T_EPSILON && (0.0..=1.0).contains(&u) && t.is_finite() {
        Some(t)
    } else {
        None
    }
}

/// Nearest hull edge hit, optionally ignoring one edge
fn intersect_hull(hull: &Hull, ray: &Ray, skip_edge: Option<usize>) -> Option<Intersection> {
    let mut closest: Option<Intersection> = None;

    for i in 0..hull.edge_count() {
        if skip_edge == Some(i) {
            continue;
        }
        let (a, b) = hull.edge(i);
        let Some(t) = intersect_segment(ray, a, b) else {
            continue;
        };
        if closest.map_or(true, |c| t < c.t) {
            let Some(normal) = hull.outward_normal(i) else {
                continue;
            };
            closest = Some(Intersection {
                point: ray.at(t),
                normal,
                edge_index: i,
                t,
            });
        }
    }

    closest
}

/// Flip `normal` so it faces against `direction`
fn facing(normal: Vector2<f64>, direction: &Vector2<f64>) -> Vector2<f64> {
    if normal.dot(direction) >= 0.0 {
        -normal
    } else {
        normal
    }
}

fn is_finite_point(p: &Point2<f64>) -> bool {
    p.x.is_finite() && p.y.is_finite()
}

/// Per-band trace context
struct BandTracer<'a> {
    hull: &'a Hull,
    bounds: &'a Bounds,
    params: &'a TraceParams,
    band_index: usize,
    band: &'a SpectralBand,
    segments: Vec<BeamSegment>,
}

impl BandTracer<'_> {
    fn emit(
        &mut self,
        start: Point2<f64>,
        end: Point2<f64>,
        intensity: f64,
        bounce_index: u32,
        is_external: bool,
    ) -> bool {
        if !(is_finite_point(&start) && is_finite_point(&end)) {
            return false;
        }
        self.segments.push(BeamSegment {
            start,
            end,
            band: self.band_index,
            wavelength_nm: self.band.wavelength_nm,
            intensity: intensity.clamp(0.0, 1.0),
            bounce_index,
            is_external,
        });
        true
    }

    /// `skip_hull_edge` is the crystal edge the ray has just left through
    fn trace(&mut self, ray: Ray, depth_remaining: u32, intensity: f64, skip_hull_edge: Option<usize>) {
        if depth_remaining == 0 || !(intensity >= self.params.min_intensity) {
            return;
        }
        let bounce_index = self.params.max_bounces.saturating_sub(depth_remaining);

        let wall = self.bounds.intersect(&ray);
        let entry = intersect_hull(self.hull, &ray, skip_hull_edge);

        let entry = match (entry, wall) {
            (Some(entry), Some(wall)) if entry.t < wall.t => entry,
            (Some(entry), None) => entry,
            (_, Some(wall)) => {
                if !self.emit(ray.origin, wall.point, intensity, bounce_index, true) {
                    return;
                }
                let reflected = reflect(&ray.direction, &wall.normal);
                if let Some(next) = Ray::new(wall.point, reflected) {
                    self.trace(
                        next,
                        depth_remaining - 1,
                        intensity * self.params.wall_reflectance,
                        None,
                    );
                }
                return;
            }
            (None, None) => return,
        };

        if !self.emit(ray.origin, entry.point, intensity, bounce_index, true) {
            return;
        }

        let n = self.band.refractive_index;
        let normal_in = facing(entry.normal, &ray.direction);
        let Some(inside) = refract(&ray.direction, &normal_in, N_AIR / n) else {
            tracing::trace!(band = self.band_index, "Total internal reflection at entry");
            let reflected = reflect(&ray.direction, &normal_in);
            if let Some(next) = Ray::new(entry.point, reflected) {
                self.trace(
                    next,
                    depth_remaining - 1,
                    intensity * self.params.tir_reflectance,
                    Some(entry.edge_index),
                );
            }
            return;
        };

        let Some(inner_ray) = Ray::new(entry.point, inside) else {
            return;
        };
        let Some(exit) = intersect_hull(self.hull, &inner_ray, Some(entry.edge_index)) else {
            tracing::trace!(band = self.band_index, "Ray trapped inside crystal");
            return;
        };

        if !self.emit(entry.point, exit.point, intensity, bounce_index, false) {
            return;
        }

        let normal_out = facing(exit.normal, &inside);
        let Some(outside) = refract(&inside, &normal_out, n / N_AIR) else {
            tracing::trace!(band = self.band_index, "Total internal reflection at exit");
            return;
        };

        if let Some(next) = Ray::new(exit.point, outside) {
            self.trace(
                next,
                depth_remaining - 1,
                intensity * (1.0 - self.params.absorption),
                Some(exit.edge_index),
            );
        }
    }
}

fn trace_band(
    hull: &Hull,
    bounds: &Bounds,
    ray: &Ray,
    band_index: usize,
    band: &SpectralBand,
    params: &TraceParams,
) -> Vec<BeamSegment> {
    let mut tracer = BandTracer {
        hull,
        bounds,
        params,
        band_index,
        band,
        segments: Vec::new(),
    };
    tracer.trace(*ray, params.max_bounces, 1.0, None);
    tracer.segments
}

/// Trace `ray` through the crystal once per band.
///
/// Segments are grouped by band in band order, and within a band in the order
/// they were produced. Nothing is emitted for a degenerate hull, or when the
/// light starts inside the crystal or outside the bounds.
pub fn trace(
    hull: &Hull,
    bounds: &Bounds,
    ray: &Ray,
    bands: &[SpectralBand],
    params: &TraceParams,
) -> Vec<BeamSegment> {
    if hull.is_degenerate() {
        tracing::debug!(hull_points = hull.len(), "Degenerate hull, skipping trace");
        return Vec::new();
    }
    if !bounds.contains(&ray.origin) {
        tracing::debug!("Light source outside scene bounds, skipping trace");
        return Vec::new();
    }
    if hull.contains(&ray.origin) {
        tracing::debug!("Light source inside crystal, skipping trace");
        return Vec::new();
    }

    #[cfg(feature = "parallel")]
    let per_band: Vec<Vec<BeamSegment>> = bands
        .par_iter()
        .enumerate()
        .map(|(i, band)| trace_band(hull, bounds, ray, i, band, params))
        .collect();

    #[cfg(not(feature = "parallel"))]
    let per_band: Vec<Vec<BeamSegment>> = bands
        .iter()
        .enumerate()
        .map(|(i, band)| trace_band(hull, bounds, ray, i, band, params))
        .collect();

    per_band.into_iter().flatten().collect()
}
