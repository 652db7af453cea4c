//! Bezier curves over a time interval and the three-phase swing curve.
//!
//! A [`BezierCurve`] of degree `n` with duration `T` is evaluated at time
//! `t` as the Bernstein polynomial at `u = t / T`. Time derivatives follow
//! the hodograph: the derivative of a degree-`n` curve is a degree-`n-1`
//! curve with control points `n * (P[i+1] - P[i]) / T`.

use clamber_core::SolveFailure;
use nalgebra::Vector3;

/// Lowest degree that can pin position, velocity and acceleration at both
/// ends.
pub const MIN_BOUNDARY_DEGREE: usize = 5;

// ---------------------------------------------------------------------------
// BezierCurve
// ---------------------------------------------------------------------------

/// Bezier curve in 3-D over `[0, duration]`.
#[derive(Debug, Clone, PartialEq)]
pub struct BezierCurve {
    control_points: Vec<Vector3<f64>>,
    duration: f64,
}

impl BezierCurve {
    /// Returns `None` without control points or with a non-positive duration.
    pub fn new(control_points: Vec<Vector3<f64>>, duration: f64) -> Option<Self> {
        if control_points.is_empty() || !(duration > 0.0 && duration.is_finite()) {
            return None;
        }
        Some(Self {
            control_points,
            duration,
        })
    }

    pub fn degree(&self) -> usize {
        self.control_points.len() - 1
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn control_points(&self) -> &[Vector3<f64>] {
        &self.control_points
    }

    pub fn start(&self) -> Vector3<f64> {
        self.control_points[0]
    }

    pub fn end(&self) -> Vector3<f64> {
        self.control_points[self.control_points.len() - 1]
    }

    /// Position at time `t`, clamped to `[0, duration]`.
    pub fn eval(&self, t: f64) -> Vector3<f64> {
        de_casteljau(&self.control_points, (t / self.duration).clamp(0.0, 1.0))
    }

    /// Time derivative curve (hodograph). A constant curve differentiates to
    /// the zero curve.
    #[must_use]
    pub fn derivative(&self) -> Self {
        let n = self.degree();
        if n == 0 {
            return Self {
                control_points: vec![Vector3::zeros()],
                duration: self.duration,
            };
        }
        let scale = n as f64 / self.duration;
        let control_points = self
            .control_points
            .windows(2)
            .map(|w| (w[1] - w[0]) * scale)
            .collect();
        Self {
            control_points,
            duration: self.duration,
        }
    }

    /// `order`-th time derivative at `t`.
    pub fn derivative_at(&self, t: f64, order: usize) -> Vector3<f64> {
        let mut curve = self.clone();
        for _ in 0..order {
            curve = curve.derivative();
        }
        curve.eval(t)
    }

    /// Position, velocity and acceleration at the start.
    pub fn start_state(&self) -> [Vector3<f64>; 3] {
        [
            self.start(),
            self.derivative_at(0.0, 1),
            self.derivative_at(0.0, 2),
        ]
    }

    /// Position, velocity and acceleration at the end.
    pub fn end_state(&self) -> [Vector3<f64>; 3] {
        [
            self.end(),
            self.derivative_at(self.duration, 1),
            self.derivative_at(self.duration, 2),
        ]
    }
}

/// Evaluate a Bezier curve at parameter `u` using De Casteljau's algorithm.
fn de_casteljau(points: &[Vector3<f64>], u: f64) -> Vector3<f64> {
    let mut work = points.to_vec();
    let n = work.len();
    for k in 1..n {
        for i in 0..(n - k) {
            work[i] = work[i] * (1.0 - u) + work[i + 1] * u;
        }
    }
    work[0]
}

/// Bernstein basis polynomial `C(n, i) u^i (1-u)^(n-i)`.
pub fn bernstein(n: usize, i: usize, u: f64) -> f64 {
    if i > n {
        return 0.0;
    }
    binomial(n, i) * u.powi(exponent(i)) * (1.0 - u).powi(exponent(n - i))
}

pub(crate) fn binomial(n: usize, k: usize) -> f64 {
    let k = k.min(n - k);
    (0..k).fold(1.0, |acc, j| acc * (n - j) as f64 / (j + 1) as f64)
}

fn exponent(k: usize) -> i32 {
    i32::try_from(k).unwrap_or(i32::MAX)
}

// ---------------------------------------------------------------------------
// Boundary conditions
// ---------------------------------------------------------------------------

/// Position, velocity and acceleration required at both ends of a curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundaryConditions {
    pub c0: Vector3<f64>,
    pub dc0: Vector3<f64>,
    pub ddc0: Vector3<f64>,
    pub c1: Vector3<f64>,
    pub dc1: Vector3<f64>,
    pub ddc1: Vector3<f64>,
}

impl BoundaryConditions {
    /// Rest-to-rest conditions between `c0` and `c1`.
    pub fn at_rest(c0: Vector3<f64>, c1: Vector3<f64>) -> Self {
        Self {
            c0,
            dc0: Vector3::zeros(),
            ddc0: Vector3::zeros(),
            c1,
            dc1: Vector3::zeros(),
            ddc1: Vector3::zeros(),
        }
    }

    /// Conditions joining the end of `before` to the start of `after`.
    pub fn between(before: &BezierCurve, after: &BezierCurve) -> Self {
        let [c0, dc0, ddc0] = before.end_state();
        let [c1, dc1, ddc1] = after.start_state();
        Self {
            c0,
            dc0,
            ddc0,
            c1,
            dc1,
            ddc1,
        }
    }
}

/// Control points of a degree-`degree` curve over `duration` meeting `bc`.
///
/// The first three and last three points are fixed by the boundary
/// conditions:
///
/// ```text
/// P0   = c0                 Pn   = c1
/// P1   = P0 + dc0 T/n       Pn-1 = Pn - dc1 T/n
/// P2   = ddc0 T²/(n(n-1)) + 2 P1 - P0
/// Pn-2 = ddc1 T²/(n(n-1)) + 2 Pn-1 - Pn
/// ```
///
/// Free interior points are spread linearly between `P2` and `Pn-2`.
pub fn constant_waypoints(
    bc: &BoundaryConditions,
    duration: f64,
    degree: usize,
) -> Result<Vec<Vector3<f64>>, SolveFailure> {
    if degree < MIN_BOUNDARY_DEGREE {
        return Err(SolveFailure::DegreeTooLow { degree });
    }
    if !(duration > 0.0 && duration.is_finite()) {
        return Err(SolveFailure::Setup(format!("invalid duration {duration}")));
    }
    let n = degree as f64;
    let vel = duration / n;
    let acc = duration * duration / (n * (n - 1.0));

    let p0 = bc.c0;
    let p1 = p0 + bc.dc0 * vel;
    let p2 = bc.ddc0 * acc + 2.0 * p1 - p0;
    let pn = bc.c1;
    let pn1 = pn - bc.dc1 * vel;
    let pn2 = bc.ddc1 * acc + 2.0 * pn1 - pn;

    let mut points = vec![p0, p1, p2];
    let gaps = degree - 4;
    for k in 1..gaps {
        let s = k as f64 / gaps as f64;
        points.push(p2 * (1.0 - s) + pn2 * s);
    }
    points.extend([pn2, pn1, pn]);
    Ok(points)
}

/// Curve fully determined by boundary conditions.
pub fn boundary_curve(
    bc: &BoundaryConditions,
    duration: f64,
    degree: usize,
) -> Result<BezierCurve, SolveFailure> {
    let points = constant_waypoints(bc, duration, degree)?;
    BezierCurve::new(points, duration)
        .ok_or_else(|| SolveFailure::Setup("empty boundary curve".into()))
}

// ---------------------------------------------------------------------------
// SwingCurve
// ---------------------------------------------------------------------------

/// Takeoff, middle and landing curves laid end to end in reference-path
/// time.
///
/// Segment `k` covers `[start_k, start_k + duration_k)`; the last segment is
/// closed on the right.
#[derive(Debug, Clone, PartialEq)]
pub struct SwingCurve {
    start_time: f64,
    segments: [BezierCurve; 3],
}

impl SwingCurve {
    pub fn new(
        start_time: f64,
        takeoff: BezierCurve,
        middle: BezierCurve,
        landing: BezierCurve,
    ) -> Self {
        Self {
            start_time,
            segments: [takeoff, middle, landing],
        }
    }

    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration()
    }

    pub fn duration(&self) -> f64 {
        self.segments.iter().map(BezierCurve::duration).sum()
    }

    pub fn takeoff(&self) -> &BezierCurve {
        &self.segments[0]
    }

    pub fn middle(&self) -> &BezierCurve {
        &self.segments[1]
    }

    pub fn landing(&self) -> &BezierCurve {
        &self.segments[2]
    }

    /// Times at which takeoff hands over to the middle segment and the
    /// middle segment to landing.
    pub fn segment_boundaries(&self) -> [f64; 2] {
        let t1 = self.start_time + self.segments[0].duration();
        [t1, t1 + self.segments[1].duration()]
    }

    /// Segment active at `t` and the local time inside it.
    fn locate(&self, t: f64) -> (&BezierCurve, f64) {
        let [t1, t2] = self.segment_boundaries();
        if t < t1 {
            (&self.segments[0], t - self.start_time)
        } else if t < t2 {
            (&self.segments[1], t - t1)
        } else {
            (&self.segments[2], t - t2)
        }
    }

    /// Position at time `t`, clamped to the curve's time range.
    pub fn eval(&self, t: f64) -> Vector3<f64> {
        let (segment, local) = self.locate(t);
        segment.eval(local)
    }

    pub fn derivative_at(&self, t: f64, order: usize) -> Vector3<f64> {
        let (segment, local) = self.locate(t);
        segment.derivative_at(local, order)
    }

    /// `count` positions evenly spaced over the curve's time range.
    pub fn sample(&self, count: usize) -> Vec<Vector3<f64>> {
        match count {
            0 => Vec::new(),
            1 => vec![self.eval(self.start_time)],
            _ => {
                let step = self.duration() / (count - 1) as f64;
                (0..count)
                    .map(|i| self.eval(self.start_time + step * i as f64))
                    .collect()
            }
        }
    }
}
