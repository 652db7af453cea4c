//! Middle-phase boundary-value solver: builds and solves the control-point QP.
//!
//! Uses Clarabel (pure Rust interior-point solver) to find the control
//! points of a Bezier curve that meets position, velocity and acceleration
//! conditions at both ends while passing close to a set of timed waypoints.
//!
//! # QP Formulation
//!
//! Decision variables: z = [P_0, ..., P_n], three coordinates per point.
//!
//! Cost: sum over j of |B(u_j) - w_j|^2 + λ ∫ |B''(t)|^2 dt
//!
//! Subject to:
//! - P_0, P_1, P_2 fixed by (c0, dc0, ddc0) (equality)
//! - P_n-2, P_n-1, P_n fixed by (c1, dc1, ddc1) (equality)

use clamber_core::{SolveFailure, SwingConfig};
use clarabel::algebra::CscMatrix;
use clarabel::solver::{
    DefaultSettingsBuilder, DefaultSolver, IPSolver, SolverStatus, SupportedConeT::ZeroConeT,
};
use nalgebra::{DMatrix, DVector, Vector3};

use crate::bezier::{
    BezierCurve, BoundaryConditions, MIN_BOUNDARY_DEGREE, bernstein, binomial, constant_waypoints,
};

/// Target position for the curve at normalized time `u` in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitPoint {
    pub u: f64,
    pub position: Vector3<f64>,
}

/// Solves for a curve meeting boundary conditions and approaching waypoints.
pub trait BoundaryValueSolver: Send + Sync {
    fn solve(
        &self,
        bc: &BoundaryConditions,
        waypoints: &[FitPoint],
        duration: f64,
    ) -> Result<BezierCurve, SolveFailure>;
}

/// Clarabel-backed [`BoundaryValueSolver`].
#[derive(Debug, Clone)]
pub struct QpBoundarySolver {
    degree: usize,
    smoothness_weight: f64,
    max_iter: u32,
}

impl QpBoundarySolver {
    pub const fn new(degree: usize, smoothness_weight: f64, max_iter: u32) -> Self {
        Self {
            degree,
            smoothness_weight,
            max_iter,
        }
    }

    pub const fn from_config(config: &SwingConfig) -> Self {
        Self::new(config.mid_degree, config.smoothness_weight, config.solver_max_iter)
    }

    pub const fn degree(&self) -> usize {
        self.degree
    }

    /// Build the cost matrices P (symmetric) and q.
    fn build_cost(&self, waypoints: &[FitPoint], duration: f64) -> (DMatrix<f64>, DVector<f64>) {
        let n = self.degree;
        let n_z = 3 * (n + 1);
        let mut p = DMatrix::zeros(n_z, n_z);
        let mut q = DVector::zeros(n_z);

        // Waypoint tracking: 2 B^T B and -2 B^T w per coordinate.
        for wp in waypoints {
            let basis: Vec<f64> = (0..=n).map(|i| bernstein(n, i, wp.u)).collect();
            for i in 0..=n {
                for l in 0..=n {
                    let v = 2.0 * basis[i] * basis[l];
                    for k in 0..3 {
                        p[(3 * i + k, 3 * l + k)] += v;
                    }
                }
                for k in 0..3 {
                    q[3 * i + k] -= 2.0 * basis[i] * wp.position[k];
                }
            }
        }

        if self.smoothness_weight > 0.0 {
            let energy = acceleration_energy(n, duration);
            for i in 0..=n {
                for l in 0..=n {
                    let v = 2.0 * self.smoothness_weight * energy[(i, l)];
                    for k in 0..3 {
                        p[(3 * i + k, 3 * l + k)] += v;
                    }
                }
            }
        }

        (p, q)
    }
}

impl BoundaryValueSolver for QpBoundarySolver {
    fn solve(
        &self,
        bc: &BoundaryConditions,
        waypoints: &[FitPoint],
        duration: f64,
    ) -> Result<BezierCurve, SolveFailure> {
        let n = self.degree;
        let fixed = constant_waypoints(bc, duration, n)?;
        let pinned = pinned_indices(n);

        // 1. Cost
        let (p_mat, q_vec) = self.build_cost(waypoints, duration);

        // 2. Boundary equalities
        let n_z = 3 * (n + 1);
        let n_eq = 3 * pinned.len();
        let mut a_all = DMatrix::zeros(n_eq, n_z);
        let mut b_all = DVector::zeros(n_eq);
        for (row, (i, k)) in pinned
            .iter()
            .flat_map(|&i| (0..3).map(move |k| (i, k)))
            .enumerate()
        {
            a_all[(row, 3 * i + k)] = 1.0;
            b_all[row] = fixed[i][k];
        }

        // 3. Convert to Clarabel format
        let p_csc = dmatrix_to_csc_upper_tri(&p_mat);
        let a_csc = dmatrix_to_csc(&a_all);
        let cones = vec![ZeroConeT(n_eq)];

        // 4. Solve
        let settings = DefaultSettingsBuilder::default()
            .max_iter(self.max_iter)
            .verbose(false)
            .build()
            .map_err(|e| SolveFailure::Setup(format!("{e:?}")))?;

        let q_slice: Vec<f64> = q_vec.iter().copied().collect();
        let b_slice: Vec<f64> = b_all.iter().copied().collect();

        let mut solver = DefaultSolver::new(&p_csc, &q_slice, &a_csc, &b_slice, &cones, settings)
            .map_err(|e| SolveFailure::Setup(format!("{e:?}")))?;
        solver.solve();
        let sol = &solver.solution;

        if !matches!(sol.status, SolverStatus::Solved | SolverStatus::AlmostSolved) {
            return Err(SolveFailure::NotConverged(format!("{:?}", sol.status)));
        }

        // Pinned points are copied exactly so neighbouring segments share
        // their endpoints bit for bit.
        let mut points: Vec<Vector3<f64>> = (0..=n)
            .map(|i| Vector3::new(sol.x[3 * i], sol.x[3 * i + 1], sol.x[3 * i + 2]))
            .collect();
        for &i in &pinned {
            points[i] = fixed[i];
        }

        BezierCurve::new(points, duration)
            .ok_or_else(|| SolveFailure::Setup("empty middle curve".into()))
    }
}

/// Control points fixed by the boundary conditions.
fn pinned_indices(degree: usize) -> [usize; 6] {
    debug_assert!(degree >= MIN_BOUNDARY_DEGREE);
    [0, 1, 2, degree - 2, degree - 1, degree]
}

/// Matrix `H` with `∫₀ᵀ |B''(t)|² dt = xᵀ H x` for one coordinate `x` of the
/// control points.
///
/// `B''` has control points `n(n-1)/T² · ΔΔP`, and the Gram matrix of the
/// degree-`m` Bernstein basis over `[0, 1]` is
/// `C(m,i) C(m,j) / (C(2m,i+j) (2m+1))`.
fn acceleration_energy(n: usize, duration: f64) -> DMatrix<f64> {
    let m = n - 2;
    let scale = n as f64 * (n as f64 - 1.0) / (duration * duration);

    let mut second_diff = DMatrix::zeros(m + 1, n + 1);
    for r in 0..=m {
        second_diff[(r, r)] = scale;
        second_diff[(r, r + 1)] = -2.0 * scale;
        second_diff[(r, r + 2)] = scale;
    }

    let gram = DMatrix::from_fn(m + 1, m + 1, |i, j| {
        binomial(m, i) * binomial(m, j) / (binomial(2 * m, i + j) * (2 * m + 1) as f64) * duration
    });

    second_diff.transpose() * gram * second_diff
}

/// Convert a nalgebra `DMatrix<f64>` to a Clarabel `CscMatrix<f64>` (full matrix).
fn dmatrix_to_csc(m: &DMatrix<f64>) -> CscMatrix<f64> {
    let (nrows, ncols) = m.shape();
    let mut colptr = vec![0usize; ncols + 1];
    let mut rowval = Vec::new();
    let mut nzval = Vec::new();

    for j in 0..ncols {
        for i in 0..nrows {
            let v = m[(i, j)];
            if v.abs() > 1e-15 {
                rowval.push(i);
                nzval.push(v);
            }
        }
        colptr[j + 1] = rowval.len();
    }

    CscMatrix::new(nrows, ncols, colptr, rowval, nzval)
}

/// Convert a symmetric nalgebra `DMatrix<f64>` to upper-triangular `CscMatrix<f64>`.
fn dmatrix_to_csc_upper_tri(m: &DMatrix<f64>) -> CscMatrix<f64> {
    let (nrows, ncols) = m.shape();
    let mut colptr = vec![0usize; ncols + 1];
    let mut rowval = Vec::new();
    let mut nzval = Vec::new();

    for j in 0..ncols {
        for i in 0..=j.min(nrows - 1) {
            let v = m[(i, j)];
            if v.abs() > 1e-15 {
                rowval.push(i);
                nzval.push(v);
            }
        }
        colptr[j + 1] = rowval.len();
    }

    CscMatrix::new(nrows, ncols, colptr, rowval, nzval)
}
