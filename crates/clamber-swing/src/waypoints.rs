//! Effector waypoints sampled along a reference path, and the line/planar
//! heuristics that reduce them to a small clearance-raising set.

use clamber_core::{Kinematics, PlanError, ReferencePath, SwingConfig};
use nalgebra::Vector3;

/// Sampled effector positions, each tagged with its sample index.
///
/// Indices survive reduction, so a reduced sequence still knows where along
/// the reference path each point was taken.
#[derive(Debug, Clone, PartialEq)]
pub struct WaypointSequence {
    effector: String,
    /// Total number of samples originally drawn.
    sample_count: usize,
    points: Vec<(usize, Vector3<f64>)>,
}

/// Shape detected by [`classify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaypointShape {
    /// All samples on the segment from first to last.
    Line,
    /// Not a line, but the height stays within the planar tolerance.
    Planar,
    Raw,
}

impl WaypointSequence {
    /// Sequence of `positions` indexed `0..len`.
    pub fn new(effector: impl Into<String>, positions: Vec<Vector3<f64>>) -> Self {
        let sample_count = positions.len();
        Self {
            effector: effector.into(),
            sample_count,
            points: positions.into_iter().enumerate().collect(),
        }
    }

    pub fn effector(&self) -> &str {
        &self.effector
    }

    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[(usize, Vector3<f64>)] {
        &self.points
    }

    pub fn positions(&self) -> impl Iterator<Item = &Vector3<f64>> {
        self.points.iter().map(|(_, p)| p)
    }

    pub fn first(&self) -> Option<&Vector3<f64>> {
        self.points.first().map(|(_, p)| p)
    }

    pub fn last(&self) -> Option<&Vector3<f64>> {
        self.points.last().map(|(_, p)| p)
    }

    /// Fraction of the sampled time range at which `index` was drawn.
    pub fn time_fraction(&self, index: usize) -> f64 {
        if self.sample_count < 2 {
            0.0
        } else {
            index as f64 / (self.sample_count - 1) as f64
        }
    }

    fn with_points(&self, points: Vec<(usize, Vector3<f64>)>) -> Self {
        Self {
            effector: self.effector.clone(),
            sample_count: self.sample_count,
            points,
        }
    }
}

/// Sample `effector` along `path`: `config.odd_waypoint_count()` positions
/// evenly spaced in time, first at the path start and last at its end.
pub fn sample_waypoints<K, R>(
    kinematics: &K,
    effector: &str,
    path: &R,
    config: &SwingConfig,
) -> Result<WaypointSequence, PlanError>
where
    K: Kinematics + ?Sized,
    R: ReferencePath + ?Sized,
{
    let count = config.odd_waypoint_count();
    let (start, end) = path.time_range();
    let step = (end - start) / (count - 1) as f64;
    let positions = (0..count)
        .map(|i| {
            let t = if i + 1 == count { end } else { start + step * i as f64 };
            kinematics.position_of(effector, &path.sample(t))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(WaypointSequence::new(effector, positions))
}

/// Whether every sample lies on the segment from the first to the last.
///
/// A sample counts as collinear when its direction from the first sample has
/// cosine at least `1 - tolerance` with the chord. A sample coinciding with
/// the first one has no direction and is not collinear.
pub fn is_line(seq: &WaypointSequence, tolerance: f64) -> Result<bool, PlanError> {
    let (Some(first), Some(last)) = (seq.first(), seq.last()) else {
        return Err(PlanError::InvalidPath(format!(
            "no waypoints sampled for effector {}",
            seq.effector
        )));
    };
    let chord = last - first;
    let length = chord.norm();
    if length <= f64::EPSILON {
        return Err(PlanError::DegenerateWaypoints {
            effector: seq.effector.clone(),
            start: (*first).into(),
            end: (*last).into(),
        });
    }
    let direction = chord / length;

    let interior = &seq.points[1..seq.len() - 1];
    Ok(interior.iter().all(|(_, p)| {
        let offset = p - first;
        let norm = offset.norm();
        norm > f64::EPSILON && offset.dot(&direction) / norm >= 1.0 - tolerance
    }))
}

/// Whether the height of every sample stays within `tolerance` of the
/// first sample's height.
pub fn is_planar(seq: &WaypointSequence, tolerance: f64) -> bool {
    let Some(first) = seq.first() else {
        return true;
    };
    let spread = seq
        .positions()
        .map(|p| (p.z - first.z).abs())
        .fold(0.0, f64::max);
    spread < tolerance
}

/// Line first, then planar, else raw.
pub fn classify(seq: &WaypointSequence, config: &SwingConfig) -> Result<WaypointShape, PlanError> {
    if is_line(seq, config.line_tolerance)? {
        Ok(WaypointShape::Line)
    } else if is_planar(seq, config.planar_tolerance) {
        Ok(WaypointShape::Planar)
    } else {
        Ok(WaypointShape::Raw)
    }
}

/// Replace the samples of a line or planar sweep with a profile that lifts
/// the effector clear of the surface.
///
/// * `Line`: three points, the chord midpoint raised by the apex height
///   between the unchanged ends.
/// * `Planar`: every sample raised by a triangular profile peaking at the
///   middle sample. Ends and horizontal coordinates unchanged.
/// * `Raw`, or travel at or below `config.min_travel`: unchanged.
#[must_use]
pub fn reduce_to_apex(
    seq: &WaypointSequence,
    shape: WaypointShape,
    travel: f64,
    config: &SwingConfig,
) -> WaypointSequence {
    let n = seq.len();
    if travel <= config.min_travel || n < 3 {
        return seq.clone();
    }
    let apex = config.apex_height(travel, n);
    match shape {
        WaypointShape::Line => {
            let (first_index, first) = seq.points[0];
            let (last_index, last) = seq.points[n - 1];
            let mut middle = (first + last) / 2.0;
            middle.z += apex;
            seq.with_points(vec![
                (first_index, first),
                (seq.points[n / 2].0, middle),
                (last_index, last),
            ])
        }
        WaypointShape::Planar => {
            let increment = apex / (n / 2) as f64;
            let points = seq
                .points
                .iter()
                .enumerate()
                .map(|(i, &(index, mut p))| {
                    p.z += i.min(n - 1 - i) as f64 * increment;
                    (index, p)
                })
                .collect();
            seq.with_points(points)
        }
        WaypointShape::Raw => seq.clone(),
    }
}

/// Classify `seq` and apply [`reduce_to_apex`].
pub fn classify_and_reduce(
    seq: &WaypointSequence,
    travel: f64,
    config: &SwingConfig,
) -> Result<(WaypointSequence, WaypointShape), PlanError> {
    let shape = classify(seq, config)?;
    let reduced = reduce_to_apex(seq, shape, travel, config);
    log::debug!(
        "Waypoints for {}: {shape:?}, {} -> {} points",
        seq.effector,
        seq.len(),
        reduced.len()
    );
    Ok((reduced, shape))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use clamber_core::ConfigPath;
    use clamber_test_utils::PointFootModel;

    fn straight(n: usize, length: f64) -> WaypointSequence {
        let positions = (0..n)
            .map(|i| Vector3::new(length * i as f64 / (n - 1) as f64, 0.0, 0.0))
            .collect();
        WaypointSequence::new("foot", positions)
    }

    fn ramp(model: &PointFootModel, from: Vector3<f64>, to: Vector3<f64>) -> ConfigPath {
        let configurations = vec![model.configuration(&[from]), model.configuration(&[to])];
        ConfigPath::uniform(1.0, 3.0, configurations).unwrap()
    }

    #[test]
    fn samples_span_the_path_evenly() {
        let model = PointFootModel::new(["foot"]);
        let (from, to) = (Vector3::zeros(), Vector3::new(0.3, 0.0, 0.6));
        let path = ramp(&model, from, to);

        let seq = sample_waypoints(&model, "foot", &path, &SwingConfig::default()).unwrap();
        assert_eq!(seq.len(), 31);
        assert_eq!(seq.sample_count(), 31);
        assert_eq!(seq.first(), Some(&from));
        assert_eq!(seq.last(), Some(&to));
        let step = (to - from) / 30.0;
        for (i, pair) in seq.points().windows(2).enumerate() {
            assert_eq!(pair[0].0, i);
            assert_relative_eq!(pair[1].1 - pair[0].1, step, epsilon = 1e-12);
        }
    }

    #[test]
    fn even_waypoint_count_is_rounded_up() {
        let model = PointFootModel::new(["foot"]);
        let to = Vector3::new(0.4, 0.0, 0.0);
        let path = ramp(&model, Vector3::zeros(), to);
        let config = SwingConfig {
            waypoint_count: 4,
            ..SwingConfig::default()
        };

        let seq = sample_waypoints(&model, "foot", &path, &config).unwrap();
        let xs: Vec<_> = seq.positions().map(|p| p.x).collect();
        assert_eq!(xs.len(), 5);
        for (x, expected) in xs.iter().zip([0.0, 0.1, 0.2, 0.3, 0.4]) {
            assert_relative_eq!(*x, expected, epsilon = 1e-12);
        }
        assert!(sample_waypoints(&model, "hand", &path, &config).is_err());
    }

    #[test]
    fn straight_samples_are_a_line() {
        let seq = straight(31, 0.15);
        assert!(is_line(&seq, SwingConfig::default().line_tolerance).unwrap());
    }

    #[test]
    fn perturbed_sample_breaks_line() {
        let mut positions: Vec<_> = straight(31, 0.15).positions().copied().collect();
        positions[10].y += 0.01;
        let seq = WaypointSequence::new("foot", positions);
        assert!(!is_line(&seq, SwingConfig::default().line_tolerance).unwrap());
        assert!(is_planar(&seq, 0.02));
    }

    #[test]
    fn sample_at_start_is_not_a_line() {
        let seq = WaypointSequence::new(
            "foot",
            vec![Vector3::zeros(), Vector3::zeros(), Vector3::new(0.0, 0.1, 0.0)],
        );
        assert!(!is_line(&seq, 1e-12).unwrap());
        assert_eq!(classify(&seq, &SwingConfig::default()).unwrap(), WaypointShape::Planar);
    }

    #[test]
    fn backtracking_sample_is_not_on_line() {
        let seq = WaypointSequence::new(
            "foot",
            vec![
                Vector3::zeros(),
                Vector3::new(-0.05, 0.0, 0.0),
                Vector3::new(0.1, 0.0, 0.0),
            ],
        );
        assert!(!is_line(&seq, 1e-6).unwrap());
    }

    #[test]
    fn zero_chord_is_degenerate() {
        let seq = WaypointSequence::new("lf_foot", vec![Vector3::new(1.0, 2.0, 0.0); 5]);
        let err = is_line(&seq, 1e-6).unwrap_err();
        match err {
            PlanError::DegenerateWaypoints { effector, start, end } => {
                assert_eq!(effector, "lf_foot");
                assert_eq!(start, [1.0, 2.0, 0.0]);
                assert_eq!(end, [1.0, 2.0, 0.0]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(matches!(
            is_line(&WaypointSequence::new("x", vec![]), 1e-6),
            Err(PlanError::InvalidPath(_))
        ));
    }

    #[test]
    fn planar_tolerance_is_strict() {
        let seq = WaypointSequence::new(
            "foot",
            vec![
                Vector3::zeros(),
                Vector3::new(0.1, 0.1, 0.01),
                Vector3::new(0.2, 0.0, 0.0),
            ],
        );
        assert!(is_planar(&seq, 0.02));
        assert!(!is_planar(&seq, 0.01));
    }

    #[test]
    fn line_reduces_to_three_points() {
        let config = SwingConfig::default();
        let seq = straight(31, 0.15);
        let (reduced, shape) = classify_and_reduce(&seq, 0.15, &config).unwrap();
        assert_eq!(shape, WaypointShape::Line);
        assert_eq!(reduced.len(), 3);

        let indices: Vec<_> = reduced.points().iter().map(|(i, _)| *i).collect();
        assert_eq!(indices, [0, 15, 30]);

        let apex = reduced.points()[1].1;
        assert_relative_eq!(apex.x, 0.075, epsilon = 1e-12);
        assert!(apex.z >= config.apex_height_min && apex.z <= config.apex_height_max);
        assert_relative_eq!(apex.z, 0.07, epsilon = 1e-12);
        assert_eq!(reduced.first(), seq.first());
        assert_eq!(reduced.last(), seq.last());
    }

    #[test]
    fn short_line_uses_short_apex() {
        let config = SwingConfig::default();
        let seq = straight(31, 0.05);
        let (reduced, _) = classify_and_reduce(&seq, 0.05, &config).unwrap();
        assert_relative_eq!(reduced.points()[1].1.z, 0.03, epsilon = 1e-12);
    }

    #[test]
    fn planar_gets_triangular_profile() {
        let config = SwingConfig::default();
        let positions: Vec<_> = (0..5_i32)
            .map(|i| {
                let x = 0.05 * f64::from(i);
                Vector3::new(x, 0.02 * (x * 20.0).sin(), 0.0)
            })
            .collect();
        let seq = WaypointSequence::new("hand", positions.clone());
        let (reduced, shape) = classify_and_reduce(&seq, 0.2, &config).unwrap();
        assert_eq!(shape, WaypointShape::Planar);
        assert_eq!(reduced.len(), 5);

        // 5 samples over 0.2 travel: apex = clamp(0.05, 0.02, 0.07).
        let heights: Vec<_> = reduced.positions().map(|p| p.z).collect();
        for (h, expected) in heights.iter().zip([0.0, 0.025, 0.05, 0.025, 0.0]) {
            assert_relative_eq!(*h, expected, epsilon = 1e-12);
        }
        for (p, q) in reduced.positions().zip(&positions) {
            assert_relative_eq!(p.x, q.x);
            assert_relative_eq!(p.y, q.y);
        }
    }

    #[test]
    fn raw_and_negligible_travel_are_untouched() {
        let config = SwingConfig::default();
        let seq = WaypointSequence::new(
            "hand",
            vec![
                Vector3::zeros(),
                Vector3::new(0.1, 0.1, 0.2),
                Vector3::new(0.2, 0.0, 0.0),
            ],
        );
        let (reduced, shape) = classify_and_reduce(&seq, 0.2, &config).unwrap();
        assert_eq!(shape, WaypointShape::Raw);
        assert_eq!(reduced, seq);

        let line = straight(31, 0.02);
        assert_eq!(reduce_to_apex(&line, WaypointShape::Line, 0.02, &config), line);
    }

    #[test]
    fn time_fraction_uses_original_count() {
        let config = SwingConfig::default();
        let (reduced, _) = classify_and_reduce(&straight(31, 0.15), 0.15, &config).unwrap();
        assert_eq!(reduced.sample_count(), 31);
        assert_relative_eq!(reduced.time_fraction(reduced.points()[1].0), 0.5);
    }
}
