use crate::Phase;

/// Reference constants for the progress heuristic.
///
/// The executor cannot report a true percentage because the total amount of
/// work is unknown up front; these values shape a smoothly increasing
/// indicator instead.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EstimatorConfig {
    /// File count treated as a full scan.
    pub scan_norm: u32,
    /// Finding count treated as a full analysis.
    pub findings_norm: u32,
    /// Percentage shown for the whole documenting phase.
    pub documenting_fixed_point: f64,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            scan_norm: 50,
            findings_norm: 25,
            documenting_fixed_point: 85.0,
        }
    }
}

/// Estimated completion percentage in `[0, 100]` for the given phase and counters.
pub fn estimate(
    config: &EstimatorConfig,
    phase: Phase,
    files_scanned: u64,
    findings_count: u64,
) -> f64 {
    let interval = phase.interval();
    let within = |count: u64, norm: u32| {
        interval.min + (interval.max - interval.min) * fraction(count, norm)
    };

    let raw = match phase {
        Phase::NotStarted => interval.max,
        Phase::Scanning => within(files_scanned, config.scan_norm),
        Phase::Analyzing => within(findings_count, config.findings_norm),
        Phase::Documenting => config.documenting_fixed_point,
        Phase::Complete => 100.0,
    };
    if raw.is_finite() {
        raw.clamp(0.0, 100.0)
    } else {
        interval.min
    }
}

fn fraction(count: u64, norm: u32) -> f64 {
    if norm == 0 {
        return 1.0;
    }
    (count as f64 / f64::from(norm)).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn est(phase: Phase, files: u64, findings: u64) -> f64 {
        estimate(&EstimatorConfig::default(), phase, files, findings)
    }

    #[test]
    fn scanning_boundaries() {
        assert_eq!(est(Phase::Scanning, 0, 0), 5.0);
        assert_eq!(est(Phase::Scanning, 25, 0), 15.0);
        assert_eq!(est(Phase::Scanning, 50, 0), 25.0);
        assert_eq!(est(Phase::Scanning, 500, 0), 25.0);
    }

    #[test]
    fn analyzing_uses_findings_only() {
        assert_eq!(est(Phase::Analyzing, 999, 0), 25.0);
        assert_eq!(est(Phase::Analyzing, 0, 5), 35.0);
        assert_eq!(est(Phase::Analyzing, 0, 100), 75.0);
    }

    #[test]
    fn fixed_points() {
        assert_eq!(est(Phase::NotStarted, 10, 10), 5.0);
        assert_eq!(est(Phase::Documenting, 10, 10), 85.0);
        assert_eq!(est(Phase::Complete, 0, 0), 100.0);
    }

    #[test]
    fn constants_are_configuration() {
        let config = EstimatorConfig {
            scan_norm: 10,
            findings_norm: 0,
            documenting_fixed_point: 90.0,
        };
        assert_eq!(estimate(&config, Phase::Scanning, 5, 0), 15.0);
        assert_eq!(estimate(&config, Phase::Analyzing, 0, 0), 75.0);
        assert_eq!(estimate(&config, Phase::Documenting, 0, 0), 90.0);
    }

    #[test]
    fn out_of_range_fixed_point_is_clamped() {
        let config = EstimatorConfig {
            documenting_fixed_point: 140.0,
            ..EstimatorConfig::default()
        };
        assert_eq!(estimate(&config, Phase::Documenting, 0, 0), 100.0);
    }
}
