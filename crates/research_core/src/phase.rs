use std::fmt;

/// Lifecycle phase of a research job, in forward order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Phase {
    #[default]
    NotStarted,
    Scanning,
    Analyzing,
    Documenting,
    Complete,
}

/// Nominal progress interval of a phase, in percent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressInterval {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown research phase {0:?}")]
pub struct UnknownPhase(pub String);

impl Phase {
    pub const ALL: [Phase; 5] = [
        Phase::NotStarted,
        Phase::Scanning,
        Phase::Analyzing,
        Phase::Documenting,
        Phase::Complete,
    ];

    pub fn interval(self) -> ProgressInterval {
        let (min, max) = match self {
            Phase::NotStarted => (0.0, 5.0),
            Phase::Scanning => (5.0, 25.0),
            Phase::Analyzing => (25.0, 75.0),
            Phase::Documenting => (75.0, 95.0),
            Phase::Complete => (100.0, 100.0),
        };
        ProgressInterval { min, max }
    }

    /// Total order index; equal to the ordering of `interval().min`.
    pub fn rank(self) -> u8 {
        self as u8
    }

    pub fn label(self) -> &'static str {
        match self {
            Phase::NotStarted => "Not started",
            Phase::Scanning => "Scanning files",
            Phase::Analyzing => "Analyzing patterns",
            Phase::Documenting => "Generating documentation",
            Phase::Complete => "Complete",
        }
    }

    /// Parses the executor's wire value. A missing phase means the job has not started.
    pub fn from_wire(raw: Option<&str>) -> Result<Phase, UnknownPhase> {
        match raw.map(str::trim) {
            None | Some("") | Some("not_started") => Ok(Phase::NotStarted),
            Some("scanning") => Ok(Phase::Scanning),
            Some("analyzing") => Ok(Phase::Analyzing),
            Some("documenting") => Ok(Phase::Documenting),
            Some("complete") => Ok(Phase::Complete),
            Some(other) => Err(UnknownPhase(other.to_string())),
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
