use std::fmt;

/// Failures surfaced by world operations
#[derive(Debug, Clone, PartialEq)]
pub enum WorldError {
    AgentNotFound(String),
    HazardNotFound(String),
    AlreadyExists { kind: &'static str, id: String },
    OutOfRange { distance: f64, max: f64 },
    Validation(String),
    UpstreamUnavailable(String),
    InternalInconsistency(String),
}

impl WorldError {
    /// Stable machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            WorldError::AgentNotFound(_) => "agent_not_found",
            WorldError::HazardNotFound(_) => "hazard_not_found",
            WorldError::AlreadyExists { .. } => "already_exists",
            WorldError::OutOfRange { .. } => "out_of_range",
            WorldError::Validation(_) => "validation_error",
            WorldError::UpstreamUnavailable(_) => "upstream_unavailable",
            WorldError::InternalInconsistency(_) => "internal_inconsistency",
        }
    }
}

impl fmt::Display for WorldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorldError::AgentNotFound(id) => write!(f, "agent '{}' not found", id),
            WorldError::HazardNotFound(id) => write!(f, "hazard '{}' not found", id),
            WorldError::AlreadyExists { kind, id } => {
                write!(f, "{} '{}' already exists", kind, id)
            }
            WorldError::OutOfRange { distance, max } => {
                write!(f, "target is {:.1}m away, maximum is {:.1}m", distance, max)
            }
            WorldError::Validation(msg) => write!(f, "invalid request: {}", msg),
            WorldError::UpstreamUnavailable(msg) => write!(f, "upstream unavailable: {}", msg),
            WorldError::InternalInconsistency(msg) => {
                write!(f, "internal inconsistency: {}", msg)
            }
        }
    }
}

impl std::error::Error for WorldError {}
