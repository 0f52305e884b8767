//! Operator session context
//!
//! The authenticated operator identity that must accompany every detection and
//! registration call. Handed explicitly to the detection loop at construction
//! so the loop never reaches into ambient/global state for it.

/// Operator session
#[derive(Debug, Clone)]
pub struct OperatorSession {
    operator_id: String,
}

impl OperatorSession {
    /// Create a session for an operator identity
    pub fn new(operator_id: impl Into<String>) -> Self {
        Self {
            operator_id: operator_id.into(),
        }
    }

    /// Operator identity to attach to outgoing requests
    pub fn operator_id(&self) -> &str {
        &self.operator_id
    }

    /// Whether a usable identity is present
    pub fn is_authenticated(&self) -> bool {
        !self.operator_id.trim().is_empty()
    }
}
