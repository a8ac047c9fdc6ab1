//! Ports the pipeline talks through
//!
//! The document store and the rendering host are external collaborators.
//! They are reached through the [`ConnectionPort`] and [`ViewportBridge`]
//! traits, injected into the pipeline so tests can swap in doubles.

mod connection;
mod viewport;

pub use connection::{
    ConnectOutcome, ConnectionPort, FetchRequest, SessionId, LEVEL_KEY_FIELD, MAX_SESSIONS,
    POSITION_FIELD, SESSION_COLLECTION, SESSION_ID_FIELD,
};
pub use viewport::{
    DispatchAck, ScalarRange, ViewportBridge, ViewportCommand, ViewportError, EMPTY_LEVEL,
};

/// Outcome of a single backend call.
///
/// Keeps "nothing there" apart from "the call failed".
#[derive(Debug, Clone, PartialEq)]
pub enum PortResult<T> {
    Ok(T),
    Empty,
    Failed(String),
}

impl<T> PortResult<T> {
    pub fn is_ok(&self) -> bool {
        matches!(self, PortResult::Ok(_))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, PortResult::Empty)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, PortResult::Failed(_))
    }
}

impl<T> PortResult<Vec<T>> {
    /// `Empty` for an empty list
    pub fn from_vec(values: Vec<T>) -> Self {
        if values.is_empty() {
            PortResult::Empty
        } else {
            PortResult::Ok(values)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_list_is_not_a_failure() {
        let empty: PortResult<Vec<u8>> = PortResult::from_vec(Vec::new());
        assert!(empty.is_empty());
        assert!(!empty.is_failed());

        let listed = PortResult::from_vec(vec![1u8]);
        assert_eq!(listed, PortResult::Ok(vec![1]));
        assert!(listed.is_ok());
    }
}
