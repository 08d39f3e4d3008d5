use serde::Serialize;

/// State of one asynchronous remote fetch
#[derive(Debug, Clone, PartialEq)]
pub enum Resource<T> {
    Loading,
    Failed(String),
    Ready(T),
}

/// Serializable tag of a [`Resource`], for observers that only need the phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceStatus {
    Loading,
    Failed,
    Ready,
}

impl<T> Default for Resource<T> {
    fn default() -> Self {
        Resource::Loading
    }
}

impl<T> Resource<T> {
    /// The resolved value, if any. Pending and failed fetches both yield `None`.
    pub fn ready(&self) -> Option<&T> {
        match self {
            Resource::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn ready_mut(&mut self) -> Option<&mut T> {
        match self {
            Resource::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn status(&self) -> ResourceStatus {
        match self {
            Resource::Loading => ResourceStatus::Loading,
            Resource::Failed(_) => ResourceStatus::Failed,
            Resource::Ready(_) => ResourceStatus::Ready,
        }
    }
}

impl<T, E: std::fmt::Display> From<Result<T, E>> for Resource<T> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Resource::Ready(value),
            Err(e) => Resource::Failed(e.to_string()),
        }
    }
}
