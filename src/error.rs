use thiserror::Error;

/// Structural problems with a route, detected when the path is built.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RouteError {
    #[error("route has no stages")]
    NoStages,

    #[error("stage {id} ('{name}') has zero length")]
    DegenerateStage { id: u32, name: String },

    #[error("duplicate stage id {0}")]
    DuplicateStage(u32),

    #[error("route produced no waypoints")]
    EmptyPath,
}
