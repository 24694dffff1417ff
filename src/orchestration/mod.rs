pub mod engine;
pub mod error;
pub mod response;
pub mod routing;
pub mod service;
pub mod state;

pub use engine::Orchestrator;
pub use error::{ErrorCode, RouteNotFound, ServiceError, TaskFailure};
pub use response::TaskResponse;
pub use routing::TaskRouter;
pub use service::AgentService;
pub use state::{AgentState, Stage};
