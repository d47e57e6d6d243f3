pub mod auth;
pub mod response;

pub use auth::{require_access, AccessGate};
pub use response::{ApiResponse, ApiResult};
