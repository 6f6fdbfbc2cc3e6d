pub mod auth;
pub mod rate_limit;

pub use auth::{customer_auth_middleware, admin_auth_middleware, CustomerClaims, AdminClaims};
pub use rate_limit::rate_limit_middleware;
