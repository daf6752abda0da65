pub mod claims;
pub mod jwt;
pub mod middleware;
pub mod policy;
pub mod utils;

pub use claims::Claims;
pub use jwt::JwtService;
pub use middleware::{bearer_claims, AuthenticatedUser};
pub use policy::{AccessPolicy, ReadScope};
pub use utils::{extract_actor_from_context, extract_claims_from_context};
