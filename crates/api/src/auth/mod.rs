pub mod jwt;
pub mod password;
pub mod permissions;

pub use jwt::{Claims, JwtService};
pub use permissions::{current_user, require_admin, require_role, require_team_access, AuthUser};
