use crate::domain::model::{MentorScope, Principal, Role};
use crate::utils::error::{DashboardError, Result};

/// Decides which cohort a caller may aggregate over.
///
/// Admins see everything (`None`). Mentors are limited to the users assigned
/// to them by name. Any other role is refused.
pub fn resolve_scope(principal: &Principal) -> Result<Option<MentorScope>> {
    match &principal.role {
        Role::Admin => Ok(None),
        Role::Mentor => {
            if principal.name.trim().is_empty() {
                return Err(DashboardError::Forbidden {
                    message: "mentor account has no name to scope by".to_string(),
                });
            }
            Ok(Some(MentorScope::new(principal.name.clone())))
        }
        Role::Other(role) => Err(DashboardError::Forbidden {
            message: format!("unknown role '{}'", role),
        }),
    }
}
