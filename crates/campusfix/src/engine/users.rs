//! Identity lookup, registration, and hostel change requests

use super::*;
use crate::domain::{ProfileUpdate, Role};

impl<S: IssueStore> LifecycleEngine<S> {
    /// Store a user record.
    ///
    /// Credentials are issued elsewhere; this only seeds the directory the
    /// engine resolves callers against.
    pub fn register_user(&self, user: User) -> Result<User, LifecycleError> {
        if user.full_name.trim().is_empty() {
            return Err(LifecycleError::Validation("full_name is required".to_string()));
        }
        self.storage.save_user(&user)?;
        tracing::info!(user = %user.id, role = ?user.role, "user registered");
        Ok(user)
    }

    /// Resolve a caller identity to a user.
    pub fn resolve_caller(&self, user_id: &str) -> Result<User, LifecycleError> {
        let user_id = user_id.trim();
        if user_id.is_empty() {
            return Err(LifecycleError::Unauthenticated);
        }
        self.storage
            .load_user(user_id)?
            .ok_or(LifecycleError::Unauthenticated)
    }

    /// Edit the caller's own profile.
    ///
    /// Only fields present in `update` change. The hostel set here decides
    /// which hostel's issues a student sees.
    pub fn update_profile(&self, caller: &User, update: ProfileUpdate) -> Result<User, LifecycleError> {
        if update.full_name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(LifecycleError::Validation("full_name must not be blank".to_string()));
        }

        let mut user = self
            .storage
            .load_user(&caller.id)?
            .ok_or(LifecycleError::Unauthenticated)?;
        if update.is_empty() {
            return Ok(user);
        }

        update.apply_to(&mut user);
        self.storage.save_user(&user)?;
        tracing::info!(user = %user.id, hostel = ?user.hostel, "profile updated");
        Ok(user)
    }

    /// Record the hostel `caller` wants to move to, replacing any earlier request.
    pub fn request_hostel_change(&self, caller: &User, hostel: &str) -> Result<User, LifecycleError> {
        let hostel = hostel.trim();
        if hostel.is_empty() {
            return Err(LifecycleError::Validation("new_hostel is required".to_string()));
        }

        let mut user = self
            .storage
            .load_user(&caller.id)?
            .ok_or(LifecycleError::Unauthenticated)?;
        user.requested_hostel = Some(hostel.to_string());
        self.storage.save_user(&user)?;
        tracing::info!(user = %user.id, hostel, "hostel change requested");
        Ok(user)
    }

    /// Approve or reject a student's pending hostel request. Staff only.
    pub fn resolve_hostel_request(
        &self,
        staff: &User,
        student_id: &str,
        approve: bool,
    ) -> Result<User, LifecycleError> {
        require_staff(staff)?;

        let mut student = self
            .storage
            .load_user(student_id)?
            .ok_or_else(|| LifecycleError::NotFound(format!("user {}", student_id)))?;
        let requested = student.requested_hostel.take().ok_or_else(|| {
            LifecycleError::InvalidState(format!("{} has no pending hostel request", student.full_name))
        })?;

        if approve {
            student.hostel = Some(requested);
        }
        self.storage.save_user(&student)?;
        tracing::info!(user = %student.id, approve, by = %staff.id, "hostel request resolved");
        Ok(student)
    }

    /// Every registered user, sorted by name.
    pub fn list_users(&self) -> Result<Vec<User>, LifecycleError> {
        let mut users = self.storage.list_users()?;
        users.sort_by(|a, b| a.full_name.cmp(&b.full_name));
        Ok(users)
    }

    /// Every student, for the staff directory.
    pub fn list_students(&self, caller: &User) -> Result<Vec<User>, LifecycleError> {
        require_staff(caller)?;
        Ok(self
            .storage
            .list_users()?
            .into_iter()
            .filter(|u| u.role == Role::Student)
            .collect())
    }
}

fn require_staff(caller: &User) -> Result<(), LifecycleError> {
    if caller.role.is_staff() {
        Ok(())
    } else {
        Err(LifecycleError::Forbidden("staff only".to_string()))
    }
}
