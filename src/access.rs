use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Authenticated caller with the role bits the rules need.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Uuid,
    pub is_admin: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ReadMatch,
    CreateMatch,
    UpdateMatch,
    DeleteMatch,
    ReadPrediction,
    CreatePrediction,
    UpdatePrediction,
    DeletePrediction,
}

/// What the action is aimed at. Prediction actions carry the owner's id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    None,
    Owner(Uuid),
}

/// Decides whether `identity` may perform `action` on `target`.
///
/// Match mutations need an admin. Touching someone else's prediction is
/// reported as `NotFound` so the caller cannot learn that it exists.
pub fn authorize(identity: &Identity, action: Action, target: Target) -> AppResult<()> {
    match action {
        Action::ReadMatch | Action::CreatePrediction => Ok(()),
        Action::CreateMatch | Action::UpdateMatch | Action::DeleteMatch => {
            if identity.is_admin {
                Ok(())
            } else {
                Err(AppError::Forbidden("Admin privileges required".into()))
            }
        }
        Action::ReadPrediction | Action::UpdatePrediction | Action::DeletePrediction => {
            match target {
                Target::Owner(owner) if owner == identity.user_id => Ok(()),
                _ => Err(AppError::not_found("Prediction not found")),
            }
        }
    }
}
