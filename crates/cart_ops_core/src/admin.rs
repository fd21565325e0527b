use serde::{Deserialize, Serialize};

use crate::contract::ValidationError;

pub const ADMIN_ROLE: &str = "admin";
pub const PROFILE_STATUS_APPROVED: &str = "approved";

/// Identity-service account record, as surfaced by the lookup adapter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserAccount {
    pub user_id: String,
    pub email: String,
}

/// Profile document stored alongside the identity record, keyed by user id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserProfile {
    pub user_id: String,
    pub email: String,
    pub role: String,
    pub status: String,
}

impl UserProfile {
    pub fn admin(user_id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            email: email.into(),
            role: ADMIN_ROLE.to_string(),
            status: PROFILE_STATUS_APPROVED.to_string(),
        }
    }
}

/// Credentials for the bootstrap target. Always injected from deployment
/// configuration; there is no default credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminAccountSpec {
    pub email: String,
    pub password: String,
}

impl AdminAccountSpec {
    pub fn new(
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let email = email.into().trim().to_string();
        if email.is_empty() {
            return Err(ValidationError::new("admin email cannot be empty"));
        }

        let password = password.into();
        if password.trim().is_empty() {
            return Err(ValidationError::new("admin password cannot be empty"));
        }

        Ok(Self { email, password })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapAction {
    /// No account exists yet: create it and write the admin profile.
    CreateAccount,
    /// The account exists but its profile is missing or not an admin profile:
    /// rewrite the profile, leave the account alone.
    RepairProfile { user_id: String },
    /// Account and admin profile both present. Nothing to do.
    AlreadyProvisioned { user_id: String },
}

/// Decides what the bootstrap handler must do, given what the identity
/// service and profile store currently hold. Pure so it can be exercised
/// without fakes.
pub fn plan_bootstrap(
    existing_account: Option<&UserAccount>,
    existing_profile: Option<&UserProfile>,
) -> BootstrapAction {
    let Some(account) = existing_account else {
        return BootstrapAction::CreateAccount;
    };

    match existing_profile {
        Some(profile) if profile.role == ADMIN_ROLE => BootstrapAction::AlreadyProvisioned {
            user_id: account.user_id.clone(),
        },
        _ => BootstrapAction::RepairProfile {
            user_id: account.user_id.clone(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account() -> UserAccount {
        UserAccount {
            user_id: "user-1".to_string(),
            email: "ops@example.com".to_string(),
        }
    }

    #[test]
    fn missing_account_plans_creation() {
        assert_eq!(plan_bootstrap(None, None), BootstrapAction::CreateAccount);
    }

    #[test]
    fn account_without_profile_plans_repair() {
        let action = plan_bootstrap(Some(&account()), None);
        assert_eq!(
            action,
            BootstrapAction::RepairProfile {
                user_id: "user-1".to_string()
            }
        );
    }

    #[test]
    fn account_with_non_admin_profile_plans_repair() {
        let mut profile = UserProfile::admin("user-1", "ops@example.com");
        profile.role = "viewer".to_string();

        let action = plan_bootstrap(Some(&account()), Some(&profile));
        assert_eq!(
            action,
            BootstrapAction::RepairProfile {
                user_id: "user-1".to_string()
            }
        );
    }

    #[test]
    fn provisioned_account_plans_no_writes() {
        let profile = UserProfile::admin("user-1", "ops@example.com");

        let action = plan_bootstrap(Some(&account()), Some(&profile));
        assert_eq!(
            action,
            BootstrapAction::AlreadyProvisioned {
                user_id: "user-1".to_string()
            }
        );
    }

    #[test]
    fn account_spec_rejects_blank_credentials() {
        let error = AdminAccountSpec::new("  ", "secret").expect_err("blank email should fail");
        assert_eq!(error.message(), "admin email cannot be empty");

        let error =
            AdminAccountSpec::new("ops@example.com", " ").expect_err("blank password should fail");
        assert_eq!(error.message(), "admin password cannot be empty");
    }

    #[test]
    fn account_spec_trims_email() {
        let spec = AdminAccountSpec::new(" ops@example.com ", "secret").expect("spec should pass");
        assert_eq!(spec.email, "ops@example.com");
    }
}
