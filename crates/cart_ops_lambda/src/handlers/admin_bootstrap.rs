use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use cart_ops_core::admin::{plan_bootstrap, AdminAccountSpec, BootstrapAction, UserProfile};

use crate::adapters::identity::IdentityStore;
use crate::adapters::profile_store::ProfileStore;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiGatewayResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub headers: Value,
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BootstrapResponse {
    pub message: String,
    pub user_id: String,
}

/// Idempotent ensure-admin operation behind the HTTP trigger. The request
/// carries no payload; the target account comes from deployment
/// configuration, injected by the bin.
pub fn handle_bootstrap_request(
    spec: Option<&AdminAccountSpec>,
    identity: &dyn IdentityStore,
    profiles: &dyn ProfileStore,
) -> ApiGatewayResponse {
    let Some(spec) = spec else {
        return error_response(
            500,
            json!({
                "error": "misconfiguration",
                "message": "ADMIN_EMAIL and ADMIN_PASSWORD must be configured",
            }),
        );
    };

    let existing_account = match identity.find_account(&spec.email) {
        Ok(value) => value,
        Err(error) => {
            return identity_error_response("account lookup failed", &error);
        }
    };

    let existing_profile = match &existing_account {
        Some(account) => match profiles.load_profile(&account.user_id) {
            Ok(value) => value,
            Err(error) => {
                return identity_error_response("profile lookup failed", &error);
            }
        },
        None => None,
    };

    match plan_bootstrap(existing_account.as_ref(), existing_profile.as_ref()) {
        BootstrapAction::CreateAccount => {
            let account = match identity.create_account(&spec.email, &spec.password) {
                Ok(value) => value,
                Err(error) => {
                    return identity_error_response("account creation failed", &error);
                }
            };

            let profile = UserProfile::admin(account.user_id.clone(), account.email.clone());
            if let Err(error) = profiles.save_profile(&profile) {
                return identity_error_response("profile write failed", &error);
            }

            log_bootstrap_info(
                "admin_account_created",
                json!({ "user_id": account.user_id.clone() }),
            );
            success_response(
                200,
                BootstrapResponse {
                    message: "admin account created".to_string(),
                    user_id: account.user_id,
                },
            )
        }
        BootstrapAction::RepairProfile { user_id } => {
            let profile = UserProfile::admin(user_id.clone(), spec.email.clone());
            if let Err(error) = profiles.save_profile(&profile) {
                return identity_error_response("profile write failed", &error);
            }

            log_bootstrap_info("admin_profile_repaired", json!({ "user_id": user_id.clone() }));
            success_response(
                200,
                BootstrapResponse {
                    message: "admin account already exists; profile repaired".to_string(),
                    user_id,
                },
            )
        }
        BootstrapAction::AlreadyProvisioned { user_id } => {
            log_bootstrap_info(
                "admin_already_provisioned",
                json!({ "user_id": user_id.clone() }),
            );
            success_response(
                200,
                BootstrapResponse {
                    message: "admin account already provisioned".to_string(),
                    user_id,
                },
            )
        }
    }
}

fn identity_error_response(context: &str, error: &str) -> ApiGatewayResponse {
    log_bootstrap_error(
        "bootstrap_failed",
        json!({
            "context": context,
            "error": error,
        }),
    );
    error_response(
        502,
        json!({
            "error": "upstream_failure",
            "message": format!("{context}: {error}"),
        }),
    )
}

fn success_response(status_code: u16, payload: impl Serialize) -> ApiGatewayResponse {
    ApiGatewayResponse {
        status_code,
        headers: json!({"Content-Type": "application/json"}),
        body: serde_json::to_string(&payload).expect("response payload should serialize"),
    }
}

fn error_response(status_code: u16, payload: Value) -> ApiGatewayResponse {
    ApiGatewayResponse {
        status_code,
        headers: json!({"Content-Type": "application/json"}),
        body: payload.to_string(),
    }
}

fn log_bootstrap_info(event: &str, details: Value) {
    eprintln!(
        "{}",
        json!({
            "component": "bootstrap_handler",
            "event": event,
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "details": details,
        })
    );
}

fn log_bootstrap_error(event: &str, details: Value) {
    eprintln!(
        "{}",
        json!({
            "component": "bootstrap_handler",
            "level": "error",
            "event": event,
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "details": details,
        })
    );
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use cart_ops_core::admin::UserAccount;

    use super::*;

    struct FakeIdentity {
        accounts: Mutex<Vec<UserAccount>>,
        fail_lookup: bool,
    }

    impl FakeIdentity {
        fn empty() -> Self {
            Self {
                accounts: Mutex::new(Vec::new()),
                fail_lookup: false,
            }
        }

        fn with_account(account: UserAccount) -> Self {
            Self {
                accounts: Mutex::new(vec![account]),
                fail_lookup: false,
            }
        }

        fn failing() -> Self {
            Self {
                accounts: Mutex::new(Vec::new()),
                fail_lookup: true,
            }
        }

        fn accounts(&self) -> Vec<UserAccount> {
            self.accounts.lock().expect("poisoned mutex").clone()
        }
    }

    impl IdentityStore for FakeIdentity {
        fn find_account(&self, email: &str) -> Result<Option<UserAccount>, String> {
            if self.fail_lookup {
                return Err("simulated identity outage".to_string());
            }
            Ok(self
                .accounts
                .lock()
                .expect("poisoned mutex")
                .iter()
                .find(|account| account.email == email)
                .cloned())
        }

        fn create_account(&self, email: &str, _password: &str) -> Result<UserAccount, String> {
            let account = UserAccount {
                user_id: format!("uid-{email}"),
                email: email.to_string(),
            };
            self.accounts
                .lock()
                .expect("poisoned mutex")
                .push(account.clone());
            Ok(account)
        }

        fn delete_account(&self, user_id: &str) -> Result<(), String> {
            self.accounts
                .lock()
                .expect("poisoned mutex")
                .retain(|account| account.user_id != user_id);
            Ok(())
        }
    }

    struct FakeProfiles {
        profiles: Mutex<Vec<UserProfile>>,
    }

    impl FakeProfiles {
        fn empty() -> Self {
            Self {
                profiles: Mutex::new(Vec::new()),
            }
        }

        fn with_profile(profile: UserProfile) -> Self {
            Self {
                profiles: Mutex::new(vec![profile]),
            }
        }

        fn profiles(&self) -> Vec<UserProfile> {
            self.profiles.lock().expect("poisoned mutex").clone()
        }
    }

    impl ProfileStore for FakeProfiles {
        fn load_profile(&self, user_id: &str) -> Result<Option<UserProfile>, String> {
            Ok(self
                .profiles
                .lock()
                .expect("poisoned mutex")
                .iter()
                .find(|profile| profile.user_id == user_id)
                .cloned())
        }

        fn save_profile(&self, profile: &UserProfile) -> Result<(), String> {
            let mut profiles = self.profiles.lock().expect("poisoned mutex");
            profiles.retain(|existing| existing.user_id != profile.user_id);
            profiles.push(profile.clone());
            Ok(())
        }
    }

    fn spec() -> AdminAccountSpec {
        AdminAccountSpec::new("ops@example.com", "correct-horse").expect("valid spec")
    }

    #[test]
    fn missing_credentials_yield_misconfiguration() {
        let identity = FakeIdentity::empty();
        let profiles = FakeProfiles::empty();

        let response = handle_bootstrap_request(None, &identity, &profiles);
        assert_eq!(response.status_code, 500);
        assert!(response.body.contains("must be configured"));
        assert!(identity.accounts().is_empty());
    }

    #[test]
    fn creates_account_and_admin_profile_when_absent() {
        let identity = FakeIdentity::empty();
        let profiles = FakeProfiles::empty();

        let response = handle_bootstrap_request(Some(&spec()), &identity, &profiles);
        assert_eq!(response.status_code, 200);

        let parsed: BootstrapResponse =
            serde_json::from_str(&response.body).expect("body should parse");
        assert_eq!(parsed.message, "admin account created");
        assert_eq!(parsed.user_id, "uid-ops@example.com");

        let stored = profiles.profiles();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].role, "admin");
        assert_eq!(stored[0].status, "approved");
    }

    #[test]
    fn repairs_profile_when_account_exists_without_admin_role() {
        let account = UserAccount {
            user_id: "uid-1".to_string(),
            email: "ops@example.com".to_string(),
        };
        let mut profile = UserProfile::admin("uid-1", "ops@example.com");
        profile.role = "viewer".to_string();

        let identity = FakeIdentity::with_account(account);
        let profiles = FakeProfiles::with_profile(profile);

        let response = handle_bootstrap_request(Some(&spec()), &identity, &profiles);
        assert_eq!(response.status_code, 200);
        assert!(response.body.contains("profile repaired"));
        assert_eq!(profiles.profiles()[0].role, "admin");
    }

    #[test]
    fn repeated_bootstrap_is_a_no_op() {
        let identity = FakeIdentity::empty();
        let profiles = FakeProfiles::empty();

        handle_bootstrap_request(Some(&spec()), &identity, &profiles);
        let before = (identity.accounts(), profiles.profiles());

        let response = handle_bootstrap_request(Some(&spec()), &identity, &profiles);
        assert_eq!(response.status_code, 200);
        assert!(response.body.contains("already provisioned"));
        assert_eq!((identity.accounts(), profiles.profiles()), before);
    }

    #[test]
    fn lookup_failure_yields_bad_gateway_and_no_writes() {
        let identity = FakeIdentity::failing();
        let profiles = FakeProfiles::empty();

        let response = handle_bootstrap_request(Some(&spec()), &identity, &profiles);
        assert_eq!(response.status_code, 502);
        assert!(response.body.contains("account lookup failed"));
        assert!(identity.accounts().is_empty());
        assert!(profiles.profiles().is_empty());
    }
}
