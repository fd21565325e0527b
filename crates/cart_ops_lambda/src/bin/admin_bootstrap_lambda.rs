use aws_sdk_cognitoidentityprovider::types::{AttributeType, MessageActionType};
use aws_sdk_dynamodb::types::AttributeValue;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;

use cart_ops_core::admin::{AdminAccountSpec, UserAccount, UserProfile};
use cart_ops_lambda::adapters::identity::IdentityStore;
use cart_ops_lambda::adapters::profile_store::ProfileStore;
use cart_ops_lambda::handlers::admin_bootstrap::{handle_bootstrap_request, ApiGatewayResponse};

struct CognitoIdentityStore {
    user_pool_id: String,
    cognito_client: aws_sdk_cognitoidentityprovider::Client,
}

impl IdentityStore for CognitoIdentityStore {
    fn find_account(&self, email: &str) -> Result<Option<UserAccount>, String> {
        let user_pool_id = self.user_pool_id.clone();
        let username = email.to_string();
        let client = self.cognito_client.clone();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                let result = client
                    .admin_get_user()
                    .user_pool_id(user_pool_id)
                    .username(&username)
                    .send()
                    .await;

                match result {
                    Ok(output) => Ok(Some(UserAccount {
                        user_id: output.username().to_string(),
                        email: username,
                    })),
                    Err(error) => {
                        let service_error = error.into_service_error();
                        if service_error.is_user_not_found_exception() {
                            Ok(None)
                        } else {
                            Err(format!("failed to look up account: {service_error}"))
                        }
                    }
                }
            })
        })
    }

    fn create_account(&self, email: &str, password: &str) -> Result<UserAccount, String> {
        let user_pool_id = self.user_pool_id.clone();
        let username = email.to_string();
        let password = password.to_string();
        let client = self.cognito_client.clone();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                let email_attribute = AttributeType::builder()
                    .name("email")
                    .value(&username)
                    .build()
                    .map_err(|error| format!("failed to build email attribute: {error}"))?;
                let verified_attribute = AttributeType::builder()
                    .name("email_verified")
                    .value("true")
                    .build()
                    .map_err(|error| format!("failed to build verified attribute: {error}"))?;

                let created = client
                    .admin_create_user()
                    .user_pool_id(&user_pool_id)
                    .username(&username)
                    .message_action(MessageActionType::Suppress)
                    .user_attributes(email_attribute)
                    .user_attributes(verified_attribute)
                    .send()
                    .await
                    .map_err(|error| format!("failed to create account: {error}"))?;

                client
                    .admin_set_user_password()
                    .user_pool_id(&user_pool_id)
                    .username(&username)
                    .password(password)
                    .permanent(true)
                    .send()
                    .await
                    .map_err(|error| format!("failed to set account password: {error}"))?;

                let user_id = created
                    .user()
                    .and_then(|user| user.username())
                    .unwrap_or(username.as_str())
                    .to_string();

                Ok(UserAccount {
                    user_id,
                    email: username,
                })
            })
        })
    }

    fn delete_account(&self, user_id: &str) -> Result<(), String> {
        let user_pool_id = self.user_pool_id.clone();
        let username = user_id.to_string();
        let client = self.cognito_client.clone();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                client
                    .admin_delete_user()
                    .user_pool_id(user_pool_id)
                    .username(username)
                    .send()
                    .await
                    .map(|_| ())
                    .map_err(|error| format!("failed to delete account: {error}"))
            })
        })
    }
}

struct DynamoProfileStore {
    table: String,
    dynamo_client: aws_sdk_dynamodb::Client,
}

impl ProfileStore for DynamoProfileStore {
    fn load_profile(&self, user_id: &str) -> Result<Option<UserProfile>, String> {
        let table = self.table.clone();
        let user_id = user_id.to_string();
        let client = self.dynamo_client.clone();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                let output = client
                    .get_item()
                    .table_name(table)
                    .key("userId", AttributeValue::S(user_id.clone()))
                    .send()
                    .await
                    .map_err(|error| format!("failed to load profile: {error}"))?;

                let Some(item) = output.item() else {
                    return Ok(None);
                };

                // Missing attributes read as empty strings; the planner then
                // treats the profile as repairable rather than failing.
                Ok(Some(UserProfile {
                    user_id,
                    email: string_attribute(item, "email"),
                    role: string_attribute(item, "role"),
                    status: string_attribute(item, "status"),
                }))
            })
        })
    }

    fn save_profile(&self, profile: &UserProfile) -> Result<(), String> {
        let request = profile_save_request(&self.dynamo_client, &self.table, profile);

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                request
                    .send()
                    .await
                    .map(|_| ())
                    .map_err(|error| format!("failed to save profile: {error}"))
            })
        })
    }
}

/// Writes only the contract fields. A repair on an existing profile item must
/// leave every other attribute on the document in place, so this is an
/// update expression, never a whole-item put. `update_item` also creates the
/// item when absent, which covers the fresh-account path.
fn profile_save_request(
    client: &aws_sdk_dynamodb::Client,
    table: &str,
    profile: &UserProfile,
) -> aws_sdk_dynamodb::operation::update_item::builders::UpdateItemFluentBuilder {
    client
        .update_item()
        .table_name(table)
        .key("userId", AttributeValue::S(profile.user_id.clone()))
        .update_expression("SET email = :email, #role = :role, #status = :status")
        .expression_attribute_names("#role", "role")
        .expression_attribute_names("#status", "status")
        .expression_attribute_values(":email", AttributeValue::S(profile.email.clone()))
        .expression_attribute_values(":role", AttributeValue::S(profile.role.clone()))
        .expression_attribute_values(":status", AttributeValue::S(profile.status.clone()))
}

fn string_attribute(
    item: &std::collections::HashMap<String, AttributeValue>,
    name: &str,
) -> String {
    item.get(name)
        .and_then(|value| value.as_s().ok())
        .cloned()
        .unwrap_or_default()
}

async fn handle_request(_event: LambdaEvent<Value>) -> Result<ApiGatewayResponse, Error> {
    let user_pool_id = std::env::var("USER_POOL_ID")
        .map_err(|_| Error::from("USER_POOL_ID must be configured"))?;
    let profiles_table = std::env::var("USER_PROFILES_TABLE")
        .map_err(|_| Error::from("USER_PROFILES_TABLE must be configured"))?;

    let spec = match (std::env::var("ADMIN_EMAIL"), std::env::var("ADMIN_PASSWORD")) {
        (Ok(email), Ok(password)) => AdminAccountSpec::new(email, password).ok(),
        _ => None,
    };

    let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let identity = CognitoIdentityStore {
        user_pool_id,
        cognito_client: aws_sdk_cognitoidentityprovider::Client::new(&aws_config),
    };
    let profiles = DynamoProfileStore {
        table: profiles_table,
        dynamo_client: aws_sdk_dynamodb::Client::new(&aws_config),
    };

    Ok(handle_bootstrap_request(spec.as_ref(), &identity, &profiles))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    lambda_runtime::run(service_fn(handle_request)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offline_client() -> aws_sdk_dynamodb::Client {
        let config = aws_sdk_dynamodb::Config::builder()
            .behavior_version(aws_sdk_dynamodb::config::BehaviorVersion::latest())
            .build();
        aws_sdk_dynamodb::Client::from_conf(config)
    }

    #[test]
    fn profile_save_sets_only_the_contract_fields() {
        let client = offline_client();
        let profile = UserProfile::admin("uid-1", "ops@example.com");

        let request = profile_save_request(&client, "user-profiles", &profile);
        assert_eq!(
            request.get_update_expression().as_deref(),
            Some("SET email = :email, #role = :role, #status = :status")
        );
        assert_eq!(request.get_table_name().as_deref(), Some("user-profiles"));

        let key = request.get_key().clone().expect("key should be set");
        assert_eq!(
            key.get("userId"),
            Some(&AttributeValue::S("uid-1".to_string()))
        );
    }

    #[test]
    fn profile_save_aliases_the_reserved_attribute_names() {
        let client = offline_client();
        let profile = UserProfile::admin("uid-1", "ops@example.com");

        let request = profile_save_request(&client, "user-profiles", &profile);
        let names = request
            .get_expression_attribute_names()
            .clone()
            .expect("attribute names should be set");
        assert_eq!(names.get("#role").map(String::as_str), Some("role"));
        assert_eq!(names.get("#status").map(String::as_str), Some("status"));

        let values = request
            .get_expression_attribute_values()
            .clone()
            .expect("attribute values should be set");
        assert_eq!(
            values.get(":role"),
            Some(&AttributeValue::S("admin".to_string()))
        );
        assert_eq!(
            values.get(":status"),
            Some(&AttributeValue::S("approved".to_string()))
        );
    }
}
