use aws_sdk_cognitoidentityprovider::types::{AttributeType, MessageActionType};
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;

use cart_ops_core::admin::UserAccount;
use cart_ops_lambda::adapters::identity::IdentityStore;
use cart_ops_lambda::handlers::profile_deleted::handle_profile_removal_event;

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

async fn handle_request(event: LambdaEvent<Value>) -> Result<Value, Error> {
    let user_pool_id = std::env::var("USER_POOL_ID")
        .map_err(|_| Error::from("USER_POOL_ID must be configured"))?;

    let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let identity = CognitoIdentityStore {
        user_pool_id,
        cognito_client: aws_sdk_cognitoidentityprovider::Client::new(&aws_config),
    };

    Ok(handle_profile_removal_event(&event.payload, &identity))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    lambda_runtime::run(service_fn(handle_request)).await
}
