use cart_ops_core::admin::UserAccount;

pub trait IdentityStore {
    fn find_account(&self, email: &str) -> Result<Option<UserAccount>, String>;
    fn create_account(&self, email: &str, password: &str) -> Result<UserAccount, String>;
    fn delete_account(&self, user_id: &str) -> Result<(), String>;
}
