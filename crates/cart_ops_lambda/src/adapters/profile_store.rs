use cart_ops_core::admin::UserProfile;

pub trait ProfileStore {
    fn load_profile(&self, user_id: &str) -> Result<Option<UserProfile>, String>;
    fn save_profile(&self, profile: &UserProfile) -> Result<(), String>;
}
