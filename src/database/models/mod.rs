pub mod mandant;
pub mod object;
pub mod object_group;
pub mod setting;
pub mod user;
pub mod user_profile;

pub use mandant::Mandant;
pub use object::PortalObject;
pub use object_group::ObjectGroup;
pub use setting::Setting;
pub use user::User;
pub use user_profile::UserProfile;
