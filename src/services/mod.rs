pub mod error;
pub mod mandant_service;
pub mod monitoring_service;
pub mod object_group_service;
pub mod object_service;
pub mod settings_service;
pub mod user_profile_service;
pub mod user_service;

pub use error::{ServiceError, ServiceResult};
pub use mandant_service::MandantService;
pub use monitoring_service::MonitoringService;
pub use object_group_service::ObjectGroupService;
pub use object_service::ObjectService;
pub use settings_service::SettingsService;
pub use user_profile_service::UserProfileService;
pub use user_service::UserService;
