pub mod activation_code;
pub mod audit;
pub mod device;
pub mod restaurant;

pub use activation_code::{ActivationCode, CodeListing, CodeStatus, IssueCode};
pub use audit::AuditEntry;
pub use device::{
    Claims, DeviceCredential, LoginRequest, RevokeRequest, Role, SetupRequest, TokenResponse,
    UpdateKitchenPinRequest, VerifyAdminPinRequest,
};
pub use restaurant::{Restaurant, RestaurantStatus, SystemStatus};
