// Library exports for the binary and integration tests

pub mod analytics;
pub mod card;
pub mod config;
pub mod controller;
pub mod currency;
pub mod dom;
pub mod net;
pub mod preload;
pub mod styles;
pub mod timers;
pub mod toast;
pub mod visibility;

// Re-export commonly used types for tests
pub use card::CardUpdate;
pub use config::ControllerConfig;
pub use controller::{CardAction, CardInteractionController, ChatOutcome, DispatchOutcome};
pub use dom::Page;
pub use net::{ApiClient, ApiError, HttpApiClient};
pub use toast::{ToastId, ToastKind};
pub use visibility::Rect;
