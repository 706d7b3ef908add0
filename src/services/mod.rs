pub mod catalog_service;
pub mod notification_service;
pub mod payment_service;
pub mod preferences_service;
pub mod review_service;
pub mod session_service;
pub mod transaction_service;
