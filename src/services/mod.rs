pub mod cart;
pub mod checkout;
pub mod expiry;
pub mod reporting;
pub mod scheduler;

pub use cart::CartService;
pub use checkout::CheckoutService;
pub use expiry::ExpiryService;
pub use reporting::ReportingService;
