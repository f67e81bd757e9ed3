//! Application services sitting between the HTTP layer and the stores.

pub mod accounts;
pub mod catalog;
pub mod newsletter;
pub mod notifier;
pub mod orders;
pub mod payments;
pub mod wishlist;

pub use accounts::AccountService;
pub use catalog::CatalogService;
pub use newsletter::NewsletterService;
pub use notifier::{LogNotifier, NatsNotifier, Notifier};
pub use orders::OrderWorkflow;
pub use payments::{MockPaymentGateway, PaymentGateway};
pub use wishlist::WishlistService;
