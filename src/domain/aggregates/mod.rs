//! Aggregates module
pub mod customer;
pub mod order;
pub mod product;

pub use customer::{Credentials, Identity, ProfileUpdate, Registration, Subscriber, User, WishlistEntry};
pub use order::{CheckoutItem, CheckoutRequest, Contact, NewOrder, NewOrderItem, Order, OrderError, OrderItem, OrderStatus};
pub use product::{NewProduct, Product, ProductError, ProductSort, Rating, Review};
