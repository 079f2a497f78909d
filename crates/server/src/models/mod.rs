//! Domain models returned by services and serialized by routes.
//!
//! These types are separate from the `FromRow` structs in [`crate::db`]; the
//! repositories validate rows on the way in (emails, theme names) and
//! assemble joined data such as product image lists and order items.

pub mod cart;
pub mod catalog;
pub mod notification;
pub mod order;
pub mod review;
pub mod session;
pub mod user;
pub mod wishlist;

pub use cart::CartLine;
pub use catalog::{Category, Product, ProductImage};
pub use notification::Notification;
pub use order::{Order, OrderItem};
pub use review::Review;
pub use session::{CurrentUser, keys as session_keys};
pub use user::{User, UserSettings};
pub use wishlist::WishlistEntry;
