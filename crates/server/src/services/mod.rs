//! Business logic services.
//!
//! Each service borrows the pool (and whatever shared helpers it needs) for
//! the duration of a request and owns the rules of one area:
//!
//! - `auth` - Login, registration, and password reset codes
//! - `cart` - Customer carts
//! - `catalog` - Products, categories, and product images
//! - `orders` - Checkout and the order status workflow
//! - `reviews` / `wishlist` - Customer feedback and saved products
//! - `notifications` - In-app notices and the low-stock check
//! - `users` - Account administration and profiles
//! - `dashboard` - Role dashboards
//! - `reports` - PDF and Excel exports
//! - `email` - Transactional mail
//! - `storage` - Uploaded image files

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod dashboard;
pub mod email;
pub mod notifications;
pub mod orders;
pub mod reports;
pub mod reviews;
pub mod storage;
pub mod users;
pub mod wishlist;
