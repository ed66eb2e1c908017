pub mod auth;
pub mod dao;
pub mod promo;
pub mod store;

pub use auth::AuthService;
pub use dao::*;
pub use promo::PromoService;
