pub mod admin;
pub mod promo;
