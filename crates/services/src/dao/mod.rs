pub mod attempt;
pub mod base;
pub mod promotion_code;
pub mod user;

pub use attempt::AttemptDao;
pub use base::{BaseDao, DaoError, DaoResult, PaginatedResult, PaginationParams};
pub use promotion_code::PromotionCodeDao;
pub use user::UserDao;
