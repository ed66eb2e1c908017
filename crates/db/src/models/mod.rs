pub mod attempt;
pub mod promotion_code;
pub mod user;

pub use attempt::AttemptState;
pub use promotion_code::{
    Benefit, BenefitError, CodeStatus, EventPeriod, MAX_DURATION_DAYS, PromotionCode,
    UNLIMITED_USES, WindowState,
};
pub use user::{RedemptionRecord, Subscription, User};
