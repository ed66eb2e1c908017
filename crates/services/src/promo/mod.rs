pub mod admin;
pub mod clock;
pub mod error;
pub mod generator;
pub mod limiter;
pub mod outcome;
pub mod redemption;
pub mod service;
pub mod signer;
pub mod validator;


pub use admin::{AdminService, GenerateCodesRequest, GeneratedBatch};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::PromoError;
pub use generator::{CODE_ALPHABET, CODE_LENGTH, generate_code, is_valid_format, normalize_code};
pub use limiter::AttemptLimiter;
pub use outcome::{ErrorCode, GrantedBenefit, RedemptionOutcome, Rejection, Validation};
pub use redemption::RedemptionService;
pub use service::PromoService;
pub use signer::IntegritySigner;
pub use validator::CodeValidator;
