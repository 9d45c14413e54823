pub mod clock;
pub mod entities;
pub mod fingerprint;
pub mod normalize;
pub mod use_cases;
pub mod validation;
