pub mod coverage;
pub mod insurer;
pub mod quote;
