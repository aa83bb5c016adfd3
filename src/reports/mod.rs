// Reports module - ownership and gain/loss reports built on the NAV engine

pub mod cache;
pub mod ownership;

pub use cache::{fingerprint, load_or_build_ownership};
pub use ownership::{
    build_gain_loss_report, build_ownership_report, GainLossReport, OwnershipReport,
    OwnershipRow, ValueSource,
};
