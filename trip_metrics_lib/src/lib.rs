pub mod activity;
pub mod aggregator;
pub mod clock;
pub mod configuration;
pub mod geodesy;
pub mod navigation;
pub mod position_fix;
pub mod route;
pub mod summary;
