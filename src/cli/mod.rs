pub mod order;
pub mod quote;
pub mod rate;
pub mod setup;
pub mod ui;
pub mod wallet;
