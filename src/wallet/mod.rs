pub mod wallet;

pub use wallet::*;
