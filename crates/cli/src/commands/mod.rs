pub mod migrate;
pub mod secret;
