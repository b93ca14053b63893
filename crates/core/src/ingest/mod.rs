pub mod provider;
pub mod symbol;
pub mod types;
