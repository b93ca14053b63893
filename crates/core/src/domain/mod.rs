pub mod contract;
pub mod fundamental;
pub mod market;
pub mod recommendation;
pub mod technical;
