pub mod implementation;
pub mod refiner;
pub mod replica_bridge;
