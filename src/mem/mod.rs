pub mod arena;
pub mod pool;
