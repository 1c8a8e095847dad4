pub mod naming;
pub mod testing;
