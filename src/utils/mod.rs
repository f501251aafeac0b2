pub mod jwt;
pub mod locks;
