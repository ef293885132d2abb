pub mod password;
pub mod principal;
pub mod tokens;
