pub mod mint_project;
pub mod mint_transaction;
pub mod prelude;
