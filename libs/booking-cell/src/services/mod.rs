pub mod commit;
pub mod description;
pub mod intake;
pub mod notify;
