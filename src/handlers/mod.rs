pub mod auth;
pub mod context;
pub mod leave;
pub mod profiles;
pub mod rpc;
pub mod shared;
pub mod shifts;
pub mod storage;
pub mod teams;
pub mod templates;
pub mod transfers;
