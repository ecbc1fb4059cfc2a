pub mod access;
pub mod admin;
pub mod auth;
pub mod guard;
pub mod qr;
pub mod system;
