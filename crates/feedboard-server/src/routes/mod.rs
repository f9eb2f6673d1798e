pub mod accounts;
pub mod api;
pub mod feeds;
pub mod pages;
