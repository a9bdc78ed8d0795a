// Heart Rate Sentinel - HTTP front end and demo client

pub mod cli;
pub mod demo;
pub mod http;
pub mod server;
