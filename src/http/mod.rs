pub mod request;
pub mod response;
pub mod handler;
pub mod render;
pub mod server;
pub mod router {
    pub mod router;
    pub mod compute;
    pub mod command;
}
