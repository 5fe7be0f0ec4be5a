pub mod common;

mod request_flow;
