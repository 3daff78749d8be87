#![doc = include_str!("../README.md")]
#![deny(rustdoc::broken_intra_doc_links, rust_2018_idioms)]
#![warn(
    clippy::explicit_iter_loop,
    clippy::use_self,
    clippy::clone_on_ref_ptr
)]

pub mod build_info;
pub mod cli;
pub mod client;
pub mod connection;
pub mod logdirs;
pub mod messenger;
pub mod protocol;
pub mod throttle;
pub mod topic;
