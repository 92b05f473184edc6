#![allow(dead_code)]

pub mod media_acquirer;
pub mod model;
pub mod transcriber;
