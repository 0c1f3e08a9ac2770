pub mod config;
pub mod logging;

pub mod chunk;
pub mod crs;
pub mod fetcher;
pub mod http;
pub mod layout;
pub mod pipeline;
pub mod provision;
pub mod raster;
pub mod remote;
pub mod retry;
pub mod scheduler;
pub mod sleep;
pub mod storage;
pub mod validate;
pub mod workgen;
