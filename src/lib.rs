#![forbid(unsafe_code)]

pub mod anomaly;
pub mod candidate;
pub mod cli;
pub mod config;
pub mod crawl;
pub mod dom;
pub mod driver;
pub mod formats;
pub mod ids;
pub mod images;
pub mod ledger;
pub mod logging;
pub mod replay;
pub mod sink;
pub mod transform;
pub mod view;
pub mod webdriver;
