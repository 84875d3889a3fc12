pub mod animate;
pub mod data;
pub mod feed;
pub mod listing;
pub mod logging;
pub mod render;
pub mod scan;
pub mod site;
pub mod state;
pub mod stats;
pub mod store;
