pub mod collab;
pub mod engine;
pub mod event;
pub mod fill;
pub mod goals;
pub mod level;
pub mod resolve;
pub mod selection;
pub mod store;
pub mod world;
