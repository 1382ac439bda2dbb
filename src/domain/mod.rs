pub mod catalog;
pub mod draw;
pub mod grid;
pub mod piece;
pub mod rules;
