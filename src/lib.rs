//! A black widow that walks a dot lattice after the pointer.
//!
//! The simulation ([`sim`]) is headless and deterministic for a given
//! sequence of pointer positions and frame times. [`draw`] turns a frame into
//! a [`canvas::DrawList`], and [`term`] encodes the rasterized canvas as
//! braille cells.

pub mod app;
pub mod canvas;
pub mod config;
pub mod draw;
pub mod gait;
pub mod geom;
pub mod input;
pub mod lattice;
pub mod leg;
pub mod selector;
pub mod sim;
pub mod spring;
pub mod term;
pub mod ticker;
