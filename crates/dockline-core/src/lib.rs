#![forbid(unsafe_code)]

//! Core: geometric primitives shared by the dockline crates.
//!
//! # Role in dockline
//! `dockline-core` is the bottom of the stack. It owns the pixel-space
//! vocabulary (`Rect`, `Point`, `Size`, `Axis`) that the layout engine
//! (`dockline-layout`) computes with and that hosts receive geometry in.
//!
//! Everything here is plain data; no layout policy lives in this crate.

pub mod geometry;

pub use geometry::{Axis, Point, Rect, Size};
