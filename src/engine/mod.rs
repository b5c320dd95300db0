//! Strategy core.  Everything here except [`cycle`] is pure and synchronous.

pub mod cycle;
pub mod decision;
pub mod indicator;
pub mod signal;
pub mod tracker;
