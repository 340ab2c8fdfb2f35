//! End-to-end scaffolding runs against mock HDF trees.

mod fixture;
mod linux_driver;
mod liteos_driver;
mod revert;
