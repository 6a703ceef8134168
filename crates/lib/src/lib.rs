//! layerkit-lib: Build-plan IR and layer lowering
//!
//! This crate provides the types and passes between plan generation and image
//! building:
//! - `BuildPlan`: steps, their input layers and commands, plus the deploy stage
//! - `normalize`: removes empty layers and prunes steps the deploy never reaches
//! - `lower_plan`: composes each step's layers (merge or copy) onto an `Engine`
//! - `OpGraph`: an `Engine` that records a serializable operation graph

pub mod consts;
pub mod lower;
pub mod plan;
pub mod platform;
pub mod util;
