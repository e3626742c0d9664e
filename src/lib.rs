//! euvsim: stochastic EUV exposure simulation
//!
//! Models a line/space exposure from mask to printed contour: optical dose,
//! photon shot noise and acid yield, post-exposure-bake diffusion, threshold
//! development and CD/LER/defect metrics, plus dose × focus process windows.

pub mod cli;
pub mod core;
pub mod entities;
pub mod schema;
pub mod yaml;
