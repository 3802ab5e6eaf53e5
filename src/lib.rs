#[macro_use]
extern crate slog;

extern crate nalgebra as na;
extern crate nalgebra_glm as glm;

pub mod common;
pub mod wrap;
