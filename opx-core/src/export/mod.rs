//! Session-stateful exporters that turn decoded [`crate::model::Line`]
//! values into a finished output file (spec §4.7, §4.8).

pub mod rcwt;
pub mod stl;
