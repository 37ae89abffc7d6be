//! 런타임이 전달하는 도메인 데이터.

mod bar;

pub use bar::*;
