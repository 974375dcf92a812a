//! 适配器公共工具
//!
//! 背压处理与像素缓冲区转换。

pub(crate) mod common;
