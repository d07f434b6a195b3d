//! モデル定義
//!
//! shipflowで使用されるデータモデルを定義します。
//! 各モデルは機能ごとにモジュールに分離されています。

mod branch;
mod environment;
mod plan;
mod report;
mod service;

// Re-exports
pub use branch::*;
pub use environment::*;
pub use plan::*;
pub use report::*;
pub use service::*;
