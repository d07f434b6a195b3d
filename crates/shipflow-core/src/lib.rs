//! shipflow-core
//!
//! サービスレジストリ（KDL）の読み込みと検証、変更検知、
//! ブランチからの環境解決、デプロイ計画の生成を提供します。

pub mod detect;
pub mod discovery;
pub mod error;
pub mod loader;
pub mod model;
pub mod parser;
pub mod planner;
pub mod registry;
pub mod resolver;
pub mod writer;

pub use detect::detect;
pub use discovery::{DiscoveredFiles, discover_files, find_project_root, find_project_root_from};
pub use error::{ConfigError, Result};
pub use loader::{load_project, load_project_from_root};
pub use model::*;
pub use parser::{parse_kdl_file, parse_kdl_string};
pub use planner::{plan, plan_service, replan};
pub use registry::Registry;
pub use resolver::{branch_from_ref, resolve};
pub use writer::{to_kdl_document, to_kdl_string};
