//! One module per subcommand; each exposes `execute`.

pub mod app;
pub mod delete;
pub mod gen_key;
pub mod get;
pub mod keys;
pub mod list;
pub mod namespaces;
pub mod set;
