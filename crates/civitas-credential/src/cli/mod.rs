mod commands;
mod credential;
mod identity;
mod utils;

pub use commands::{Cli, Commands};
pub use credential::{build_credential, seal_witness, show_config, show_credential};
pub use identity::{classify_state, derive_commitment, derive_secret, new_entropy};
pub use utils::{config_path, init_logging};
