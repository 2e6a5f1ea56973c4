//! Pipeline configuration.
//!
//! The configuration store is built from four tiers, each shallow-merged over
//! the previous one (a key from a higher tier replaces the whole value):
//! 1. **Base** - the pipeline file's `config:` section plus its `imports:`
//! 2. **Project** - `build.config.yaml` next to the pipeline file (or `override_file`)
//! 3. **User** - `~/.taskwright/overrides.yaml`
//! 4. **Command line** - `--set key=value`
//!
//! ## Environment Variables
//! - `TASKWRIGHT_FILE` - Pipeline file (when `--file` is not given)
//! - `TASKWRIGHT_USER_DIR` - User override dir (default: `~/.taskwright`)

mod loader;
mod merge;
mod store;
mod types;

pub use loader::{
    ConfigLoader, ConfigTier, LoadOptions, LoadedTier, PIPELINE_FILE_NAMES, PipelinePaths,
    USER_OVERRIDE_FILE, apply_preset, build_delegates, build_registry, parse_set,
};
pub use merge::{merge_all, shallow_merge};
pub use store::{ConfigStore, ConfigValue};
pub use types::*;
