//! Crate-wide constants.

/// Application root inside the built container. Relative paths in layer
/// filters and commands are resolved against this directory.
pub const APP_DIR: &str = "/app";

/// `PATH` used for exec commands before any path commands are applied.
pub const DEFAULT_PATH: &str = "/usr/local/sbin:/usr/local/bin:/usr/sbin:/usr/bin:/sbin:/bin";

/// Name of the local build context handed to the execution engine.
pub const LOCAL_CONTEXT_NAME: &str = "context";

/// Image used as the starting point for build steps.
pub const BUILDER_IMAGE: &str = "ghcr.io/layerkit/builder:latest";

/// Image used as the default deploy base.
pub const RUNTIME_IMAGE: &str = "ghcr.io/layerkit/runtime:latest";

/// Length of the truncated hex digest used by [`ObjectHash`](crate::util::hash::ObjectHash).
pub const OBJ_HASH_PREFIX_LEN: usize = 20;

/// Mode applied to files written by file commands when none is given.
pub const DEFAULT_FILE_MODE: u32 = 0o644;

/// Label prefix attached to operations emitted by the lowering engine.
pub const LABEL_PREFIX: &str = "[layerkit]";
