// src/constants.rs

/// Strings (compared lowercase) that coerce to `true` for boolean parameters.
pub const TRUE_STRINGS: &[&str] = &["true", "t", "yes", "y", "1"];

/// Internal clap id of the config-file path argument (`-c`/`--conf`).
pub const CONF_PATH_ARG: &str = "conf";

/// Internal clap id of the write-out flag (`-w [filename]`).
pub const WRITE_OUT_ARG: &str = "write-out";

/// Key that per-instance logging setup reads its verbosity level from.
pub const VERBOSE_KEY: &str = "verbose";
