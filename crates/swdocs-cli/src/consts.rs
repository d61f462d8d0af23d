/// First port the server tries to bind, counting up until one is free.
pub const PORT: u16 = 1864;

/// Config file read from the working directory when `--config` isn't given.
pub const DEFAULT_CONFIG_FILE: &str = "swdocs.toml";
