mod config;

pub use config::{
    parse_str, parser, LauncherConfig, LogConfig, OneOrMany, RestartPolicy, ToolConfig,
    READY_MARKER, SUPPRESSED_BANNERS,
};
