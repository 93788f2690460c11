//! Default values and functions for configuration

// Default constants
pub(crate) const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:2112";
pub(crate) const DEFAULT_METRIC_NAME: &str = "bytes_written";
pub(crate) const DEFAULT_METRIC_HELP: &str = "total bytes written to file";
pub(crate) const DEFAULT_STRESS_DIR: &str = "/tmp/symnotify";

pub(crate) fn default_event_buffer_size() -> usize {
    4096
}

pub(crate) fn default_listen_addr() -> String {
    DEFAULT_LISTEN_ADDR.to_string()
}

pub(crate) fn default_metric_name() -> String {
    DEFAULT_METRIC_NAME.to_string()
}

pub(crate) fn default_metric_help() -> String {
    DEFAULT_METRIC_HELP.to_string()
}

pub(crate) fn default_stress_dir() -> String {
    DEFAULT_STRESS_DIR.to_string()
}

pub(crate) fn default_stress_duration_secs() -> u64 {
    10
}

pub(crate) fn default_stress_files() -> usize {
    100
}

pub(crate) fn default_rotate_percent() -> u8 {
    5
}
