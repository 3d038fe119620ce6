//! Configuration Vault – reads/writes `~/.stepgrid/config.toml`.
//!
//! The file has two tables:
//!
//! ```toml
//! [sensor]
//! width = 200
//! height = 150
//! fps = 15
//!
//! [detection]
//! diagnostic_mode = "overlay"
//!
//! [detection.depth]
//! min = 500
//! max = 1500
//! ```
//!
//! Every key is optional; anything missing takes its default.  The
//! `[detection]` table is re-read while the detector runs, see
//! [`modified_time`].

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use stepgrid_hal::SimTarget;
use stepgrid_hal::sim::DEFAULT_BACKGROUND_DEPTH;
use stepgrid_types::{DetectionSettings, DiagnosticMode, StepGridError};

/// Settings of the simulated depth sensor that feeds the detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorConfig {
    #[serde(default = "default_width")]
    pub width: u32,

    #[serde(default = "default_height")]
    pub height: u32,

    /// Frames captured per second.  `0` is treated as `1`.
    #[serde(default = "default_fps")]
    pub fps: u32,

    /// Depth of the empty floor, in sensor units.
    #[serde(default = "default_background")]
    pub background: u16,

    /// Moving target to render; omitted means an empty floor.
    #[serde(default = "default_target", skip_serializing_if = "Option::is_none")]
    pub target: Option<SimTarget>,

    /// Also produce a color frame next to each depth frame.
    #[serde(default)]
    pub color: bool,
}

fn default_width() -> u32 {
    200
}
fn default_height() -> u32 {
    150
}
fn default_fps() -> u32 {
    15
}
fn default_background() -> u16 {
    DEFAULT_BACKGROUND_DEPTH
}
fn default_target() -> Option<SimTarget> {
    Some(SimTarget::default())
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            fps: default_fps(),
            background: default_background(),
            target: default_target(),
            color: false,
        }
    }
}

/// Largest tile grid accepted from the config file.
pub const MAX_GRID_CELLS: usize = 4096;

/// Persisted configuration stored in `~/.stepgrid/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub sensor: SensorConfig,

    #[serde(default)]
    pub detection: DetectionSettings,
}

/// Return the path to `~/.stepgrid/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

/// Build the config path relative to the given home directory.
pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".stepgrid").join("config.toml")
}

/// Load the config from a specific path.  Returns `None` if the file does
/// not exist.
///
/// # Errors
///
/// Returns [`StepGridError::Config`] when the file cannot be read, is not
/// valid TOML for [`Config`], or asks for more than [`MAX_GRID_CELLS`] tiles.
pub fn load_from(path: &Path) -> Result<Option<Config>, StepGridError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path).map_err(|e| {
        StepGridError::Config(format!("failed to read {}: {}", path.display(), e))
    })?;
    let mut cfg: Config = toml::from_str(&raw)
        .map_err(|e| StepGridError::Config(format!("failed to parse {}: {}", path.display(), e)))?;
    let cells = cfg.detection.grid.cell_count();
    if cells > MAX_GRID_CELLS {
        return Err(StepGridError::Config(format!(
            "{}: grid has {} cells, at most {} allowed",
            path.display(),
            cells,
            MAX_GRID_CELLS
        )));
    }
    apply_env_overrides(&mut cfg);
    Ok(Some(cfg))
}

/// Built-in defaults with the `STEPGRID_*` overrides applied.
pub fn defaults_with_env() -> Config {
    let mut cfg = Config::default();
    apply_env_overrides(&mut cfg);
    cfg
}

/// Apply `STEPGRID_*` environment variable overrides to `cfg`.
///
/// Values that do not parse are ignored.
///
/// | Variable | Config field |
/// |---|---|
/// | `STEPGRID_SENSOR_FPS` | `sensor.fps` |
/// | `STEPGRID_DIAGNOSTIC_MODE` | `detection.diagnostic_mode` |
/// | `STEPGRID_MIN_DEPTH` | `detection.depth.min` |
/// | `STEPGRID_MAX_DEPTH` | `detection.depth.max` |
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("STEPGRID_SENSOR_FPS")
        && let Ok(fps) = v.parse::<u32>()
    {
        cfg.sensor.fps = fps;
    }
    if let Ok(v) = std::env::var("STEPGRID_DIAGNOSTIC_MODE")
        && let Ok(mode) = v.parse::<DiagnosticMode>()
    {
        cfg.detection.diagnostic_mode = mode;
    }
    if let Ok(v) = std::env::var("STEPGRID_MIN_DEPTH")
        && let Ok(depth) = v.parse::<u16>()
    {
        cfg.detection.depth.min = depth;
    }
    if let Ok(v) = std::env::var("STEPGRID_MAX_DEPTH")
        && let Ok(depth) = v.parse::<u16>()
    {
        cfg.detection.depth.max = depth;
    }
}

/// Last modification time of `path`, if it can be read.
pub fn modified_time(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Save the config to a specific path, creating the parent directory.
///
/// # Errors
///
/// Returns [`StepGridError::Config`] on any I/O or serialization failure.
pub fn save_to(cfg: &Config, path: &Path) -> Result<(), StepGridError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            StepGridError::Config(format!("failed to create config directory: {}", e))
        })?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700)).map_err(|e| {
                StepGridError::Config(format!("failed to set config directory permissions: {}", e))
            })?;
        }
    }
    let raw = toml::to_string_pretty(cfg)
        .map_err(|e| StepGridError::Config(format!("failed to serialize config: {}", e)))?;
    let write_err =
        |e: std::io::Error| StepGridError::Config(format!("failed to write {}: {}", path.display(), e));
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut f| {
                use std::io::Write;
                f.write_all(raw.as_bytes())
            })
            .map_err(write_err)?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw).map_err(write_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use stepgrid_types::{AxisMapping, DepthBand, PixelFormat};

    #[cfg(unix)]
    #[test]
    fn config_file_has_restrictive_permissions() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());

        save_to(&Config::default(), &path).expect("save");

        let file_mode = std::fs::metadata(&path).expect("file metadata").permissions().mode() & 0o777;
        assert_eq!(file_mode, 0o600);
        let dir_mode = std::fs::metadata(path.parent().unwrap())
            .expect("dir metadata")
            .permissions()
            .mode()
            & 0o777;
        assert_eq!(dir_mode, 0o700);
    }

    #[test]
    fn saved_config_loads_back() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());

        let mut cfg = Config::default();
        cfg.sensor.width = 320;
        cfg.sensor.color = true;
        cfg.detection.pixel_format = PixelFormat::Bgra;
        cfg.detection.axis_mapping = AxisMapping::IDENTITY;
        cfg.detection.grid.cols = 6;
        save_to(&cfg, &path).expect("save");

        let loaded = load_from(&path).expect("load ok").expect("some");
        assert_eq!(loaded.sensor.width, 320);
        assert!(loaded.sensor.color);
        assert_eq!(loaded.sensor.target, Some(SimTarget::default()));
        assert_eq!(loaded.detection.pixel_format, PixelFormat::Bgra);
        assert_eq!(loaded.detection.axis_mapping, AxisMapping::IDENTITY);
        assert_eq!(loaded.detection.grid.cols, 6);
    }

    #[test]
    fn partial_file_fills_from_defaults() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[sensor]\nheight = 90\n\n[detection.threshold]\nmin = 10\n")
            .expect("write");

        let loaded = load_from(&path).expect("load ok").expect("some");
        assert_eq!(loaded.sensor.height, 90);
        assert_eq!(loaded.sensor.width, 200);
        assert_eq!(loaded.detection.threshold.min, 10);
        assert_eq!(loaded.detection.grid, DetectionSettings::default().grid);
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[sensor\nwidth = ").expect("write");

        assert!(matches!(load_from(&path), Err(StepGridError::Config(_))));
    }

    #[test]
    fn oversized_grid_is_rejected() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[detection.grid]\ncols = 100000\nrows = 100000\n").expect("write");

        assert!(matches!(load_from(&path), Err(StepGridError::Config(_))));
    }

    #[test]
    fn grid_at_the_cap_loads() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[detection.grid]\ncols = 64\nrows = 64\n").expect("write");

        let loaded = load_from(&path).expect("load ok").expect("some");
        assert_eq!(loaded.detection.grid.cell_count(), MAX_GRID_CELLS);
    }

    #[test]
    fn config_path_points_to_stepgrid_dir() {
        let p = config_path_for_home("/home/testuser");
        assert!(p.to_string_lossy().contains(".stepgrid"));
        assert!(p.to_string_lossy().ends_with("config.toml"));
    }

    #[test]
    fn load_from_returns_none_when_missing() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        assert!(load_from(&path).expect("no error").is_none());
        assert!(modified_time(&path).is_none());
    }

    #[test]
    fn modified_time_is_reported_for_saved_file() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        save_to(&Config::default(), &path).expect("save");
        assert!(modified_time(&path).is_some());
    }

    #[test]
    fn apply_env_overrides_changes_fps() {
        // SAFETY: each env test owns its variable.
        unsafe { std::env::set_var("STEPGRID_SENSOR_FPS", "30") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.sensor.fps, 30);
        unsafe { std::env::remove_var("STEPGRID_SENSOR_FPS") };
    }

    #[test]
    fn apply_env_overrides_changes_diagnostic_mode() {
        // SAFETY: each env test owns its variable.
        unsafe { std::env::set_var("STEPGRID_DIAGNOSTIC_MODE", "blended") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.detection.diagnostic_mode, DiagnosticMode::Blended);

        let fallback = defaults_with_env();
        assert_eq!(fallback.detection.diagnostic_mode, DiagnosticMode::Blended);
        assert_eq!(fallback.sensor, SensorConfig::default());
        unsafe { std::env::remove_var("STEPGRID_DIAGNOSTIC_MODE") };
    }

    #[test]
    fn apply_env_overrides_changes_min_depth() {
        // SAFETY: each env test owns its variable.
        unsafe { std::env::set_var("STEPGRID_MIN_DEPTH", "250") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.detection.depth.min, 250);
        unsafe { std::env::remove_var("STEPGRID_MIN_DEPTH") };
    }

    #[test]
    fn apply_env_overrides_ignores_invalid_max_depth() {
        // SAFETY: each env test owns its variable.
        unsafe { std::env::set_var("STEPGRID_MAX_DEPTH", "far") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.detection.depth.max, DepthBand::default().max);
        unsafe { std::env::remove_var("STEPGRID_MAX_DEPTH") };
    }
}
