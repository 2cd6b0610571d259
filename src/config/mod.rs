use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Default request body ceiling: 100 MiB
pub const DEFAULT_MAX_UPLOAD_SIZE: usize = 100 * 1024 * 1024;

/// Runtime configuration for the CDN endpoint
#[derive(Debug, Clone)]
pub struct CdnConfig {
    /// Flat directory holding stored objects (default: "./uploads")
    pub storage_root: PathBuf,

    /// Maximum request body size in bytes (default: 100 MiB)
    pub max_upload_size: usize,

    /// Listen address (default: 0.0.0.0:8080)
    pub bind_addr: SocketAddr,

    /// Scheme used when building public object URLs (default: "http")
    pub public_scheme: String,

    /// WebP encoding quality, 0-100 (default: 80)
    pub webp_quality: f32,

    /// Buffer size for streaming copies into storage (default: 64 KiB)
    pub copy_buffer_size: usize,

    /// Where multipart uploads are spooled before processing (default: system temp dir)
    pub spool_dir: PathBuf,
}

impl Default for CdnConfig {
    fn default() -> Self {
        Self {
            storage_root: PathBuf::from("./uploads"),
            max_upload_size: DEFAULT_MAX_UPLOAD_SIZE,
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            public_scheme: "http".to_string(),
            webp_quality: 80.0,
            copy_buffer_size: 64 * 1024,
            spool_dir: env::temp_dir(),
        }
    }
}

impl CdnConfig {
    /// Load configuration from environment variables
    ///
    /// `CDN_ENV=development` starts from [`CdnConfig::development`] instead of the defaults.
    pub fn from_env() -> Self {
        let default = Self::for_profile(env::var("CDN_ENV").ok().as_deref());

        Self {
            storage_root: env::var("CDN_STORAGE_ROOT")
                .map(PathBuf::from)
                .unwrap_or(default.storage_root),

            max_upload_size: env::var("MAX_UPLOAD_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|&v: &usize| v > 0)
                .unwrap_or(default.max_upload_size),

            bind_addr: env::var("CDN_BIND_ADDR")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.bind_addr),

            public_scheme: env::var("CDN_PUBLIC_SCHEME")
                .ok()
                .filter(|v| v == "http" || v == "https")
                .unwrap_or(default.public_scheme),

            webp_quality: env::var("WEBP_QUALITY")
                .ok()
                .and_then(|v| v.parse::<f32>().ok())
                .filter(|v| v.is_finite())
                .map(|v| v.clamp(0.0, 100.0))
                .unwrap_or(default.webp_quality),

            copy_buffer_size: env::var("COPY_BUFFER_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|&v: &usize| v > 0)
                .unwrap_or(default.copy_buffer_size),

            spool_dir: env::var("CDN_SPOOL_DIR")
                .map(PathBuf::from)
                .unwrap_or(default.spool_dir),
        }
    }

    /// Create config for local development (loopback only, 50 MiB ceiling)
    pub fn development() -> Self {
        Self {
            max_upload_size: 50 * 1024 * 1024,
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            ..Self::default()
        }
    }

    /// Base config for a named profile; anything but `development` gets the defaults
    pub fn for_profile(profile: Option<&str>) -> Self {
        match profile {
            Some(p) if p.eq_ignore_ascii_case("development") => Self::development(),
            _ => Self::default(),
        }
    }

    /// Config rooted at the given directory, used by tests and embedders
    pub fn with_storage_root(root: impl Into<PathBuf>) -> Self {
        let storage_root = root.into();
        Self {
            spool_dir: storage_root.join(".spool"),
            storage_root,
            ..Self::default()
        }
    }
}
