// Configuration for the transcript cascade, read once from the environment

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use tracing::error;

use super::errors::TranscriptError;
use super::models::{ClientProfile, MirrorInstance};

pub const DEFAULT_PIPED_INSTANCES: &[&str] = &[
    "https://pipedapi.kavin.rocks",
    "https://api.piped.privacy.com.de",
    "https://piped-api.lunar.icu",
    "https://pipedapi.drgns.space",
    "https://api.piped.yt",
    "https://piped-api.garudalinux.org",
    "https://pa.il.ax",
    "https://p.odyssey346.dev",
    "https://api.piped.projectsegfau.lt",
    "https://pipedapi.system41.xyz",
    "https://api.piped.zing.studio",
    "https://piped.video",
    "https://piped.tokhmi.xyz",
    "https://piped.moomoo.me",
    "https://piped.syncpundit.io",
    "https://piped.mha.fi",
    "https://api.piped.ham-radio.op.gg",
    "https://piped-api.smnz.de",
    "https://api.piped.adminforge.de",
    "https://pipedapi.ducks.party",
    "https://pd.circl.es",
    "https://pipedapi.ngn.tf",
];

pub const DEFAULT_INVIDIOUS_INSTANCES: &[&str] = &[
    "https://inv.tux.pizza",
    "https://invidious.flokinet.to",
    "https://invidious.projectsegfau.lt",
    "https://vid.puffyan.us",
    "https://yewtu.be",
    "https://yt.artemislena.eu",
    "https://invidious.privacydev.net",
    "https://iv.ggtyler.dev",
    "https://invidious.lunar.icu",
    "https://inv.nadeko.net",
    "https://invidious.protokolla.fi",
    "https://invidious.drgns.space",
    "https://invidious.jing.rocks",
    "https://invidious.nerdvpn.de",
    "https://invidious.perennialte.ch",
    "https://invidious.einfachzocken.eu",
    "https://invidious.fdn.fr",
    "https://invidious.no-logs.com",
];

/// yt-dlp `player_client` values, tried in order
pub const DEFAULT_YTDLP_CLIENTS: &[&str] = &["ios", "android", "tv", "web"];

/// Configuration for transcript acquisition
#[derive(Clone)]
pub struct TranscriptConfig {
    /// Cookie header attached to every upstream request
    pub cookies: Option<String>,
    /// HTTP(S)/SOCKS proxy URL
    pub proxy: Option<String>,
    /// Remote page-scrape proxy endpoint
    pub remote_proxy_url: Option<String>,
    /// Explicit yt-dlp path (auto-detected when unset)
    pub ytdlp_path: Option<PathBuf>,
    /// yt-dlp player clients, in priority order
    pub ytdlp_clients: Vec<String>,
    /// Pass --geo-bypass to yt-dlp
    pub geo_bypass: bool,
    /// Per-attempt timeout for the direct strategies
    pub timeout: Duration,
    /// Per-request timeout for mirror instances
    pub mirror_timeout: Duration,
    /// yt-dlp subprocess timeout
    pub ytdlp_timeout: Duration,
    pub piped_instances: Vec<MirrorInstance>,
    pub invidious_instances: Vec<MirrorInstance>,
    /// Player-API impersonation profiles, in priority order
    pub profiles: Vec<ClientProfile>,
    /// Origin for the player API and watch page
    pub youtube_base: String,
    /// Origin for the legacy timedtext endpoint
    pub legacy_base: String,
}

impl Default for TranscriptConfig {
    fn default() -> Self {
        Self {
            cookies: None,
            proxy: None,
            remote_proxy_url: None,
            ytdlp_path: None,
            ytdlp_clients: DEFAULT_YTDLP_CLIENTS.iter().map(|c| c.to_string()).collect(),
            geo_bypass: true,
            timeout: Duration::from_secs(15),
            mirror_timeout: Duration::from_secs(8),
            ytdlp_timeout: Duration::from_secs(45),
            piped_instances: instances(DEFAULT_PIPED_INSTANCES.iter().copied()),
            invidious_instances: instances(DEFAULT_INVIDIOUS_INSTANCES.iter().copied()),
            profiles: ClientProfile::defaults(),
            youtube_base: "https://www.youtube.com".to_string(),
            legacy_base: "http://video.google.com".to_string(),
        }
    }
}

// Cookies and proxy credentials stay out of logs
impl fmt::Debug for TranscriptConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranscriptConfig")
            .field("cookies", &self.cookies.as_ref().map(|_| "<redacted>"))
            .field("proxy", &self.redacted_proxy())
            .field("remote_proxy_url", &self.remote_proxy_url)
            .field("ytdlp_path", &self.ytdlp_path)
            .field("ytdlp_clients", &self.ytdlp_clients)
            .field("timeout", &self.timeout)
            .field("mirror_timeout", &self.mirror_timeout)
            .field("ytdlp_timeout", &self.ytdlp_timeout)
            .field("piped_instances", &self.piped_instances.len())
            .field("invidious_instances", &self.invidious_instances.len())
            .field("profiles", &self.profiles.iter().map(|p| p.name).collect::<Vec<_>>())
            .finish()
    }
}

impl TranscriptConfig {
    /// Read configuration from process environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup.
    ///
    /// Malformed values are logged and replaced by defaults; an invalid
    /// remote proxy endpoint is kept so that strategy reports it per call.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Self::default();

        config.cookies = get("YOUTUBE_COOKIES");
        config.proxy = get("YOUTUBE_PROXY").or_else(|| get("HTTPS_PROXY"));
        config.remote_proxy_url = get("TRANSCRIPT_PROXY_URL");
        config.ytdlp_path = get("YTDLP_PATH").map(PathBuf::from);

        let secs = |key: &str, default: Duration| match get(key).map(|v| parse_secs(key, &v)) {
            Some(Ok(value)) => value,
            Some(Err(e)) => {
                error!(error = %e, "[Config] Ignoring malformed value");
                default
            }
            None => default,
        };
        config.timeout = secs("TRANSCRIPT_TIMEOUT_SECS", config.timeout);
        config.mirror_timeout = secs("TRANSCRIPT_MIRROR_TIMEOUT_SECS", config.mirror_timeout);
        config.ytdlp_timeout = secs("TRANSCRIPT_YTDLP_TIMEOUT_SECS", config.ytdlp_timeout);

        if let Some(list) = get("PIPED_INSTANCES") {
            config.piped_instances = instances(list.split(','));
        }
        if let Some(list) = get("INVIDIOUS_INSTANCES") {
            config.invidious_instances = instances(list.split(','));
        }
        if let Some(list) = get("YTDLP_CLIENTS") {
            config.ytdlp_clients = list
                .split(',')
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect();
        }

        config
    }

    pub fn with_cookies(mut self, cookies: Option<String>) -> Self {
        self.cookies = cookies;
        self
    }

    pub fn with_proxy(mut self, proxy: Option<String>) -> Self {
        self.proxy = proxy;
        self
    }

    pub fn with_remote_proxy(mut self, endpoint: Option<String>) -> Self {
        self.remote_proxy_url = endpoint;
        self
    }

    pub fn with_ytdlp_path(mut self, path: Option<PathBuf>) -> Self {
        self.ytdlp_path = path;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_mirror_timeout(mut self, timeout: Duration) -> Self {
        self.mirror_timeout = timeout;
        self
    }

    pub fn with_piped_instances(mut self, list: Vec<MirrorInstance>) -> Self {
        self.piped_instances = list;
        self
    }

    pub fn with_invidious_instances(mut self, list: Vec<MirrorInstance>) -> Self {
        self.invidious_instances = list;
        self
    }

    pub fn with_profiles(mut self, profiles: Vec<ClientProfile>) -> Self {
        self.profiles = profiles;
        self
    }

    pub fn with_youtube_base(mut self, base: &str) -> Self {
        self.youtube_base = base.trim_end_matches('/').to_string();
        self
    }

    pub fn with_legacy_base(mut self, base: &str) -> Self {
        self.legacy_base = base.trim_end_matches('/').to_string();
        self
    }

    /// Proxy URL with any userinfo stripped, safe for logs and messages
    pub fn redacted_proxy(&self) -> Option<String> {
        self.proxy.as_deref().map(|p| match url::Url::parse(p) {
            Ok(mut parsed) => {
                if !parsed.username().is_empty() || parsed.password().is_some() {
                    let _ = parsed.set_username("");
                    let _ = parsed.set_password(None);
                }
                parsed.to_string()
            }
            Err(_) => "<unparseable proxy>".to_string(),
        })
    }
}

fn parse_secs(key: &str, value: &str) -> Result<Duration, TranscriptError> {
    match value.parse::<u64>() {
        Ok(0) => Err(TranscriptError::Config(format!("{} must be greater than 0", key))),
        Ok(secs) => Ok(Duration::from_secs(secs)),
        Err(e) => Err(TranscriptError::Config(format!(
            "{} must be a whole number of seconds, got {:?}: {}",
            key, value, e
        ))),
    }
}

fn instances<'a>(urls: impl Iterator<Item = &'a str>) -> Vec<MirrorInstance> {
    urls.map(str::trim)
        .filter(|u| !u.is_empty())
        .map(MirrorInstance::new)
        .collect()
}
