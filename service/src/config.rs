use clap::builder::TypedValueParser as _;
use clap::Parser;
use dotenvy::dotenv;
use log::LevelFilter;
use std::fmt;
use std::str::FromStr;

/// Default Zoom OAuth authorization URL used when `ZOOM_AUTH_URL` is not set.
pub const DEFAULT_ZOOM_AUTH_URL: &str = "https://zoom.us/oauth/authorize";
/// Default Zoom OAuth token URL used when `ZOOM_TOKEN_URL` is not set.
pub const DEFAULT_ZOOM_TOKEN_URL: &str = "https://zoom.us/oauth/token";
/// Default Zoom profile URL used when `ZOOM_USERINFO_URL` is not set.
pub const DEFAULT_ZOOM_USERINFO_URL: &str = "https://api.zoom.us/v2/users/me";
/// Default Google OAuth token URL used for the FCM JWT-bearer grant.
pub const DEFAULT_FCM_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
/// Default FCM HTTP v1 API base URL.
pub const DEFAULT_FCM_BASE_URL: &str = "https://fcm.googleapis.com/v1";
/// Default application deep link the OAuth callback redirects back to.
pub const DEFAULT_APP_REDIRECT_URI: &str = "cotrainr://video/zoom-connected";

#[derive(Clone, Debug, PartialEq)]
pub enum RustEnv {
    Development,
    Production,
    Staging,
}

#[derive(Debug, PartialEq, Eq)]
pub struct RustEnvParseError;

impl FromStr for RustEnv {
    type Err = RustEnvParseError;
    fn from_str(level: &str) -> Result<RustEnv, Self::Err> {
        match level.to_lowercase().as_str() {
            "development" => Ok(RustEnv::Development),
            "production" => Ok(RustEnv::Production),
            "staging" => Ok(RustEnv::Staging),
            _ => Err(RustEnvParseError),
        }
    }
}

impl fmt::Display for RustEnv {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RustEnv::Development => write!(f, "development"),
            RustEnv::Production => write!(f, "production"),
            RustEnv::Staging => write!(f, "staging"),
        }
    }
}

#[derive(Clone, Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// A list of full CORS origin URLs that allowed to receive server responses.
    #[arg(
        long,
        env,
        value_delimiter = ',',
        use_value_delimiter = true,
        default_value = "http://localhost:3000,https://localhost:3000"
    )]
    pub allowed_origins: Vec<String>,

    /// The application deep-link URI that every OAuth callback outcome
    /// redirects back to, carrying `?success=1` or `?error=<code>`.
    #[arg(long, env, default_value = DEFAULT_APP_REDIRECT_URI)]
    app_redirect_uri: String,

    /// The Zoom OAuth application client ID.
    #[arg(long, env)]
    zoom_client_id: Option<String>,

    /// The Zoom OAuth application client secret.
    #[arg(long, env)]
    zoom_client_secret: Option<String>,

    /// The redirect URI registered with the Zoom OAuth application.
    #[arg(long, env)]
    zoom_redirect_uri: Option<String>,

    /// The Zoom OAuth authorization endpoint.
    #[arg(long, env, default_value = DEFAULT_ZOOM_AUTH_URL)]
    zoom_auth_url: String,

    /// The Zoom OAuth token endpoint.
    /// Override in tests to point at a mock server.
    #[arg(long, env, default_value = DEFAULT_ZOOM_TOKEN_URL)]
    zoom_token_url: String,

    /// The Zoom profile endpoint used to read the linked account email.
    /// Override in tests to point at a mock server.
    #[arg(long, env, default_value = DEFAULT_ZOOM_USERINFO_URL)]
    zoom_userinfo_url: String,

    /// The Firebase project whose FCM API receives push sends.
    #[arg(long, env)]
    firebase_project_id: Option<String>,

    /// The Firebase service account email (assertion issuer/subject).
    #[arg(long, env)]
    firebase_client_email: Option<String>,

    /// The Firebase service account RSA private key (PKCS#8 PEM). Literal
    /// `\n` sequences are accepted and unescaped.
    #[arg(long, env)]
    firebase_private_key: Option<String>,

    /// The OAuth token endpoint for the FCM JWT-bearer grant.
    /// Override in tests to point at a mock server.
    #[arg(long, env, default_value = DEFAULT_FCM_TOKEN_URL)]
    fcm_token_url: String,

    /// The FCM HTTP v1 API base URL.
    /// Override in tests to point at a mock server.
    #[arg(long, env, default_value = DEFAULT_FCM_BASE_URL)]
    fcm_base_url: String,

    /// The base URL of the external identity verifier. When unset the
    /// server falls back to a static development verifier.
    #[arg(long, env)]
    identity_base_url: Option<String>,

    /// The API key sent alongside bearer tokens to the identity verifier.
    #[arg(long, env)]
    identity_api_key: Option<String>,

    /// The host interface to listen for incoming connections
    #[arg(short, long, env, default_value = "127.0.0.1")]
    pub interface: Option<String>,

    /// The host TCP port to listen for incoming connections
    #[arg(short, long, env, default_value_t = 4000)]
    pub port: u16,

    /// Set the log level verbosity threshold (level) to control what gets displayed on console output
    #[arg(
        short,
        long,
        env,
        default_value_t = LevelFilter::Info,
        value_parser = clap::builder::PossibleValuesParser::new(["OFF", "ERROR", "WARN", "INFO", "DEBUG", "TRACE"])
            .map(|s| s.parse::<LevelFilter>().unwrap()),
        )]
    pub log_level_filter: LevelFilter,

    /// Set the Rust runtime environment to use.
    #[arg(
    short,
    long,
    env,
    default_value_t = RustEnv::Development,
    value_parser = clap::builder::PossibleValuesParser::new([
        "DEVELOPMENT", "PRODUCTION", "STAGING",
        "development", "production", "staging"
    ])
        .map(|s| s.parse::<RustEnv>().unwrap()),
    )]
    pub runtime_env: RustEnv,
}

impl Default for Config {
    fn default() -> Self {
        // No CLI arguments involved, so tests get a config built purely
        // from declared defaults and the environment.
        Config::parse_from(["config"])
    }
}

impl Config {
    pub fn new() -> Self {
        // Load .env file first
        dotenv().ok();
        // Then parse the command line parameters and flags
        Config::parse()
    }

    /// Returns the application deep-link redirect URI.
    pub fn app_redirect_uri(&self) -> &str {
        &self.app_redirect_uri
    }

    pub fn set_app_redirect_uri(mut self, uri: String) -> Self {
        self.app_redirect_uri = uri;
        self
    }

    /// Returns the Zoom OAuth client ID, if configured.
    pub fn zoom_client_id(&self) -> Option<String> {
        self.zoom_client_id.clone()
    }

    pub fn set_zoom_client_id(mut self, client_id: String) -> Self {
        self.zoom_client_id = Some(client_id);
        self
    }

    /// Returns the Zoom OAuth client secret, if configured.
    pub fn zoom_client_secret(&self) -> Option<String> {
        self.zoom_client_secret.clone()
    }

    pub fn set_zoom_client_secret(mut self, client_secret: String) -> Self {
        self.zoom_client_secret = Some(client_secret);
        self
    }

    /// Returns the registered Zoom redirect URI, if configured.
    pub fn zoom_redirect_uri(&self) -> Option<String> {
        self.zoom_redirect_uri.clone()
    }

    pub fn set_zoom_redirect_uri(mut self, redirect_uri: String) -> Self {
        self.zoom_redirect_uri = Some(redirect_uri);
        self
    }

    pub fn zoom_auth_url(&self) -> &str {
        &self.zoom_auth_url
    }

    pub fn zoom_token_url(&self) -> &str {
        &self.zoom_token_url
    }

    pub fn set_zoom_token_url(mut self, url: String) -> Self {
        self.zoom_token_url = url;
        self
    }

    pub fn zoom_userinfo_url(&self) -> &str {
        &self.zoom_userinfo_url
    }

    pub fn set_zoom_userinfo_url(mut self, url: String) -> Self {
        self.zoom_userinfo_url = url;
        self
    }

    /// Returns the Firebase project ID, if configured.
    pub fn firebase_project_id(&self) -> Option<String> {
        self.firebase_project_id.clone()
    }

    pub fn set_firebase_project_id(mut self, project_id: String) -> Self {
        self.firebase_project_id = Some(project_id);
        self
    }

    /// Returns the Firebase service account email, if configured.
    pub fn firebase_client_email(&self) -> Option<String> {
        self.firebase_client_email.clone()
    }

    pub fn set_firebase_client_email(mut self, client_email: String) -> Self {
        self.firebase_client_email = Some(client_email);
        self
    }

    /// Returns the Firebase service account private key, if configured.
    pub fn firebase_private_key(&self) -> Option<String> {
        self.firebase_private_key.clone()
    }

    pub fn set_firebase_private_key(mut self, private_key: String) -> Self {
        self.firebase_private_key = Some(private_key);
        self
    }

    pub fn fcm_token_url(&self) -> &str {
        &self.fcm_token_url
    }

    pub fn set_fcm_token_url(mut self, url: String) -> Self {
        self.fcm_token_url = url;
        self
    }

    pub fn fcm_base_url(&self) -> &str {
        &self.fcm_base_url
    }

    pub fn set_fcm_base_url(mut self, url: String) -> Self {
        self.fcm_base_url = url;
        self
    }

    /// Returns the identity verifier base URL, if configured.
    pub fn identity_base_url(&self) -> Option<String> {
        self.identity_base_url.clone()
    }

    pub fn set_identity_base_url(mut self, url: String) -> Self {
        self.identity_base_url = Some(url);
        self
    }

    /// Returns the identity verifier API key, if configured.
    pub fn identity_api_key(&self) -> Option<String> {
        self.identity_api_key.clone()
    }

    pub fn runtime_env(&self) -> RustEnv {
        self.runtime_env.clone()
    }

    pub fn is_production(&self) -> bool {
        self.runtime_env() == RustEnv::Production
    }
}
