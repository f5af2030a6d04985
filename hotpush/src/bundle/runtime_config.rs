//! Runtime configuration embedded in the index document.
//!
//! The served index page assigns its configuration inline:
//!
//! ```text
//! __meteor_runtime_config__ = JSON.parse(decodeURIComponent("%7B%22ROOT_URL%22...%7D"))
//! ```
//!
//! The payload is a percent-encoded JSON object. Which keys hold the app id,
//! root URL and version marker has varied between server releases, so the
//! names are supplied through [`RuntimeConfigKeys`].

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};

/// Names of the runtime configuration keys the client reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfigKeys {
    /// Key holding the application identifier.
    pub app_id: String,
    /// Key holding the root URL the app is served from.
    pub root_url: String,
    /// Key holding the version the index page was rendered for.
    pub version: String,
}

impl Default for RuntimeConfigKeys {
    fn default() -> Self {
        Self {
            app_id: "appId".to_string(),
            root_url: "ROOT_URL".to_string(),
            version: "autoupdateVersionCordova".to_string(),
        }
    }
}

/// Decoded runtime configuration of one bundle.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeConfig {
    values: Map<String, Value>,
    keys: RuntimeConfigKeys,
}

fn runtime_config_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"__meteor_runtime_config__ = JSON\.parse\(decodeURIComponent\("([^"]*)"\)\)"#)
            .expect("valid regex")
    })
}

impl RuntimeConfig {
    /// Create a configuration from decoded values.
    pub fn new(values: Map<String, Value>, keys: RuntimeConfigKeys) -> Self {
        Self { values, keys }
    }

    /// Locate and decode the configuration inside an index document.
    ///
    /// Returns `None` when the assignment is missing, the payload is not
    /// valid percent-encoding, or it does not decode to a JSON object.
    pub fn from_index_html(html: &str, keys: RuntimeConfigKeys) -> Option<Self> {
        let captures = runtime_config_pattern().captures(html)?;
        let encoded = captures.get(1)?.as_str();
        let decoded = urlencoding::decode(encoded).ok()?;

        match serde_json::from_str::<Value>(&decoded).ok()? {
            Value::Object(values) => Some(Self::new(values, keys)),
            _ => None,
        }
    }

    /// String value for an arbitrary key.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }

    /// Application identifier.
    pub fn app_id(&self) -> Option<&str> {
        self.get_str(&self.keys.app_id)
    }

    /// Root URL the application is served from.
    pub fn root_url(&self) -> Option<&str> {
        self.get_str(&self.keys.root_url)
    }

    /// Version marker the index page was rendered for.
    pub fn version(&self) -> Option<&str> {
        self.get_str(&self.keys.version)
    }
}

#[cfg(test)]
pub(crate) fn index_html_with_config(config: &Value) -> String {
    format!(
        "<html><head><script type=\"text/javascript\">__meteor_runtime_config__ = JSON.parse(decodeURIComponent(\"{}\"));</script></head><body></body></html>",
        urlencoding::encode(&config.to_string())
    )
}
