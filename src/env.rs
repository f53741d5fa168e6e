// ABOUTME: Environment wrapping for remote commands.
// ABOUTME: Resolves proxy URLs and PATH extensions into an env prefix, once per phase.

use crate::config::Config;
use crate::probe::Probe;

/// Placeholder in proxy URLs that resolves to this machine's hostname,
/// letting proxy config written relative to the orchestrating host resolve
/// correctly from the instance's side.
pub const HOST_PLACEHOLDER: &str = "HOST_MACHINE";

const HTTP_CHECK_URL: &str = "http://www.google.com";
const HTTPS_CHECK_URL: &str = "https://www.google.com";

/// The resolved environment view for one phase.
///
/// Resolution is pure with respect to [`Config`]: substitution and probing
/// produce a new view, the config is never touched, so re-running a phase
/// resolves from pristine input every time.
#[derive(Debug, Clone)]
pub struct EnvCommand {
    http_proxy: Option<String>,
    https_proxy: Option<String>,
    path_dirs: Vec<String>,
    skip: bool,
}

impl EnvCommand {
    /// A view that leaves every command untouched.
    pub fn passthrough() -> Self {
        Self {
            http_proxy: None,
            https_proxy: None,
            path_dirs: Vec::new(),
            skip: true,
        }
    }

    /// Resolve the environment view: substitute the hostname placeholder in
    /// proxy URLs and, when health checking is on, drop proxies that fail
    /// their reachability probe.
    pub async fn resolve(config: &Config, probe: &dyn Probe) -> Self {
        let hostname = gethostname::gethostname().to_string_lossy().into_owned();
        Self::resolve_with_hostname(config, probe, &hostname).await
    }

    async fn resolve_with_hostname(config: &Config, probe: &dyn Probe, hostname: &str) -> Self {
        // Without a configured proxy there is nothing to export, PATH
        // extensions included.
        if config.http_proxy.is_none() && config.https_proxy.is_none() {
            return Self::passthrough();
        }

        let http_proxy = config
            .http_proxy
            .as_deref()
            .map(|url| url.replace(HOST_PLACEHOLDER, hostname));
        let https_proxy = config
            .https_proxy
            .as_deref()
            .map(|url| url.replace(HOST_PLACEHOLDER, hostname));

        let http_proxy = check_proxy(http_proxy, "http_proxy", HTTP_CHECK_URL, config, probe).await;
        let https_proxy =
            check_proxy(https_proxy, "https_proxy", HTTPS_CHECK_URL, config, probe).await;

        let path_dirs = [config.ruby_binpath.clone(), config.path.clone()]
            .into_iter()
            .flatten()
            .collect();

        Self {
            http_proxy,
            https_proxy,
            path_dirs,
            skip: false,
        }
    }

    /// Wrap a raw command with the resolved environment prefix.
    ///
    /// Returns the command unchanged when no assignment applies.
    pub fn wrap(&self, command: &str) -> String {
        if self.skip {
            return command.to_string();
        }

        let mut prefix = String::from("env");
        if let Some(proxy) = &self.http_proxy {
            prefix.push_str(&format!(" http_proxy={proxy}"));
        }
        if let Some(proxy) = &self.https_proxy {
            prefix.push_str(&format!(" https_proxy={proxy}"));
        }
        if !self.path_dirs.is_empty() {
            prefix.push_str(&format!(" PATH=$PATH:{}", self.path_dirs.join(":")));
        }

        if prefix == "env" {
            command.to_string()
        } else {
            format!("{prefix} {command}")
        }
    }
}

/// Probe one proxy when health checking is on. A failing proxy is dropped
/// from the view, not an error: the run degrades to no proxy.
async fn check_proxy(
    proxy: Option<String>,
    name: &str,
    check_url: &str,
    config: &Config,
    probe: &dyn Probe,
) -> Option<String> {
    let url = proxy?;
    if !config.proxy_health_checking {
        return Some(url);
    }

    if probe.probe(&url, check_url).await {
        tracing::info!("{} {} is reachable", name, url);
        Some(url)
    } else {
        tracing::info!("{} {} is unreachable, skipping it", name, url);
        None
    }
}
