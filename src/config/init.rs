// ABOUTME: Config scaffolding for new projects.
// ABOUTME: Creates dokimi.yml template files.

use std::path::Path;

use crate::error::{Error, Result};

use super::CONFIG_FILENAME;

pub fn init_config(dir: &Path, host: Option<&str>, force: bool) -> Result<()> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    let yaml = template_yaml(host.unwrap_or("instance.example.com"));
    std::fs::write(&config_path, yaml)?;

    Ok(())
}

fn template_yaml(host: &str) -> String {
    format!(
        r#"# Remote commands run under sudo unless disabled.
sudo: true
port: 22

instance:
  hostname: {host}
  username: root

# Proxies exported to remote commands. HOST_MACHINE resolves to this
# machine's hostname as seen from the instance.
# http_proxy: http://HOST_MACHINE:3128
# https_proxy: http://HOST_MACHINE:3128
# proxy_health_checking: true

provisioner:
  script: ./bootstrap.sh
  # home: /tmp/dokimi

# runner:
#   setup: /opt/runner/bin/setup
#   sync: /opt/runner/bin/sync
#   run: /opt/runner/bin/run
"#
    )
}
