//! Command line configuration of the `mail-roundtrip` program.

use clap::Parser;
use reqwest::Url;

/// Port the demo server listens on unless told otherwise
pub const DEFAULT_SERVER_PORT: u16 = 65111;

#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(
    name = "mail-roundtrip",
    about = "Start a mail RPC server, attach a client and send one message"
)]
pub struct DemoConfig {
    /// IP address the server binds to
    #[arg(long, default_value = "127.0.0.1")]
    pub bind: String,

    /// Port the server binds to (0 picks a free port)
    #[arg(long, default_value_t = DEFAULT_SERVER_PORT)]
    pub port: u16,

    /// Endpoint the client connects to; defaults to the server's bound address
    #[arg(long)]
    pub url: Option<String>,
}

impl Default for DemoConfig {
    fn default() -> Self {
        DemoConfig { bind: "127.0.0.1".to_string(), port: DEFAULT_SERVER_PORT, url: None }
    }
}

impl DemoConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }

    /// URL the client connects to once the server is bound to `bound_port`
    pub fn client_url(&self, bound_port: u16) -> String {
        if let Some(url) = &self.url {
            return url.clone();
        }
        let host = match self.bind.as_str() {
            "0.0.0.0" | "::" => "127.0.0.1",
            host => host,
        };
        if host.contains(':') {
            format!("http://[{host}]:{bound_port}")
        } else {
            format!("http://{host}:{bound_port}")
        }
    }

    /// Port of an explicit `--url` when it differs from the bound port
    ///
    /// Such a client talks to whatever listens there, not to this server.
    pub fn target_port_mismatch(&self, bound_port: u16) -> Option<u16> {
        let url = Url::parse(self.url.as_deref()?).ok()?;
        let port = url.port_or_known_default()?;
        (port != bound_port).then_some(port)
    }
}
