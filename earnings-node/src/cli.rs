//! Command-line flags for the `earnings-node` binary, each falling back to
//! an environment variable when not passed explicitly (§6 "Environment/
//! config").

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::str::FromStr;

/// `127.0.0.1:8088`.
const DEFAULT_LISTEN_ADDR: SocketAddr =
    SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 8088));

/// Runs the earnings, payout, and incentive HTTP service.
#[derive(argh::FromArgs)]
pub struct NodeArgs {
    /// the `<ip-address:port>` to listen on.
    ///
    /// Default: `127.0.0.1:8088`. Env: `LISTEN_ADDR`.
    #[argh(option)]
    pub listen_addr: Option<SocketAddr>,
}

impl NodeArgs {
    /// Parses CLI flags, then fills in any unset field from its env var.
    pub fn from_env() -> anyhow::Result<Self> {
        let mut args: Self = argh::from_env();
        args.listen_addr = args.listen_addr.or(parse_env("LISTEN_ADDR")?);
        Ok(args)
    }

    pub fn listen_addr(&self) -> SocketAddr {
        self.listen_addr.unwrap_or(DEFAULT_LISTEN_ADDR)
    }
}

/// Reads `key` from the environment and parses it, returning `Ok(None)` if
/// the variable isn't set and an error if it's set but fails to parse.
fn parse_env<T>(key: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(value) => Ok(Some(value.parse().map_err(|e| {
            anyhow::anyhow!("could not parse env var {key}: {e}")
        })?)),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(anyhow::anyhow!("env var {key} was not valid unicode: {e}")),
    }
}
