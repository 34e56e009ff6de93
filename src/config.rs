// Bilateral payment-channel node core.
// Written in 2024 by
//     Dr. Maxim Orlovsky <orlovsky@pandoracore.com>
//
// To the extent possible under law, the author(s) have dedicated all
// copyright and related and neighboring rights to this software to
// the public domain worldwide. This software is distributed without
// any warranty.
//
// You should have received a copy of the MIT License
// along with this software.
// If not, see <https://opensource.org/licenses/MIT>.

//! Node configuration (§10): a TOML file merged with CLI overrides, CLI
//! always winning.

use std::fs;
use std::path::PathBuf;

use clap::Parser;
use secp256k1::SecretKey;

/// Command-line overrides. Anything left `None` falls back to the TOML file,
/// and anything still unset after that falls back to [`Config`]'s defaults.
#[derive(Parser, Clone, Debug, Default)]
#[clap(name = "paychand", about = "Bilateral payment-channel node")]
pub struct Opts {
    /// Path to the TOML configuration file.
    #[clap(short, long, default_value = "paychand.toml")]
    pub config: PathBuf,

    /// Directory holding the channel and route `sled` databases.
    #[clap(long)]
    pub data_dir: Option<PathBuf>,

    /// Address the peer-to-peer RPC server binds to.
    #[clap(long)]
    pub peer_listen: Option<String>,

    /// Address the local control RPC server binds to.
    #[clap(long)]
    pub local_listen: Option<String>,

    /// Basic-auth username for the local control RPC server.
    #[clap(long)]
    pub local_user: Option<String>,

    /// Basic-auth password for the local control RPC server.
    #[clap(long)]
    pub local_password: Option<String>,

    /// Hex-encoded node secret key; if omitted, read from `<data_dir>/node.key`.
    #[clap(long)]
    pub secret_key: Option<String>,

    /// Base URL of the chain adapter's JSON-RPC wallet.
    #[clap(long)]
    pub chain_rpc_url: Option<String>,

    /// Basic-auth username for the chain adapter RPC.
    #[clap(long)]
    pub chain_rpc_user: Option<String>,

    /// Basic-auth password for the chain adapter RPC.
    #[clap(long)]
    pub chain_rpc_password: Option<String>,

    /// Per-hop forwarding fee this node advertises to the router.
    #[clap(long)]
    pub forward_fee: Option<u64>,

    /// Worker pool width (number of peer-hash buckets).
    #[clap(long)]
    pub worker_threads: Option<usize>,
}

/// The TOML-deserializable configuration file shape. Field names match
/// `Opts`'s long flags so `merge` can apply CLI overrides uniformly.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub data_dir: PathBuf,
    pub peer_listen: String,
    pub local_listen: String,
    pub local_user: String,
    pub local_password: String,
    pub secret_key: Option<String>,
    pub chain_rpc_url: String,
    pub chain_rpc_user: Option<String>,
    pub chain_rpc_password: Option<String>,
    pub forward_fee: u64,
    pub worker_threads: usize,
}

impl Default for FileConfig {
    fn default() -> Self {
        FileConfig {
            data_dir: PathBuf::from("./paychand-data"),
            peer_listen: "127.0.0.1:9735".to_owned(),
            local_listen: "127.0.0.1:9736".to_owned(),
            local_user: "paychand".to_owned(),
            local_password: "paychand".to_owned(),
            secret_key: None,
            chain_rpc_url: "http://127.0.0.1:8332".to_owned(),
            chain_rpc_user: None,
            chain_rpc_password: None,
            forward_fee: 0,
            worker_threads: 8,
        }
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Display, Error, From)]
#[display(doc_comments)]
pub enum ConfigError {
    /// failed to read config file {0}: {1}
    Read(String, String),

    /// config file {0} is not valid TOML: {1}
    Parse(String, String),

    /// node secret key is neither configured nor present at {0}
    MissingSecretKey(String),

    /// configured secret key is not valid hex/bytes
    BadSecretKey,
}

/// Fully resolved node configuration: a `FileConfig` with CLI overrides
/// applied and the secret key materialized.
#[derive(Clone, Getters)]
pub struct Config {
    data_dir: PathBuf,
    peer_listen: String,
    local_listen: String,
    local_user: String,
    local_password: String,
    secret_key: SecretKey,
    chain_rpc_url: String,
    chain_rpc_user: Option<String>,
    chain_rpc_password: Option<String>,
    forward_fee: u64,
    worker_threads: usize,
}

impl Config {
    /// Loads the TOML file named by `opts.config` (treating a missing file
    /// as an empty one, so a brand-new data directory still starts from
    /// defaults), applies CLI overrides, and resolves the secret key.
    pub fn load(opts: &Opts) -> Result<Config, ConfigError> {
        let mut file = match fs::read_to_string(&opts.config) {
            Ok(contents) => toml::from_str::<FileConfig>(&contents).map_err(|e| {
                ConfigError::Parse(opts.config.display().to_string(), e.to_string())
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => FileConfig::default(),
            Err(e) => {
                return Err(ConfigError::Read(opts.config.display().to_string(), e.to_string()))
            }
        };

        if let Some(v) = &opts.data_dir {
            file.data_dir = v.clone();
        }
        if let Some(v) = &opts.peer_listen {
            file.peer_listen = v.clone();
        }
        if let Some(v) = &opts.local_listen {
            file.local_listen = v.clone();
        }
        if let Some(v) = &opts.local_user {
            file.local_user = v.clone();
        }
        if let Some(v) = &opts.local_password {
            file.local_password = v.clone();
        }
        if let Some(v) = &opts.secret_key {
            file.secret_key = Some(v.clone());
        }
        if let Some(v) = &opts.chain_rpc_url {
            file.chain_rpc_url = v.clone();
        }
        if let Some(v) = &opts.chain_rpc_user {
            file.chain_rpc_user = Some(v.clone());
        }
        if let Some(v) = &opts.chain_rpc_password {
            file.chain_rpc_password = Some(v.clone());
        }
        if let Some(v) = opts.forward_fee {
            file.forward_fee = v;
        }
        if let Some(v) = opts.worker_threads {
            file.worker_threads = v;
        }

        let secret_key = resolve_secret_key(&file)?;

        Ok(Config {
            data_dir: file.data_dir,
            peer_listen: file.peer_listen,
            local_listen: file.local_listen,
            local_user: file.local_user,
            local_password: file.local_password,
            secret_key,
            chain_rpc_url: file.chain_rpc_url,
            chain_rpc_user: file.chain_rpc_user,
            chain_rpc_password: file.chain_rpc_password,
            forward_fee: file.forward_fee,
            worker_threads: file.worker_threads,
        })
    }

}

fn resolve_secret_key(file: &FileConfig) -> Result<SecretKey, ConfigError> {
    let hex_str = match &file.secret_key {
        Some(hex_str) => hex_str.clone(),
        None => {
            let key_path = file.data_dir.join("node.key");
            fs::read_to_string(&key_path)
                .map(|s| s.trim().to_owned())
                .map_err(|_| ConfigError::MissingSecretKey(key_path.display().to_string()))?
        }
    };
    let bytes: Vec<u8> =
        bitcoin_hashes::hex::FromHex::from_hex(&hex_str).map_err(|_| ConfigError::BadSecretKey)?;
    SecretKey::from_slice(&bytes).map_err(|_| ConfigError::BadSecretKey)
}
