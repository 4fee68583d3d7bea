use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::config::Endpoint;

/// Whether each `--server` DSN carries the schema after the slash.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DsnSchemaMode {
    /// `root@tcp(host:port)/`
    #[default]
    Omit,
    /// `root@tcp(host:port)/schema`
    Include,
}

/// Driver-style DSN understood by the diff tool: `user@tcp(host:port)/[schema]`.
pub fn server_dsn(user: &str, endpoint: &Endpoint, schema: &str, mode: DsnSchemaMode) -> String {
    match mode {
        DsnSchemaMode::Omit => format!("{user}@tcp({endpoint})/"),
        DsnSchemaMode::Include => format!("{user}@tcp({endpoint})/{schema}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composes_both_modes() {
        let endpoint = Endpoint::new("127.0.0.1", 33060);
        assert_eq!(
            server_dsn("root", &endpoint, "acme_inc", DsnSchemaMode::Omit),
            "root@tcp(127.0.0.1:33060)/"
        );
        assert_eq!(
            server_dsn("root", &endpoint, "acme_inc", DsnSchemaMode::Include),
            "root@tcp(127.0.0.1:33060)/acme_inc"
        );
    }
}
