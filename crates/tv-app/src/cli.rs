use std::path::PathBuf;

use clap::Parser;
use tv_data::ViewerConfig;

use crate::demo::{DEMO_COLLECTION, DEMO_DATABASE};

/// Command-line arguments for telemetry-viewer
#[derive(Parser, Debug)]
#[command(version, about = "Query game telemetry and raise it on a viewport as a point cloud")]
pub struct Args {
    /// TOML configuration file; flags override its values
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Use the built-in demo database
    #[arg(long, action, conflicts_with = "data_dir")]
    pub demo: bool,

    /// Directory of SQLite databases, one `<name>.db` per database
    #[arg(long = "data-dir")]
    pub data_dir: Option<PathBuf>,

    /// Write the demo data to `<DIR>/telemetry.db` and exit
    #[arg(long = "create-sample-db", value_name = "DIR")]
    pub create_sample_db: Option<PathBuf>,

    #[arg(long)]
    pub ip: Option<String>,

    #[arg(long)]
    pub port: Option<String>,

    #[arg(long)]
    pub database: Option<String>,

    /// Collection to query (default: the first one listed)
    #[arg(long)]
    pub collection: Option<String>,

    /// Comma-separated fields to include (default: all)
    #[arg(long, value_delimiter = ',')]
    pub fields: Vec<String>,

    /// Comma-separated included fields to sort by, ascending
    #[arg(long, value_delimiter = ',')]
    pub sort: Vec<String>,

    /// Parser mode: none, position or vector3
    #[arg(long)]
    pub parser: Option<String>,

    /// Level key scoping position mode
    #[arg(long = "level-key")]
    pub level_key: Option<String>,

    /// Background level to load
    #[arg(long)]
    pub level: Option<String>,

    #[arg(long)]
    pub skip: Option<u64>,

    /// 0 means no limit
    #[arg(long)]
    pub limit: Option<u64>,

    #[arg(long = "position-field")]
    pub position_field: Option<String>,

    #[arg(long = "scalar-field")]
    pub scalar_field: Option<String>,

    /// Color points by the scalar field
    #[arg(long = "use-scalar", action)]
    pub use_scalar: bool,

    #[arg(long)]
    pub min: Option<f64>,

    #[arg(long)]
    pub desired: Option<f64>,

    #[arg(long)]
    pub max: Option<f64>,

    /// Comma-separated row ids to visualize (default: every row)
    #[arg(long, value_delimiter = ',')]
    pub rows: Vec<usize>,

    /// Write the fetched rows as CSV
    #[arg(long = "export-csv")]
    pub export_csv: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, action)]
    pub verbose: bool,
}

impl Args {
    /// Overlay the flags that were given onto `config`
    pub fn apply_to(&self, config: &mut ViewerConfig) {
        fn set<T: Clone>(target: &mut T, value: &Option<T>) {
            if let Some(value) = value {
                *target = value.clone();
            }
        }

        let connection = &mut config.connection;
        set(&mut connection.settings.ip, &self.ip);
        set(&mut connection.settings.port, &self.port);
        set(&mut connection.settings.database, &self.database);
        if self.data_dir.is_some() {
            connection.data_dir = self.data_dir.clone();
        }
        if self.demo && connection.settings.database.is_empty() {
            connection.settings.database = DEMO_DATABASE.to_string();
        }

        let fetch = &mut config.fetch;
        if self.collection.is_some() {
            fetch.collection = self.collection.clone();
        } else if self.demo && fetch.collection.is_none() {
            fetch.collection = Some(DEMO_COLLECTION.to_string());
        }
        if !self.fields.is_empty() {
            fetch.fields = self.fields.clone();
        }
        if !self.sort.is_empty() {
            fetch.sort = self.sort.clone();
        }
        set(&mut fetch.window.skip, &self.skip);
        set(&mut fetch.window.limit, &self.limit);

        set(&mut config.parser.mode, &self.parser);
        if self.level_key.is_some() {
            config.parser.level_key = self.level_key.clone();
        }
        set(&mut config.level.path, &self.level);

        let visualization = &mut config.visualization;
        if self.position_field.is_some() {
            visualization.position_field = self.position_field.clone();
        }
        if self.scalar_field.is_some() {
            visualization.scalar_field = self.scalar_field.clone();
        }
        visualization.use_scalar |= self.use_scalar;
        set(&mut visualization.min, &self.min);
        set(&mut visualization.desired, &self.desired);
        set(&mut visualization.max, &self.max);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tv_core::ParserMode;

    #[test]
    fn test_flags_override_file() {
        let mut config = ViewerConfig::from_toml_str(
            r#"
            [connection]
            ip = "db.internal"
            database = "prod"

            [fetch]
            limit = 50
            fields = ["time"]
            "#,
        )
        .unwrap();

        let args = Args::parse_from([
            "telemetry-viewer",
            "--database",
            "staging",
            "--fields",
            "time,params.position",
            "--parser",
            "position",
            "--level-key",
            "forest",
            "--limit",
            "0",
            "--use-scalar",
        ]);
        args.apply_to(&mut config);

        assert_eq!(config.connection.settings.ip, "db.internal");
        assert_eq!(config.connection.settings.database, "staging");
        assert_eq!(config.fetch.fields, vec!["time", "params.position"]);
        assert_eq!(config.fetch.window.limit, 0);
        assert_eq!(config.parser.to_mode().unwrap(), ParserMode::position_for("forest"));
        assert!(config.visualization.use_scalar);
    }

    #[test]
    fn test_demo_defaults() {
        let mut config = ViewerConfig::default();
        Args::parse_from(["telemetry-viewer", "--demo"]).apply_to(&mut config);

        assert_eq!(config.connection.settings.database, DEMO_DATABASE);
        assert_eq!(config.fetch.collection.as_deref(), Some(DEMO_COLLECTION));
    }

    #[test]
    fn test_row_ids() {
        let args = Args::parse_from(["telemetry-viewer", "--rows", "0,4,9"]);
        assert_eq!(args.rows, vec![0, 4, 9]);
        assert!(Args::parse_from(["telemetry-viewer"]).rows.is_empty());
    }

    #[test]
    fn test_demo_conflicts_with_data_dir() {
        assert!(Args::try_parse_from(["telemetry-viewer", "--demo", "--data-dir", "/tmp"]).is_err());
    }
}
