pub mod toml_config;

#[cfg(feature = "cli")]
pub use cli::{CliConfig, Command, PrepareArgs, PublishArgs};

#[cfg(feature = "cli")]
mod cli {
    use super::toml_config::TomlConfig;
    use crate::core::prepare::PrepareConfig;
    use clap::{Args, Parser, Subcommand};
    use std::path::PathBuf;

    #[derive(Debug, Clone, Parser)]
    #[command(name = "plateau-gspatial")]
    #[command(about = "Prepares PLATEAU city datasets and publishes them to a CKAN catalog")]
    pub struct CliConfig {
        /// Path to TOML configuration file
        #[arg(short, long, default_value = "plateau-gspatial.toml")]
        pub config: String,

        #[arg(short, long, help = "Enable verbose output")]
        pub verbose: bool,

        #[arg(long, help = "Emit logs as JSON lines")]
        pub log_json: bool,

        #[command(subcommand)]
        pub command: Command,
    }

    #[derive(Debug, Clone, Subcommand)]
    pub enum Command {
        /// Merge and validate the data of a city item
        Prepare(PrepareArgs),
        /// Publish the merged data of a city item to the catalog
        Publish(PublishArgs),
    }

    #[derive(Debug, Clone, Args)]
    pub struct PrepareArgs {
        /// CMS id of the city item
        pub city_item_id: String,

        #[arg(long)]
        pub skip_citygml: bool,
        #[arg(long)]
        pub skip_plateau: bool,
        #[arg(long)]
        pub skip_maxlod: bool,
        #[arg(long)]
        pub skip_index: bool,
        #[arg(long)]
        pub skip_related: bool,
        #[arg(long, help = "Validate MaxLOD data when the MaxLOD merge is skipped")]
        pub validate_maxlod: bool,
        #[arg(long, help = "Write comments and statuses back to the CMS")]
        pub wet_run: bool,
        #[arg(long, help = "Remove the temporary directory afterwards")]
        pub clean: bool,
        #[arg(long, help = "Exit successfully when the city item is incomplete")]
        pub skip_incomplete_items: bool,
        #[arg(long, help = "Run merges even when their status is running")]
        pub ignore_status: bool,

        /// Overrides `prepare.feature_types`
        #[arg(long, value_delimiter = ',')]
        pub feature_types: Vec<String>,

        /// Overrides `prepare.worker_command`
        #[arg(long)]
        pub worker_command: Option<String>,

        /// Overrides `prepare.tmp_dir_base`
        #[arg(long)]
        pub tmp_dir: Option<String>,
    }

    impl PrepareArgs {
        pub fn to_prepare_config(&self, file: &TomlConfig) -> PrepareConfig {
            let feature_types = if self.feature_types.is_empty() {
                file.prepare.feature_types.clone()
            } else {
                self.feature_types.clone()
            };

            PrepareConfig {
                city_item_id: self.city_item_id.clone(),
                skip_citygml: self.skip_citygml,
                skip_plateau: self.skip_plateau,
                skip_maxlod: self.skip_maxlod,
                skip_index: self.skip_index,
                skip_related: self.skip_related,
                validate_maxlod: self.validate_maxlod,
                wet_run: self.wet_run,
                clean: self.clean,
                skip_incomplete_items: self.skip_incomplete_items,
                ignore_status: self.ignore_status,
                feature_types,
                tmp_dir_base: PathBuf::from(
                    self.tmp_dir.as_deref().unwrap_or(file.tmp_dir_base()),
                ),
            }
        }

        pub fn worker_command<'a>(&'a self, file: &'a TomlConfig) -> Option<&'a str> {
            self.worker_command
                .as_deref()
                .or(file.prepare.worker_command.as_deref())
        }
    }

    #[derive(Debug, Clone, Args)]
    pub struct PublishArgs {
        /// CMS id of the city item
        pub city_item_id: String,

        /// Overrides `ckan.private` for newly created packages
        #[arg(long)]
        pub private: Option<bool>,
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        fn file_config() -> TomlConfig {
            TomlConfig::from_toml_str(
                r#"
[cms]
base_url = "https://cms.example.com"
token = "t"

[prepare]
feature_types = ["bldg", "tran"]
worker_command = "plateau-worker"
"#,
            )
            .unwrap()
        }

        #[test]
        fn test_parse_prepare_command() {
            let cli = CliConfig::try_parse_from([
                "plateau-gspatial",
                "-v",
                "prepare",
                "city1",
                "--skip-citygml",
                "--wet-run",
                "--feature-types",
                "bldg,luse",
            ])
            .unwrap();

            assert!(cli.verbose);
            assert_eq!(cli.config, "plateau-gspatial.toml");
            let Command::Prepare(args) = cli.command else {
                panic!("expected prepare");
            };

            let conf = args.to_prepare_config(&file_config());
            assert_eq!(conf.city_item_id, "city1");
            assert!(conf.skip_citygml);
            assert!(conf.wet_run);
            assert!(!conf.clean);
            assert_eq!(conf.feature_types, vec!["bldg", "luse"]);
            assert_eq!(conf.tmp_dir_base, PathBuf::from("plateau-gspatial-tmp"));
        }

        #[test]
        fn test_prepare_falls_back_to_file_config() {
            let cli = CliConfig::try_parse_from(["plateau-gspatial", "prepare", "city1"]).unwrap();
            let Command::Prepare(args) = cli.command else {
                panic!("expected prepare");
            };

            let file = file_config();
            let conf = args.to_prepare_config(&file);
            assert_eq!(conf.feature_types, vec!["bldg", "tran"]);
            assert_eq!(args.worker_command(&file), Some("plateau-worker"));
        }

        #[test]
        fn test_parse_publish_command() {
            let cli = CliConfig::try_parse_from([
                "plateau-gspatial",
                "--config",
                "custom.toml",
                "publish",
                "city1",
                "--private",
                "true",
            ])
            .unwrap();

            assert_eq!(cli.config, "custom.toml");
            let Command::Publish(args) = cli.command else {
                panic!("expected publish");
            };
            assert_eq!(args.city_item_id, "city1");
            assert_eq!(args.private, Some(true));
        }

        #[test]
        fn test_subcommand_is_required() {
            assert!(CliConfig::try_parse_from(["plateau-gspatial"]).is_err());
        }
    }
}
