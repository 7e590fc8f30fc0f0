pub mod config {
    use serde::Deserialize;
    use std::path::PathBuf;

    #[derive(Deserialize, Debug, Clone)]
    pub struct Config {
        #[serde(default = "default_port")]
        pub port: u16,
        /// Location of the JSON document holding every task.
        #[serde(default = "default_data_file")]
        pub data_file: PathBuf,
        /// Origin allowed to call the API from a browser.
        #[serde(default = "default_cors_origin")]
        pub cors_origin: String,
        /// When set, internal error responses carry the underlying error message.
        #[serde(default)]
        pub expose_error_details: bool,
    }

    impl Config {
        /// Loads configuration from environment variables.
        pub fn from_env() -> anyhow::Result<Self> {
            Self::from_environment(config::Environment::default())
        }

        /// Loads configuration from the given environment source.
        pub fn from_environment(environment: config::Environment) -> anyhow::Result<Self> {
            let settings = config::Config::builder()
                .add_source(environment.try_parsing(true))
                .build()?;

            let config: Config = settings.try_deserialize()?;
            Ok(config)
        }
    }

    impl Default for Config {
        fn default() -> Self {
            Self {
                port: default_port(),
                data_file: default_data_file(),
                cors_origin: default_cors_origin(),
                expose_error_details: false,
            }
        }
    }

    fn default_port() -> u16 {
        5000
    }

    fn default_data_file() -> PathBuf {
        PathBuf::from("data/tasks.json")
    }

    fn default_cors_origin() -> String {
        "http://localhost:3000".to_string()
    }

}

pub mod task;
pub mod web;
