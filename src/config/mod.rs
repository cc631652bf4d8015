pub mod env;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use cli::CliConfig;

#[cfg(feature = "cli")]
mod cli {
    use super::env::database_url_from_env;
    use super::toml_config::{
        TomlConfig, DEFAULT_ACQUIRE_TIMEOUT_SECONDS, DEFAULT_MAX_CONNECTIONS,
    };
    use crate::core::dashboard::DEFAULT_EMPLOYED_MARKER;
    use crate::core::report::OutputFormat;
    use crate::core::scope::resolve_scope;
    use crate::core::ConfigProvider;
    use crate::domain::model::{MentorScope, Principal, Role};
    use crate::utils::error::Result;
    use crate::utils::validation::{self, Validate};
    use clap::Parser;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Serialize, Deserialize, Parser)]
    #[command(name = "cohort-dashboard")]
    #[command(about = "Dashboard statistics for a mentoring programme, optionally scoped to one mentor")]
    pub struct CliConfig {
        /// Path to a TOML configuration file
        #[arg(short, long)]
        pub config: Option<String>,

        /// Postgres connection string (defaults to DATABASE_URL or the DB_* variables)
        #[arg(long)]
        pub database_url: Option<String>,

        #[arg(long)]
        pub max_connections: Option<u32>,

        #[arg(long)]
        pub acquire_timeout_seconds: Option<u64>,

        /// Progress marker that counts a student as employed
        #[arg(long)]
        pub employed_marker: Option<String>,

        /// Aggregate over this mentor's cohort only
        #[arg(long, conflicts_with = "role")]
        pub mentor: Option<String>,

        /// Role of the caller (admin or mentor); scopes the report like the API does
        #[arg(long, requires = "name")]
        pub role: Option<String>,

        /// Name of the caller, used together with --role
        #[arg(long)]
        pub name: Option<String>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        pub format: OutputFormat,

        /// Only report the paid amount
        #[arg(long)]
        pub payments_only: bool,

        #[arg(short, long, help = "Enable verbose output")]
        pub verbose: bool,

        #[arg(long, help = "Emit logs as JSON")]
        pub log_json: bool,
    }

    impl CliConfig {
        /// Command line values take precedence over the file.
        pub fn apply_to(&self, config: &mut TomlConfig) {
            if let Some(url) = &self.database_url {
                config.database.url = Some(url.clone());
            }
            if let Some(max) = self.max_connections {
                config.database.max_connections = Some(max);
            }
            if let Some(timeout) = self.acquire_timeout_seconds {
                config.database.acquire_timeout_seconds = Some(timeout);
            }
            if let Some(marker) = &self.employed_marker {
                config.metrics.employed_marker = Some(marker.clone());
            }
        }

        pub fn principal(&self) -> Option<Principal> {
            let role = Role::from(self.role.as_deref()?);
            Some(Principal::new(self.name.clone().unwrap_or_default(), role))
        }

        /// Checks the flags that describe the request rather than the connection.
        pub fn validate_request_args(&self) -> Result<()> {
            if let Some(mentor) = &self.mentor {
                validation::validate_non_empty_string("--mentor", mentor)?;
            }
            if self.role.is_some() {
                let name = validation::validate_required_field("--name", &self.name)?;
                validation::validate_non_empty_string("--name", name)?;
            }
            Ok(())
        }

        /// Scope requested on the command line: an explicit mentor, the scope
        /// implied by `--role`/`--name`, or none.
        pub fn requested_scope(&self) -> Result<Option<MentorScope>> {
            if let Some(mentor) = &self.mentor {
                return Ok(Some(MentorScope::new(mentor.clone())));
            }
            match self.principal() {
                Some(principal) => resolve_scope(&principal),
                None => Ok(None),
            }
        }
    }

    impl ConfigProvider for CliConfig {
        fn database_url(&self) -> String {
            self.database_url
                .clone()
                .filter(|url| !url.trim().is_empty())
                .unwrap_or_else(database_url_from_env)
        }

        fn max_connections(&self) -> u32 {
            self.max_connections.unwrap_or(DEFAULT_MAX_CONNECTIONS)
        }

        fn acquire_timeout_seconds(&self) -> u64 {
            self.acquire_timeout_seconds
                .unwrap_or(DEFAULT_ACQUIRE_TIMEOUT_SECONDS)
        }

        fn employed_marker(&self) -> &str {
            self.employed_marker
                .as_deref()
                .unwrap_or(DEFAULT_EMPLOYED_MARKER)
        }
    }

    impl Validate for CliConfig {
        fn validate(&self) -> Result<()> {
            validation::validate_database_url("--database-url", &self.database_url())?;
            validation::validate_range("--max-connections", self.max_connections(), 1, 100)?;
            validation::validate_range(
                "--acquire-timeout-seconds",
                self.acquire_timeout_seconds(),
                1,
                300,
            )?;
            validation::validate_non_empty_string("--employed-marker", self.employed_marker())?;
            self.validate_request_args()
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::utils::error::DashboardError;

        fn parse(args: &[&str]) -> CliConfig {
            let mut argv = vec!["cohort-dashboard"];
            argv.extend_from_slice(args);
            CliConfig::try_parse_from(argv).unwrap()
        }

        #[test]
        fn test_defaults() {
            let config = parse(&["--database-url", "postgres://localhost/skilldb"]);

            assert_eq!(config.format, OutputFormat::Json);
            assert_eq!(config.max_connections(), DEFAULT_MAX_CONNECTIONS);
            assert_eq!(config.employed_marker(), DEFAULT_EMPLOYED_MARKER);
            assert_eq!(config.requested_scope().unwrap(), None);
            assert!(config.validate().is_ok());
        }

        #[test]
        fn test_explicit_mentor_scope() {
            let config = parse(&["--mentor", "Alice", "--format", "csv"]);

            assert_eq!(config.format, OutputFormat::Csv);
            assert_eq!(
                config.requested_scope().unwrap(),
                Some(MentorScope::new("Alice"))
            );
        }

        #[test]
        fn test_role_scope() {
            let mentor = parse(&["--role", "mentor", "--name", "Alice"]);
            assert_eq!(
                mentor.requested_scope().unwrap(),
                Some(MentorScope::new("Alice"))
            );

            let admin = parse(&["--role", "admin", "--name", "root"]);
            assert_eq!(admin.requested_scope().unwrap(), None);

            let student = parse(&["--role", "student", "--name", "Bob"]);
            assert!(matches!(
                student.requested_scope(),
                Err(DashboardError::Forbidden { .. })
            ));
        }

        #[test]
        fn test_mentor_conflicts_with_role() {
            let argv = ["cohort-dashboard", "--mentor", "Alice", "--role", "admin", "--name", "x"];
            assert!(CliConfig::try_parse_from(argv).is_err());
        }

        #[test]
        fn test_cli_overrides_file() {
            let mut file = TomlConfig::from_toml_str(
                r#"
[database]
url = "postgres://file@localhost/skilldb"
max_connections = 2

[metrics]
employed_marker = "offer"
"#,
            )
            .unwrap();
            let cli = parse(&["--max-connections", "9", "--employed-marker", "hired"]);

            cli.apply_to(&mut file);

            assert_eq!(file.database_url(), "postgres://file@localhost/skilldb");
            assert_eq!(file.max_connections(), 9);
            assert_eq!(file.employed_marker(), "hired");
        }

        #[test]
        fn test_blank_mentor_is_invalid() {
            let config = parse(&["--database-url", "postgres://localhost/db", "--mentor", " "]);
            assert!(config.validate().is_err());
        }
    }
}
