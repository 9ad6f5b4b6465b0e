use serde_json::Value as JsonValue;

use crate::firestore::constants::{DEFAULT_DATABASE_ID, DEFAULT_HOST};
use crate::firestore::error::{invalid_argument, missing_project_id, FirestoreResult};
use crate::firestore::model::DatabaseId;
use crate::firestore::remote::RetrySettings;
use crate::firestore::validation::{
    validate_enum, validate_non_empty_string, validate_type, ExpectedType, ValidationOptions,
};
use crate::logger::{IntoLogLevel, LogLevel};
use crate::util::environment::{self, LOG_LEVEL_VAR};

const SETTINGS_KEYS: [&str; 6] = [
    "projectId",
    "databaseId",
    "host",
    "ssl",
    "preferTransactions",
    "logLevel",
];

/// Client configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct FirestoreSettings {
    pub project_id: String,
    pub database_id: String,
    pub host: String,
    pub ssl: bool,
    /// Wrap commits in a transaction after the client has been idle.
    pub prefer_transactions: bool,
    pub retry: RetrySettings,
    pub log_level: LogLevel,
}

impl FirestoreSettings {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            database_id: DEFAULT_DATABASE_ID.to_string(),
            host: DEFAULT_HOST.to_string(),
            ssl: true,
            prefer_transactions: false,
            retry: RetrySettings::default(),
            log_level: LogLevel::Info,
        }
    }

    /// Builds settings for `project_id` and applies the process environment:
    /// `FIRESTORE_EMULATOR_HOST`, `FUNCTION_TRIGGER_TYPE` and
    /// `FIRESTORE_LOG_LEVEL`.
    pub fn from_env(project_id: impl Into<String>) -> FirestoreResult<Self> {
        let mut settings = Self::new(project_id);
        settings.apply_environment(
            environment::emulator_host(),
            environment::is_cloud_functions(),
            environment::log_level(),
        )?;
        Ok(settings)
    }

    fn apply_environment(
        &mut self,
        emulator_host: Option<String>,
        cloud_functions: bool,
        log_level: Option<String>,
    ) -> FirestoreResult<()> {
        if let Some(host) = emulator_host {
            self.host = host;
            self.ssl = false;
        }
        if cloud_functions {
            self.prefer_transactions = true;
        }
        if let Some(level) = log_level {
            self.log_level = parse_log_level(LOG_LEVEL_VAR, &level)?;
        }
        Ok(())
    }

    /// Parses settings from a JSON object such as
    /// `{"projectId": "p", "host": "localhost:8080", "ssl": false}`.
    pub fn from_json(value: &JsonValue) -> FirestoreResult<Self> {
        let JsonValue::Object(object) = value else {
            return Err(invalid_argument(
                "Firestore settings must be a JSON object.",
            ));
        };
        if let Some(unknown) = object
            .keys()
            .find(|key| !SETTINGS_KEYS.contains(&key.as_str()))
        {
            return Err(invalid_argument(format!(
                "Unknown Firestore setting \"{unknown}\"."
            )));
        }

        let project_id = object.get("projectId");
        validate_type("projectId", project_id, ExpectedType::String, ValidationOptions::default())?;
        let mut settings = Self::new(project_id.and_then(JsonValue::as_str).unwrap_or_default());

        for key in ["databaseId", "host", "logLevel"] {
            validate_type(key, object.get(key), ExpectedType::String, ValidationOptions::optional())?;
        }
        for key in ["ssl", "preferTransactions"] {
            validate_type(key, object.get(key), ExpectedType::Boolean, ValidationOptions::optional())?;
        }

        if let Some(database) = object.get("databaseId").and_then(JsonValue::as_str) {
            settings.database_id = database.to_string();
        }
        if let Some(host) = object.get("host").and_then(JsonValue::as_str) {
            settings.host = host.to_string();
        }
        if let Some(ssl) = object.get("ssl").and_then(JsonValue::as_bool) {
            settings.ssl = ssl;
        }
        if let Some(prefer) = object.get("preferTransactions").and_then(JsonValue::as_bool) {
            settings.prefer_transactions = prefer;
        }
        if let Some(level) = object.get("logLevel").and_then(JsonValue::as_str) {
            settings.log_level = parse_log_level("logLevel", level)?;
        }

        settings.validate()?;
        Ok(settings)
    }

    pub fn with_database(mut self, database_id: impl Into<String>) -> Self {
        self.database_id = database_id.into();
        self
    }

    pub fn with_host(mut self, host: impl Into<String>, ssl: bool) -> Self {
        self.host = host.into();
        self.ssl = ssl;
        self
    }

    pub fn with_prefer_transactions(mut self, prefer_transactions: bool) -> Self {
        self.prefer_transactions = prefer_transactions;
        self
    }

    pub fn with_retry_settings(mut self, retry: RetrySettings) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_log_level(mut self, log_level: LogLevel) -> Self {
        self.log_level = log_level;
        self
    }

    pub fn database(&self) -> DatabaseId {
        DatabaseId::new(self.project_id.clone(), self.database_id.clone())
    }

    pub fn validate(&self) -> FirestoreResult<()> {
        if self.project_id.trim().is_empty() {
            return Err(missing_project_id());
        }
        validate_non_empty_string(
            "database_id",
            Some(self.database_id.as_str()),
            ValidationOptions::default(),
        )?;
        validate_non_empty_string("host", Some(self.host.as_str()), ValidationOptions::default())?;
        self.retry.validate()
    }
}

fn parse_log_level(arg: &str, value: &str) -> FirestoreResult<LogLevel> {
    let normalized = value.trim().to_ascii_lowercase();
    validate_enum(
        arg,
        Some(normalized.as_str()),
        &LogLevel::NAMES,
        ValidationOptions::default(),
    )?;
    normalized
        .as_str()
        .into_log_level()
        .map_err(|err| invalid_argument(err.to_string()))
}
